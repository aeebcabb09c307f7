//! Cyclic shift schedule and the interval tests behind it

pub mod shift_schedule;
pub mod window;

pub use shift_schedule::{ShiftSchedule, ShiftStatus};
pub use window::{absolute_interval_contains, absolute_intervals_overlap, cyclic_contains};
