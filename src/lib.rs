//! Shift-aware incident attribution for PagerDuty.
//!
//! Incidents are attributed to a user's shift either by scanning their log entries
//! for the user's name (windows up to 16 hours) or by matching them against the
//! user's on-call windows (longer windows).

pub mod attribution;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod paging;
pub mod report;
pub mod schedule;
pub mod source;

pub use error::{AppError, Result};
