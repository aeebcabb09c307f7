//! Interval tests shared by the shift schedule and the attribution strategies.
//!
//! Two interval kinds exist and must not be mixed: cyclic time-of-day windows on the
//! 1440-minute ring (shifts) and absolute windows between two instants (on-calls).

use crate::models::{TimeOfDay, TimeRange};
use chrono::{DateTime, Utc};

/// Whether `point` lies in the cyclic window `[start, end)`.
///
/// A window with `start > end` wraps past midnight. A window with `start == end`
/// matches only the single minute `start`.
pub fn cyclic_contains(start: TimeOfDay, end: TimeOfDay, point: TimeOfDay) -> bool {
    if start < end {
        point >= start && point < end
    } else if start == end {
        point == start
    } else {
        point >= start || point < end
    }
}

/// Whether `point` lies in the absolute window, both ends inclusive.
///
/// Reversed ranges (`start > end`) as delivered by the incident source for some
/// overnight entries are matched permissively: the point only has to be at or after
/// the start *or* at or before the end.
pub fn absolute_interval_contains(range: &TimeRange, point: &DateTime<Utc>) -> bool {
    let not_before_start = !(*point < range.start);
    let not_after_end = !(*point > range.end);

    if range.start > range.end {
        not_before_start || not_after_end
    } else {
        not_before_start && not_after_end
    }
}

/// Whether the two absolute windows share at least one instant
pub fn absolute_intervals_overlap(a: &TimeRange, b: &TimeRange) -> bool {
    a.start <= b.end && b.start <= a.end
}
