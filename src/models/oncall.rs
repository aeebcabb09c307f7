use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Absolute (non-repeating) time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Signed length of the window
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Escalation policy an on-call belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicyRef {
    pub id: String,
    pub summary: String,
    pub html_url: String,
}

/// A period during which the user is on call for a schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCallEntry {
    /// Summary of the schedule; empty for direct escalation-level on-calls
    pub schedule_summary: String,
    pub window: TimeRange,
    pub escalation_policy: EscalationPolicyRef,
}
