use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An incident as listed by the incident source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Source identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Detailed description (often equal to the title)
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last status change (acknowledge, resolve, ...)
    pub last_status_change_at: DateTime<Utc>,

    /// Summaries of the teams the incident is assigned to
    pub team_summaries: BTreeSet<String>,

    /// API link
    pub self_link: String,

    /// Web link
    pub html_link: String,
}

impl Incident {
    /// Time between creation and the last status change
    pub fn duration(&self) -> chrono::Duration {
        self.last_status_change_at - self.created_at
    }

    /// Whether the description carries anything beyond the title
    pub fn has_distinct_description(&self) -> bool {
        !self.description.is_empty() && self.description != self.title
    }
}

/// One entry of an incident's log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub summary: String,
}

/// Ordered log entries of a single incident
pub type LogEntrySet = Vec<LogEntry>;

/// A note attached to an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub author_id: String,
    /// Kept as delivered, notes are display-only
    pub created_at: String,
}

/// A note with its author resolved to a display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDetail {
    pub content: String,
    pub author_name: String,
    pub created_at: String,
}

/// An attributed incident together with its notes
#[derive(Debug, Clone, Serialize)]
pub struct IncidentDetail {
    pub incident: Incident,
    pub notes: Vec<NoteDetail>,
}
