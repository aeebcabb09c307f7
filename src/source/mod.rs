//! Incident source abstraction
//!
//! The remote incident-tracking service is consumed through [`IncidentSource`]:
//! - [`PagerDutyClient`] talks to the PagerDuty REST API
//! - [`InMemorySource`] serves fixed data (tests, offline demos)

pub mod memory;
pub mod pagerduty;

pub use memory::InMemorySource;
pub use pagerduty::PagerDutyClient;

use crate::error::Result;
use crate::models::{Incident, LogEntrySet, Note, OnCallEntry, TimeRange, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One page request against the incident listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub team_ids: Vec<String>,
    pub offset: usize,
    pub limit: usize,
}

impl IncidentQuery {
    pub fn for_window(window: &TimeRange, team_ids: Vec<String>, limit: usize) -> Self {
        Self {
            since: Some(window.start),
            until: Some(window.end),
            team_ids,
            offset: 0,
            limit,
        }
    }

    pub fn at_offset(&self, offset: usize) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

/// One page of the incident listing
#[derive(Debug, Clone, Default)]
pub struct IncidentPage {
    pub incidents: Vec<Incident>,
    /// Whether further pages exist after this one
    pub more: bool,
}

/// Read access to the incident-tracking service
#[async_trait]
pub trait IncidentSource: Send + Sync + 'static {
    /// User owning the configured credential
    async fn current_user(&self) -> Result<User>;

    async fn get_user(&self, id: &str) -> Result<User>;

    /// Incidents in a time range for a set of teams, one page at a time
    async fn list_incidents(&self, query: &IncidentQuery) -> Result<IncidentPage>;

    /// On-calls of a user; without a window only the currently active ones
    async fn list_on_calls(&self, user_id: &str, window: Option<&TimeRange>)
        -> Result<Vec<OnCallEntry>>;

    async fn list_log_entries(&self, incident_id: &str) -> Result<LogEntrySet>;

    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>>;

    /// The given user, or the current user when no id is supplied
    async fn resolve_user(&self, id: Option<&str>) -> Result<User> {
        match id {
            Some(id) if !id.is_empty() => self.get_user(id).await,
            _ => self.current_user().await,
        }
    }
}
