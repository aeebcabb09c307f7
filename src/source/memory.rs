use crate::error::{AppError, Result};
use crate::models::{Incident, LogEntrySet, Note, OnCallEntry, TimeRange, User};
use crate::schedule::absolute_intervals_overlap;
use crate::source::{IncidentPage, IncidentQuery, IncidentSource};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory incident source (for testing and offline runs)
#[derive(Clone, Default)]
pub struct InMemorySource {
    current_user_id: String,
    users: HashMap<String, User>,
    /// Incidents with the ids of the teams they are assigned to, in listing order
    incidents: Vec<(Incident, Vec<String>)>,
    on_calls: HashMap<String, Vec<OnCallEntry>>,
    log_entries: HashMap<String, LogEntrySet>,
    notes: HashMap<String, Vec<Note>>,
    failing_log_entries: HashSet<String>,
    failing_notes: HashSet<String>,
    reject_credentials: bool,
    fail_on_calls: bool,
    calls: Arc<DashMap<&'static str, AtomicUsize>>,
    queries: Arc<DashMap<usize, IncidentQuery>>,
}

impl InMemorySource {
    pub fn new(current_user: User) -> Self {
        let mut source = Self {
            current_user_id: current_user.id.clone(),
            ..Default::default()
        };
        source.users.insert(current_user.id.clone(), current_user);
        source
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn with_incident(mut self, incident: Incident, team_ids: &[&str]) -> Self {
        self.incidents
            .push((incident, team_ids.iter().map(|id| id.to_string()).collect()));
        self
    }

    pub fn with_on_call(mut self, user_id: &str, entry: OnCallEntry) -> Self {
        self.on_calls.entry(user_id.to_string()).or_default().push(entry);
        self
    }

    pub fn with_log_entries(mut self, incident_id: &str, entries: LogEntrySet) -> Self {
        self.log_entries.insert(incident_id.to_string(), entries);
        self
    }

    pub fn with_notes(mut self, incident_id: &str, notes: Vec<Note>) -> Self {
        self.notes.insert(incident_id.to_string(), notes);
        self
    }

    /// Make log entry requests for this incident fail
    pub fn failing_log_entries_for(mut self, incident_id: &str) -> Self {
        self.failing_log_entries.insert(incident_id.to_string());
        self
    }

    pub fn failing_notes_for(mut self, incident_id: &str) -> Self {
        self.failing_notes.insert(incident_id.to_string());
        self
    }

    pub fn failing_on_calls(mut self) -> Self {
        self.fail_on_calls = true;
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Number of calls made to the given operation
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .get(operation)
            .map(|count| count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Incident queries received so far, in order
    pub fn incident_queries(&self) -> Vec<IncidentQuery> {
        let mut queries: Vec<_> = self
            .queries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        queries.sort_by_key(|(seq, _)| *seq);
        queries.into_iter().map(|(_, query)| query).collect()
    }

    fn record(&self, operation: &'static str) -> Result<usize> {
        if self.reject_credentials {
            return Err(AppError::Authentication("credentials rejected".to_string()));
        }
        let previous = self
            .calls
            .entry(operation)
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::SeqCst);
        Ok(previous)
    }

    fn in_window(incident: &Incident, query: &IncidentQuery) -> bool {
        query.since.map_or(true, |since| incident.created_at >= since)
            && query.until.map_or(true, |until| incident.created_at <= until)
    }
}

#[async_trait]
impl IncidentSource for InMemorySource {
    async fn current_user(&self) -> Result<User> {
        self.record("current_user")?;
        self.get_user_unrecorded(&self.current_user_id)
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        self.record("get_user")?;
        self.get_user_unrecorded(id)
    }

    async fn list_incidents(&self, query: &IncidentQuery) -> Result<IncidentPage> {
        let seq = self.record("list_incidents")?;
        self.queries.insert(seq, query.clone());

        let matching: Vec<&Incident> = self
            .incidents
            .iter()
            .filter(|(incident, teams)| {
                Self::in_window(incident, query)
                    && teams.iter().any(|team| query.team_ids.contains(team))
            })
            .map(|(incident, _)| incident)
            .collect();

        let page: Vec<Incident> = matching
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|incident| (*incident).clone())
            .collect();

        Ok(IncidentPage {
            more: query.offset + page.len() < matching.len(),
            incidents: page,
        })
    }

    async fn list_on_calls(
        &self,
        user_id: &str,
        window: Option<&TimeRange>,
    ) -> Result<Vec<OnCallEntry>> {
        self.record("list_on_calls")?;
        if self.fail_on_calls {
            return Err(AppError::Api {
                status: 500,
                message: "on-call listing unavailable".to_string(),
            });
        }

        let entries = self.on_calls.get(user_id).cloned().unwrap_or_default();
        Ok(match window {
            Some(window) => entries
                .into_iter()
                .filter(|entry| absolute_intervals_overlap(&entry.window, window))
                .collect(),
            None => entries,
        })
    }

    async fn list_log_entries(&self, incident_id: &str) -> Result<LogEntrySet> {
        self.record("list_log_entries")?;
        if self.failing_log_entries.contains(incident_id) {
            return Err(AppError::Api {
                status: 503,
                message: format!("log entries of {} unavailable", incident_id),
            });
        }
        Ok(self.log_entries.get(incident_id).cloned().unwrap_or_default())
    }

    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>> {
        self.record("list_notes")?;
        if self.failing_notes.contains(incident_id) {
            return Err(AppError::Api {
                status: 503,
                message: format!("notes of {} unavailable", incident_id),
            });
        }
        Ok(self.notes.get(incident_id).cloned().unwrap_or_default())
    }
}

impl InMemorySource {
    fn get_user_unrecorded(&self, id: &str) -> Result<User> {
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }
}
