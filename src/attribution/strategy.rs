use crate::enrichment::BatchEnricher;
use crate::error::{AppError, Result};
use crate::models::{Incident, LogEntrySet, OnCallEntry, TimeRange, User};
use crate::schedule::absolute_interval_contains;
use crate::source::IncidentSource;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use strum::Display;
use tracing::{debug, info};

/// Longest window (in seconds) still attributed by scanning log entries
pub const LOG_ENTRY_SCAN_MAX_WINDOW_SECS: i64 = 16 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Keep incidents whose log mentions the user
    LogEntryScan,
    /// Keep incidents created while the user was on call for one of the incident's teams
    OnCallWindowScan,
}

/// Pick the attribution strategy for a requested window
pub fn select_strategy(window: &TimeRange) -> StrategyKind {
    if window.duration() <= chrono::Duration::seconds(LOG_ENTRY_SCAN_MAX_WINDOW_SECS) {
        StrategyKind::LogEntryScan
    } else {
        StrategyKind::OnCallWindowScan
    }
}

/// Incidents kept for a user, plus any recoverable fetch failures
#[derive(Debug, Default)]
pub struct Attribution {
    pub incidents: Vec<Incident>,
    pub partial: Option<AppError>,
}

/// Decides which incidents of a page belong to a user
#[async_trait]
pub trait AttributionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Filter one page; listing order is preserved
    async fn attribute(&self, incidents: Vec<Incident>, user: &User) -> Result<Attribution>;
}

/// Whether any log entry summary mentions the name (case-sensitive)
pub fn log_entries_mention(entries: &LogEntrySet, name: &str) -> bool {
    entries.iter().any(|entry| entry.summary.contains(name))
}

/// Whether some on-call of the user covers the incident's creation for one of its teams
pub fn on_call_covers(incident: &Incident, on_calls: &[OnCallEntry]) -> bool {
    incident.team_summaries.iter().any(|team| {
        on_calls.iter().any(|on_call| {
            absolute_interval_contains(&on_call.window, &incident.created_at)
                && on_call.schedule_summary.contains(team.as_str())
        })
    })
}

/// Log-entry scan: fetches every incident's log through the batch enricher
pub struct LogEntryStrategy {
    source: Arc<dyn IncidentSource>,
    batch: BatchEnricher,
}

impl LogEntryStrategy {
    pub fn new(source: Arc<dyn IncidentSource>, batch: BatchEnricher) -> Self {
        Self { source, batch }
    }
}

#[async_trait]
impl AttributionStrategy for LogEntryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LogEntryScan
    }

    async fn attribute(&self, incidents: Vec<Incident>, user: &User) -> Result<Attribution> {
        let ids: Vec<String> = incidents.iter().map(|incident| incident.id.clone()).collect();
        let source = Arc::clone(&self.source);

        let outcome = self
            .batch
            .enrich(&ids, move |id: String| {
                let source = Arc::clone(&source);
                async move { source.list_log_entries(&id).await }
            })
            .await;

        // failed fetches hold an empty set, so they simply never match
        let kept: Vec<Incident> = incidents
            .into_iter()
            .zip(outcome.results.iter())
            .filter(|(_, entries)| log_entries_mention(entries, &user.name))
            .map(|(incident, _)| incident)
            .collect();

        debug!(
            scanned = ids.len(),
            kept = kept.len(),
            failed = outcome.errors.len(),
            "Log entry attribution finished"
        );

        Ok(Attribution {
            incidents: kept,
            partial: outcome.partial_error("log entry"),
        })
    }
}

/// On-call window scan: one on-call fetch for the whole window, no per-incident requests
pub struct OnCallWindowStrategy {
    on_calls: Vec<OnCallEntry>,
}

impl OnCallWindowStrategy {
    pub fn new(on_calls: Vec<OnCallEntry>) -> Self {
        Self { on_calls }
    }

    /// Fetch the user's on-calls for the window; a failure here is fatal
    pub async fn prepare(
        source: &dyn IncidentSource,
        user: &User,
        window: &TimeRange,
    ) -> Result<Self> {
        let on_calls = source.list_on_calls(&user.id, Some(window)).await?;
        info!(
            user_id = %user.id,
            on_calls = on_calls.len(),
            "Fetched on-calls for attribution"
        );
        Ok(Self::new(on_calls))
    }

    pub fn on_calls(&self) -> &[OnCallEntry] {
        &self.on_calls
    }
}

#[async_trait]
impl AttributionStrategy for OnCallWindowStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OnCallWindowScan
    }

    async fn attribute(&self, incidents: Vec<Incident>, _user: &User) -> Result<Attribution> {
        Ok(Attribution {
            incidents: incidents
                .into_iter()
                .filter(|incident| on_call_covers(incident, self.on_calls()))
                .collect(),
            partial: None,
        })
    }
}
