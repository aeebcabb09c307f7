use crate::models::{EscalationPolicyRef, OnCallEntry, TimeRange};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Escalation policies sharing one on-call window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnCallGroup {
    pub window: TimeRange,
    /// Sorted by summary, one entry per policy id
    pub policies: Vec<EscalationPolicyRef>,
}

/// Group on-calls by their window, deduplicating policies per window
pub fn group_on_calls(entries: &[OnCallEntry]) -> Vec<OnCallGroup> {
    let mut grouped: BTreeMap<TimeRange, BTreeMap<String, EscalationPolicyRef>> = BTreeMap::new();
    for entry in entries {
        grouped
            .entry(entry.window)
            .or_default()
            .insert(entry.escalation_policy.id.clone(), entry.escalation_policy.clone());
    }

    grouped
        .into_iter()
        .map(|(window, policies)| {
            let mut policies: Vec<_> = policies.into_values().collect();
            policies.sort_by(|a, b| a.summary.cmp(&b.summary));
            OnCallGroup { window, policies }
        })
        .collect()
}

/// `H:MM` for a minute count
pub fn hours_minutes(minutes: u16) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Local wall-clock rendering; unbounded on-call edges print as `open`
pub fn local_time(instant: &DateTime<Utc>) -> String {
    if *instant == DateTime::<Utc>::MIN_UTC || *instant == DateTime::<Utc>::MAX_UTC {
        return "open".to_string();
    }
    instant.with_timezone(&Local).format(LOCAL_TIME_FORMAT).to_string()
}

pub fn duration(span: chrono::Duration) -> String {
    let secs = span.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{}{}h{:02}m{:02}s", sign, secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Note timestamps are shown in local time when parseable, as delivered otherwise
pub fn note_time(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| local_time(&t.with_timezone(&Utc)))
        .unwrap_or_else(|_| raw.to_string())
}
