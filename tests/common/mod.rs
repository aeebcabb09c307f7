//! Shared fixtures for the integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use pd_shift::models::{
    EscalationPolicyRef, Incident, LogEntry, LogEntrySet, OnCallEntry, TeamRef, TimeRange, User,
};
use std::collections::BTreeSet;

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
}

pub fn create_test_user(id: &str, name: &str, teams: &[(&str, &str)]) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id.to_lowercase()),
        teams: teams
            .iter()
            .map(|(id, summary)| TeamRef {
                id: id.to_string(),
                summary: summary.to_string(),
            })
            .collect(),
    }
}

pub fn jane() -> User {
    create_test_user("U1", "Jane Doe", &[("T1", "Platform")])
}

pub fn create_test_incident(id: &str, created_at: DateTime<Utc>, teams: &[&str]) -> Incident {
    Incident {
        id: id.to_string(),
        title: format!("Incident {}", id),
        description: format!("Incident {}", id),
        created_at,
        last_status_change_at: created_at + Duration::minutes(45),
        team_summaries: teams.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        self_link: format!("https://api.pagerduty.com/incidents/{}", id),
        html_link: format!("https://example.pagerduty.com/incidents/{}", id),
    }
}

pub fn logs(summaries: &[&str]) -> LogEntrySet {
    summaries
        .iter()
        .map(|summary| LogEntry {
            summary: summary.to_string(),
        })
        .collect()
}

pub fn create_test_on_call(
    schedule: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    policy: &str,
) -> OnCallEntry {
    OnCallEntry {
        schedule_summary: schedule.to_string(),
        window: TimeRange::new(start, end),
        escalation_policy: EscalationPolicyRef {
            id: format!("EP-{}", policy),
            summary: policy.to_string(),
            html_url: format!("https://example.pagerduty.com/escalation_policies/{}", policy),
        },
    }
}

/// A window of the given length starting at 2024-01-15 00:00 UTC
pub fn window_of(length: Duration) -> TimeRange {
    let start = at(15, 0, 0);
    TimeRange::new(start, start + length)
}
