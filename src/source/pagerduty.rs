use crate::error::{AppError, Result};
use crate::models::{
    EscalationPolicyRef, Incident, LogEntry, LogEntrySet, Note, OnCallEntry, TeamRef, TimeRange,
    User,
};
use crate::source::{IncidentPage, IncidentQuery, IncidentSource};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default PagerDuty REST API endpoint
pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

const API_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

/// Page size for sub-resource listings (on-calls, log entries)
const SUB_RESOURCE_LIMIT: usize = 100;

const TOKEN_HINT: &str = "it seems like the authtoken is not set correctly or outdated. \
    Please update the authtoken in the .pd.yml file (or run `pd-shift set-token`). \
    A personal REST API key can be created as described at \
    https://support.pagerduty.com/docs/generating-api-keys#generating-a-personal-rest-api-key";

/// PagerDuty REST API client
#[derive(Clone)]
pub struct PagerDutyClient {
    pub(crate) api_url: String,
    pub(crate) client: Client,
}

#[derive(Debug, Deserialize)]
struct ApiReference {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    teams: Vec<ApiReference>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiIncident {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    created_at: String,
    #[serde(default)]
    last_status_change_at: Option<String>,
    #[serde(default)]
    teams: Vec<ApiReference>,
    #[serde(rename = "self", default)]
    self_link: String,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct IncidentsResponse {
    incidents: Vec<ApiIncident>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiOnCall {
    #[serde(default)]
    escalation_policy: Option<ApiReference>,
    #[serde(default)]
    schedule: Option<ApiReference>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OnCallsResponse {
    oncalls: Vec<ApiOnCall>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiLogEntry {
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct LogEntriesResponse {
    log_entries: Vec<ApiLogEntry>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiNote {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    user: Option<ApiReference>,
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct NotesResponse {
    notes: Vec<ApiNote>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<String>,
}

impl PagerDutyClient {
    /// Create a new client for the given API token
    pub fn new(token: &str, api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        if token.is_empty() {
            return Err(AppError::Configuration(
                "PagerDuty authtoken cannot be empty, please set `authtoken` in the .pd.yml file"
                    .to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        let mut auth = HeaderValue::from_str(&format!("Token token={}", token))
            .map_err(|_| AppError::Configuration("authtoken contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// API url for the given path segments, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            AppError::Configuration(format!("invalid api_url {:?}: {}", self.api_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Configuration(format!("api_url {:?} cannot carry a path", self.api_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        debug!(url = %url, params = query.len(), "PagerDuty request");

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                AppError::Serialization(format!("Failed to parse PagerDuty response from {}: {}", path, e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| {
                if b.error.errors.is_empty() {
                    b.error.message
                } else {
                    format!("{}: {}", b.error.message, b.error.errors.join(", "))
                }
            })
            .unwrap_or(body);

        warn!(path = %path, status = status.as_u16(), message = %message, "PagerDuty API error");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Authentication(format!("{} ({})", TOKEN_HINT, message))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(format!("{} ({})", path, message)),
            _ => AppError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn fetch_user(&self, id: &str) -> Result<User> {
        let response: UserResponse = self
            .get_json(&["users", id], &[("include[]", "teams".to_string())])
            .await?;
        Ok(response.user.into())
    }
}

#[async_trait]
impl IncidentSource for PagerDutyClient {
    async fn current_user(&self) -> Result<User> {
        self.fetch_user("me").await
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        self.fetch_user(id).await
    }

    async fn list_incidents(&self, query: &IncidentQuery) -> Result<IncidentPage> {
        let mut params = vec![
            ("offset", query.offset.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(since) = query.since {
            params.push(("since", format_time(&since)));
        }
        if let Some(until) = query.until {
            params.push(("until", format_time(&until)));
        }
        for team_id in &query.team_ids {
            params.push(("team_ids[]", team_id.clone()));
        }

        let response: IncidentsResponse = self.get_json(&["incidents"], &params).await?;
        let incidents = response
            .incidents
            .into_iter()
            .map(Incident::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(IncidentPage {
            incidents,
            more: response.more,
        })
    }

    async fn list_on_calls(
        &self,
        user_id: &str,
        window: Option<&TimeRange>,
    ) -> Result<Vec<OnCallEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0;
        loop {
            let mut params = vec![
                ("user_ids[]", user_id.to_string()),
                ("earliest", "true".to_string()),
                ("offset", offset.to_string()),
                ("limit", SUB_RESOURCE_LIMIT.to_string()),
            ];
            if let Some(window) = window {
                params.push(("since", format_time(&window.start)));
                params.push(("until", format_time(&window.end)));
            }

            let response: OnCallsResponse = self.get_json(&["oncalls"], &params).await?;
            for oncall in response.oncalls {
                entries.push(OnCallEntry::try_from(oncall)?);
            }

            if !response.more {
                break;
            }
            offset += SUB_RESOURCE_LIMIT;
        }
        Ok(entries)
    }

    async fn list_log_entries(&self, incident_id: &str) -> Result<LogEntrySet> {
        let mut entries = LogEntrySet::new();
        let mut offset = 0;
        loop {
            let params = [
                ("offset", offset.to_string()),
                ("limit", SUB_RESOURCE_LIMIT.to_string()),
            ];
            let response: LogEntriesResponse = self
                .get_json(&["incidents", incident_id, "log_entries"], &params)
                .await?;
            entries.extend(
                response
                    .log_entries
                    .into_iter()
                    .map(|entry| LogEntry {
                        summary: entry.summary,
                    }),
            );

            if !response.more {
                break;
            }
            offset += SUB_RESOURCE_LIMIT;
        }
        Ok(entries)
    }

    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>> {
        let response: NotesResponse = self
            .get_json(&["incidents", incident_id, "notes"], &[])
            .await?;

        Ok(response
            .notes
            .into_iter()
            .map(|note| Note {
                id: note.id,
                content: note.content,
                author_id: note.user.map(|u| u.id).unwrap_or_default(),
                created_at: note.created_at,
            })
            .collect())
    }
}

fn format_time(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::malformed_time(field, value))
}

/// A missing bound means the on-call is open-ended on that side
fn parse_bound(field: &str, value: Option<&str>, open: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match value {
        None => Ok(open),
        Some(value) => parse_time(field, value),
    }
}

impl From<ApiUser> for User {
    fn from(user: ApiUser) -> Self {
        User {
            id: user.id,
            name: user.name,
            email: user.email,
            teams: user
                .teams
                .into_iter()
                .map(|team| TeamRef {
                    id: team.id,
                    summary: team.summary,
                })
                .collect(),
        }
    }
}

impl TryFrom<ApiIncident> for Incident {
    type Error = AppError;

    fn try_from(incident: ApiIncident) -> Result<Self> {
        let created_at = parse_time("incident.created_at", &incident.created_at)?;
        let last_status_change_at = match incident.last_status_change_at.as_deref() {
            Some(value) => parse_time("incident.last_status_change_at", value)?,
            None => created_at,
        };

        Ok(Incident {
            description: incident.description.unwrap_or_else(|| incident.title.clone()),
            id: incident.id,
            title: incident.title,
            created_at,
            last_status_change_at,
            team_summaries: incident.teams.into_iter().map(|team| team.summary).collect(),
            self_link: incident.self_link,
            html_link: incident.html_url,
        })
    }
}

impl TryFrom<ApiOnCall> for OnCallEntry {
    type Error = AppError;

    fn try_from(oncall: ApiOnCall) -> Result<Self> {
        let start = parse_bound("oncall.start", oncall.start.as_deref(), DateTime::<Utc>::MIN_UTC)?;
        let end = parse_bound("oncall.end", oncall.end.as_deref(), DateTime::<Utc>::MAX_UTC)?;
        let policy = oncall.escalation_policy;

        Ok(OnCallEntry {
            schedule_summary: oncall.schedule.map(|s| s.summary).unwrap_or_default(),
            window: TimeRange::new(start, end),
            escalation_policy: policy
                .map(|p| EscalationPolicyRef {
                    id: p.id,
                    summary: p.summary,
                    html_url: p.html_url,
                })
                .unwrap_or_default(),
        })
    }
}
