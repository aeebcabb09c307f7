use mockito::{Matcher, Server};
use pd_shift::error::AppError;
use pd_shift::models::TimeRange;
use pd_shift::source::{IncidentQuery, IncidentSource, PagerDutyClient};
use serde_json::json;
use std::time::Duration;

fn client(server: &Server) -> PagerDutyClient {
    PagerDutyClient::new("abc123", server.url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_current_user_with_teams() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/users/me")
        .match_query(Matcher::UrlEncoded("include[]".into(), "teams".into()))
        .match_header("authorization", "Token token=abc123")
        .match_header("accept", "application/vnd.pagerduty+json;version=2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "user": {
                    "id": "U1",
                    "name": "Jane Doe",
                    "email": "jane@example.com",
                    "teams": [{"id": "T1", "summary": "Platform"}]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let user = client(&server).current_user().await.unwrap();

    mock.assert_async().await;
    assert_eq!(user.name, "Jane Doe");
    assert_eq!(user.team_ids(), vec!["T1".to_string()]);
}

#[tokio::test]
async fn test_rejected_token_is_authentication_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(json!({"error": {"message": "Unauthorized", "code": 2006}}).to_string())
        .create_async()
        .await;

    let err = client(&server).current_user().await.unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)));
    assert!(err.to_string().contains("authtoken"));
}

#[tokio::test]
async fn test_list_incidents_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/incidents")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), "100".into()),
            Matcher::UrlEncoded("limit".into(), "100".into()),
            Matcher::UrlEncoded("since".into(), "2024-01-15T00:00:01Z".into()),
            Matcher::UrlEncoded("until".into(), "2024-01-15T23:59:59Z".into()),
            Matcher::UrlEncoded("team_ids[]".into(), "T1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "incidents": [{
                    "id": "P1",
                    "title": "db-1 disk full",
                    "description": "db-1 disk full",
                    "created_at": "2024-01-15T10:00:00Z",
                    "last_status_change_at": "2024-01-15T10:45:00Z",
                    "teams": [{"id": "T1", "summary": "Platform"}],
                    "self": "https://api.pagerduty.com/incidents/P1",
                    "html_url": "https://example.pagerduty.com/incidents/P1"
                }],
                "more": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let window = TimeRange::new(
        "2024-01-15T00:00:01Z".parse().unwrap(),
        "2024-01-15T23:59:59Z".parse().unwrap(),
    );
    let query = IncidentQuery::for_window(&window, vec!["T1".to_string()], 100).at_offset(100);
    let page = client(&server).list_incidents(&query).await.unwrap();

    mock.assert_async().await;
    assert!(page.more);
    assert_eq!(page.incidents.len(), 1);
    let incident = &page.incidents[0];
    assert!(incident.team_summaries.contains("Platform"));
    assert_eq!(incident.duration(), chrono::Duration::minutes(45));
}

#[tokio::test]
async fn test_malformed_incident_time() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/incidents")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "incidents": [{"id": "P1", "title": "x", "created_at": "yesterday"}],
                "more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let query = IncidentQuery {
        since: None,
        until: None,
        team_ids: vec!["T1".to_string()],
        offset: 0,
        limit: 100,
    };
    let err = client(&server).list_incidents(&query).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedTime { ref value, .. } if value == "yesterday"));
}

#[tokio::test]
async fn test_log_entries_follow_pagination() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/incidents/P1/log_entries")
        .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"log_entries": [{"summary": "Triggered"}], "more": true}).to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", "/incidents/P1/log_entries")
        .match_query(Matcher::UrlEncoded("offset".into(), "100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"log_entries": [{"summary": "Acknowledged by Jane Doe"}], "more": false})
                .to_string(),
        )
        .create_async()
        .await;

    let entries = client(&server).list_log_entries("P1").await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    let summaries: Vec<_> = entries.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(summaries, vec!["Triggered", "Acknowledged by Jane Doe"]);
}

#[tokio::test]
async fn test_on_calls_for_window() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/oncalls")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("user_ids[]".into(), "U1".into()),
            Matcher::UrlEncoded("earliest".into(), "true".into()),
            Matcher::UrlEncoded("since".into(), "2024-01-15T00:00:00Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "oncalls": [{
                    "escalation_policy": {"id": "EP1", "summary": "Platform", "html_url": "https://example.pagerduty.com/escalation_policies/EP1"},
                    "schedule": {"id": "S1", "summary": "Platform Primary"},
                    "start": "2024-01-15T08:00:00Z",
                    "end": "2024-01-15T16:00:00Z"
                }],
                "more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let window = TimeRange::new(
        "2024-01-15T00:00:00Z".parse().unwrap(),
        "2024-01-17T00:00:00Z".parse().unwrap(),
    );
    let on_calls = client(&server)
        .list_on_calls("U1", Some(&window))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(on_calls.len(), 1);
    assert_eq!(on_calls[0].schedule_summary, "Platform Primary");
    assert_eq!(on_calls[0].escalation_policy.id, "EP1");
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/incidents/P1/notes")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body(json!({"error": {"message": "Service Unavailable", "errors": ["try again"]}}).to_string())
        .create_async()
        .await;

    let err = client(&server).list_notes("P1").await.unwrap_err();
    match err {
        AppError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "Service Unavailable: try again");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_notes_carry_author_ids() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/incidents/P1/notes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "notes": [{
                    "id": "N1",
                    "content": "restarted db-1",
                    "user": {"id": "U2", "summary": "John Roe"},
                    "created_at": "2024-01-15T10:05:00+00:00"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let notes = client(&server).list_notes("P1").await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].author_id, "U2");
    assert_eq!(notes[0].content, "restarted db-1");
}
