//! Google gateway and OAuth exchange against a mocked HTTP server.

use calsync_core::auth::OAuthFlow;
use calsync_core::constants::{DEFAULT_EVENT_COLOR, UNTITLED};
use calsync_core::diff::{ConflictPolicy, DeletionFuse, DiffKind, ReconcileOptions, SyncPlan};
use calsync_core::remote::RemoteCalendar;
use calsync_core::{CalSyncError, Credential, Event, Provider, SyncWindow, TokenGrant};
use calsync_provider_google::{GoogleAuth, GoogleCalendar, GoogleConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
    query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

fn config(server: &MockServer) -> GoogleConfig {
    GoogleConfig::new("client-1", "secret-1").with_base_url(&server.uri())
}

fn credential() -> Credential {
    Credential::from_grant(
        "alice",
        Provider::Google,
        &TokenGrant {
            access_token: "token-1".into(),
            refresh_token: Some("refresh-1".into()),
            token_type: None,
            expires_in: Some(3600),
        },
        Utc::now(),
    )
}

fn window() -> SyncWindow {
    SyncWindow::at(Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap())
}

fn google_event(id: &str, summary: &str, day: u32) -> serde_json::Value {
    json!({
        "id": id,
        "status": "confirmed",
        "summary": summary,
        "start": {"dateTime": format!("2025-01-{day:02}T09:00:00Z")},
        "end": {"dateTime": format!("2025-01-{day:02}T10:00:00Z")}
    })
}

#[tokio::test]
async fn list_follows_every_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer token-1"))
        .and(query_param("singleEvents", "true"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [google_event("g1", "First", 6), google_event("g2", "Second", 7)],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                google_event("g3", "Third", 8),
                {"id": "g4", "status": "cancelled"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = GoogleCalendar::new(config(&server));
    let events = calendar.list(&credential(), &window()).await.unwrap();

    let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["g1", "g2", "g3"]);
    assert_eq!(events[0].start, Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap());
}

#[tokio::test]
async fn list_keeps_records_with_missing_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "g1",
                    "status": "confirmed",
                    "summary": "Standup",
                    "start": {"dateTime": "2025-01-06T09:00:00Z"}
                },
                {
                    "id": "g2",
                    "status": "confirmed",
                    "start": {"dateTime": "2025-01-07T09:00:00Z"},
                    "end": {"dateTime": "2025-01-07T10:00:00Z"}
                }
            ]
        })))
        .mount(&server)
        .await;

    let calendar = GoogleCalendar::new(config(&server));
    let events = calendar.list(&credential(), &window()).await.unwrap();

    let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["g1", "g2"]);
    assert!(events[0].validate().is_err());
    assert_eq!(events[1].title, UNTITLED);

    // The local copy of the unreadable record survives reconciliation
    let mut linked = Event::new(
        "alice",
        "Standup",
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
    );
    linked.remote_id = Some("g1".into());

    let options = ReconcileOptions {
        policy: ConflictPolicy::RemoteWins,
        fuse: DeletionFuse::default(),
        default_color: DEFAULT_EVENT_COLOR.to_string(),
    };
    let plan = SyncPlan::compute(Provider::Google, "alice", vec![linked], events, &window(), &options);

    let rejected: Vec<_> = plan.rejected.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(rejected, vec!["g1"]);
    assert!(plan.to_pull.iter().all(|d| d.kind() != DiffKind::Delete));
    assert!(
        plan.to_pull
            .iter()
            .any(|d| d.kind() == DiffKind::Create && d.event().title == UNTITLED)
    );
}

#[tokio::test]
async fn list_requests_the_window_bounds() {
    let server = MockServer::start().await;
    let window = window();

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("timeMin", window.from_rfc3339()))
        .and(query_param("timeMax", window.to_rfc3339()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = GoogleCalendar::new(config(&server));
    let events = calendar.list(&credential(), &window).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn list_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let calendar = GoogleCalendar::new(config(&server));
    let err = calendar.list(&credential(), &window()).await.unwrap_err();

    assert!(err.is_retryable(), "got {err:?}");
}

#[tokio::test]
async fn create_stamps_local_id_and_returns_remote_id() {
    let server = MockServer::start().await;
    let event = Event::new(
        "alice",
        "Standup",
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
    );

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer token-1"))
        .and(body_partial_json(json!({
            "summary": "Standup",
            "extendedProperties": {"private": {"calsync_local_id": event.id}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_event("new-1", "Standup", 6)))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = GoogleCalendar::new(config(&server));
    let remote_id = calendar.create(&credential(), &event).await.unwrap();

    assert_eq!(remote_id, "new-1");
}

#[tokio::test]
async fn exchange_code_posts_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "refresh_token": "refresh-1",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = GoogleAuth::new(config(&server));
    let grant = auth.exchange_code("code-1").await.unwrap();

    assert_eq!(grant.access_token, "token-1");
    assert_eq!(grant.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(grant.expires_in, Some(3599));
}

#[tokio::test]
async fn refresh_without_new_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-2",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let auth = GoogleAuth::new(config(&server));
    let grant = auth.refresh("refresh-1").await.unwrap();

    assert_eq!(grant.access_token, "token-2");
    assert_eq!(grant.refresh_token, None);
}

#[tokio::test]
async fn revoked_refresh_token_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let auth = GoogleAuth::new(config(&server));
    let err = auth.refresh("dead").await.unwrap_err();

    match err {
        CalSyncError::AuthRejected(message) => assert!(message.contains("invalid_grant")),
        other => panic!("expected AuthRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn token_endpoint_outage_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let auth = GoogleAuth::new(config(&server));
    let err = auth.refresh("refresh-1").await.unwrap_err();

    assert!(matches!(err, CalSyncError::RemoteUnavailable(_)));
}
