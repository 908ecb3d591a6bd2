//! # Integration Tests for coachlink-api
//!
//! Exercises the full application router: intake → review → scheduling,
//! the access gate, SSE fan-out to multiple subscribers, and concurrent
//! transition behavior.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use coachlink_api::auth::mint_token;
use coachlink_api::config::AppConfig;
use coachlink_api::state::AppState;
use coachlink_core::Role;

/// Helper: build the test app with the seeded reference fleet and no
/// database pool.
async fn test_app() -> (AppState, axum::Router) {
    let state = AppState::new(AppConfig::for_tests("integration-secret"));
    coachlink_api::bootstrap::seed_reference_fleet(&state)
        .await
        .unwrap();
    let app = coachlink_api::app(state.clone());
    (state, app)
}

fn coordinator_token(state: &AppState) -> String {
    mint_token(&state.config, "coordinator", Role::Coordinator).unwrap()
}

fn viewer_token(state: &AppState) -> String {
    mint_token(&state.config, "viewer", Role::Viewer).unwrap()
}

/// Helper: read a JSON response body.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn tomorrow() -> String {
    (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339()
}

async fn create_request(app: &axum::Router, name: &str, passengers: i64) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/requests")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "customer_name": name,
                        "phone": "555-1234",
                        "pickup_time": tomorrow(),
                        "passengers": passengers,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn put_request(
    app: &axum::Router,
    token: &str,
    id: i64,
    body: Value,
) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// A live SSE connection under test. Keeps the undelivered byte tail
/// between reads so events that share a frame are not lost.
struct SseReader {
    body: Body,
    buffer: String,
}

impl SseReader {
    /// Read frames until a named event arrives; returns its `data:` JSON.
    /// Panics after two seconds — events must arrive well within the
    /// keep-alive interval, without polling.
    async fn next_event(&mut self, kind: &str) -> Value {
        let deadline = std::time::Duration::from_secs(2);
        loop {
            // Drain complete messages already buffered (blank-line
            // separated) before pulling another frame.
            while let Some(pos) = self.buffer.find("\n\n") {
                let message: String = self.buffer.drain(..pos + 2).collect();
                let mut event_name = None;
                let mut data = None;
                for line in message.lines() {
                    if let Some(rest) = line.strip_prefix("event:") {
                        event_name = Some(rest.trim().to_string());
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        data = Some(rest.trim().to_string());
                    }
                }
                if event_name.as_deref() == Some(kind) {
                    return serde_json::from_str(&data.expect("event carries data")).unwrap();
                }
            }

            let frame = tokio::time::timeout(deadline, self.body.frame())
                .await
                .unwrap_or_else(|_| {
                    panic!("no '{kind}' event within {deadline:?}; saw: {}", self.buffer)
                })
                .expect("sse stream ended unexpectedly")
                .expect("sse frame error");
            if let Ok(bytes) = frame.into_data() {
                self.buffer.push_str(&String::from_utf8_lossy(&bytes));
            }
        }
    }
}

/// Helper: open the SSE stream.
async fn open_sse(app: &axum::Router, token: &str) -> SseReader {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/events/requests?token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    SseReader {
        body: response.into_body(),
        buffer: String::new(),
    }
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_probe() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Scenario A: intake → approve → schedule ----------------------------------

#[tokio::test]
async fn test_full_request_lifecycle() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    // Create: 201, pending, no assignment.
    let created = create_request(&app, "John Doe", 3).await;
    assert_eq!(created["data"]["status"], "pending");
    assert!(created["data"]["assignment"].is_null());
    let id = created["data"]["id"].as_i64().unwrap();

    // Approve: 200, approved, still no assignment.
    let response = put_request(&app, &token, id, json!({"status": "approved"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = body_json(response).await;
    assert_eq!(approved["data"]["status"], "approved");
    assert!(approved["data"]["assignment"].is_null());

    // Schedule: 200, scheduled, assignment hydrated with driver/vehicle.
    let response = put_request(
        &app,
        &token,
        id,
        json!({
            "status": "scheduled",
            "driver_id": 1,
            "vehicle_id": 1,
            "scheduled_time": tomorrow(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let scheduled = body_json(response).await;
    assert_eq!(scheduled["data"]["status"], "scheduled");
    let assignment = &scheduled["data"]["assignment"];
    assert_eq!(assignment["driver_id"], 1);
    assert_eq!(assignment["vehicle_id"], 1);
    assert_eq!(assignment["driver"]["name"], "John Doe");
    assert_eq!(assignment["vehicle"]["plate"], "ABC123");

    // The GET view agrees.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let fetched = body_json(response).await;
    assert_eq!(fetched["data"]["status"], "scheduled");
    assert_eq!(fetched["data"]["assignment"]["driver_id"], 1);
}

// -- Scenario B: capacity gate -----------------------------------------------

#[tokio::test]
async fn test_capacity_exceeded_rejects_and_leaves_state_untouched() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    // Vehicle 1 (ABC123) seats 50; 51 passengers must not fit.
    let created = create_request(&app, "Big Group", 51).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_request(
        &app,
        &token,
        id,
        json!({
            "status": "scheduled",
            "driver_id": 1,
            "vehicle_id": 1,
            "scheduled_time": tomorrow(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["success"], false);
    let message = error["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains("50"), "got: {message}");
    assert!(message.contains("51"), "got: {message}");

    // Status unchanged, no assignment created.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let fetched = body_json(response).await;
    assert_eq!(fetched["data"]["status"], "pending");
    assert!(fetched["data"]["assignment"].is_null());
}

#[tokio::test]
async fn test_exact_capacity_schedules() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    let created = create_request(&app, "Exact Fit", 50).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_request(
        &app,
        &token,
        id,
        json!({
            "status": "scheduled",
            "driver_id": 1,
            "vehicle_id": 1,
            "scheduled_time": tomorrow(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Scheduling gates ---------------------------------------------------------

#[tokio::test]
async fn test_scheduling_without_fields_names_all_three() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);
    let created = create_request(&app, "John Doe", 3).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_request(&app, &token, id, json!({"status": "scheduled"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    let fields: Vec<&str> = error["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["driver_id", "vehicle_id", "scheduled_time"]);
}

#[tokio::test]
async fn test_transition_on_unknown_request_is_404_for_every_status() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    for status in ["pending", "approved", "rejected"] {
        let response = put_request(&app, &token, 4040, json!({"status": status})).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "status {status}");
    }
    // Scheduled too — request existence is checked before schedule gates.
    let response = put_request(&app, &token, 4040, json!({"status": "scheduled"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rescheduling_keeps_a_single_assignment() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);
    let created = create_request(&app, "Reschedule Me", 10).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_request(
        &app,
        &token,
        id,
        json!({"status": "scheduled", "driver_id": 1, "vehicle_id": 1, "scheduled_time": tomorrow()}),
    )
    .await;
    let first = body_json(response).await;
    let first_assignment_id = first["data"]["assignment"]["id"].as_i64().unwrap();

    let response = put_request(
        &app,
        &token,
        id,
        json!({"status": "scheduled", "driver_id": 2, "vehicle_id": 3, "scheduled_time": tomorrow()}),
    )
    .await;
    let second = body_json(response).await;
    let assignment = &second["data"]["assignment"];
    assert_eq!(assignment["id"].as_i64().unwrap(), first_assignment_id);
    assert_eq!(assignment["driver_id"], 2);
    assert_eq!(assignment["vehicle_id"], 3);
    assert_eq!(state.fleet.assignment_count(), 1);
}

// -- Access gate --------------------------------------------------------------

#[tokio::test]
async fn test_login_mints_a_working_token() {
    let state = AppState::new(AppConfig::for_tests("integration-secret"));
    coachlink_api::bootstrap::seed_users(&state).await.unwrap();
    let app = coachlink_api::app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"username": "coordinator", "password": "password"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    let token = login["token"].as_str().unwrap();
    assert_eq!(login["user"]["role"], "coordinator");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/requests")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_viewer_is_read_only() {
    let (state, app) = test_app().await;
    let token = viewer_token(&state);
    let created = create_request(&app, "John Doe", 3).await;
    let id = created["data"]["id"].as_i64().unwrap();

    // Reads succeed.
    for uri in [
        "/api/requests".to_string(),
        format!("/api/requests/{id}"),
        "/api/drivers".to_string(),
        "/api/vehicles".to_string(),
        "/api/analytics/status".to_string(),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(&uri)
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }

    // Mutations are forbidden.
    let response = put_request(&app, &token, id, json!({"status": "approved"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_protected_routes_reject_missing_and_garbage_tokens() {
    let (_, app) = test_app().await;

    for auth in [None, Some("Bearer not.a.token")] {
        let mut builder = Request::builder().uri("/api/requests");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

// -- Scenario C: live fan-out -------------------------------------------------

#[tokio::test]
async fn test_status_change_reaches_every_subscriber() {
    let (state, app) = test_app().await;
    let coordinator = coordinator_token(&state);
    let viewer = viewer_token(&state);

    let created = create_request(&app, "Watched Customer", 2).await;
    let id = created["data"]["id"].as_i64().unwrap();

    // Two browser tabs: one coordinator, one viewer.
    let mut tab_a = open_sse(&app, &coordinator).await;
    let mut tab_b = open_sse(&app, &viewer).await;

    // Approve in "tab A" (a plain HTTP call).
    let response = put_request(&app, &coordinator, id, json!({"status": "approved"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    for tab in [&mut tab_a, &mut tab_b] {
        let event = tab.next_event("statusChange").await;
        assert_eq!(event["requestId"], id);
        assert_eq!(event["oldStatus"], "pending");
        assert_eq!(event["newStatus"], "approved");
        assert!(event["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_subscribers_see_events_in_commit_order() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    let first = create_request(&app, "First", 1).await["data"]["id"]
        .as_i64()
        .unwrap();
    let second = create_request(&app, "Second", 1).await["data"]["id"]
        .as_i64()
        .unwrap();

    let mut stream = open_sse(&app, &token).await;

    put_request(&app, &token, first, json!({"status": "approved"})).await;
    put_request(&app, &token, second, json!({"status": "rejected"})).await;

    let event = stream.next_event("statusChange").await;
    assert_eq!(event["requestId"], first);
    assert_eq!(event["newStatus"], "approved");

    let event = stream.next_event("statusChange").await;
    assert_eq!(event["requestId"], second);
    assert_eq!(event["newStatus"], "rejected");
}

#[tokio::test]
async fn test_disconnected_subscriber_disturbs_nobody() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);
    let created = create_request(&app, "John Doe", 2).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let dropped = open_sse(&app, &token).await;
    let mut survivor = open_sse(&app, &token).await;
    drop(dropped);

    let response = put_request(&app, &token, id, json!({"status": "approved"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let event = survivor.next_event("statusChange").await;
    assert_eq!(event["requestId"], id);
}

#[tokio::test]
async fn test_creation_and_deletion_publish_request_updates() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    let mut stream = open_sse(&app, &token).await;

    let created = create_request(&app, "Ephemeral", 1).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let event = stream.next_event("requestUpdate").await;
    assert_eq!(event["action"], "created");
    assert_eq!(event["request"]["id"], id);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = stream.next_event("requestUpdate").await;
    assert_eq!(event["action"], "deleted");
    assert_eq!(event["request"]["id"], id);
}

// -- Concurrency --------------------------------------------------------------

#[tokio::test]
async fn test_concurrent_transitions_leave_a_consistent_state() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);
    let created = create_request(&app, "Contended", 5).await;
    let id = created["data"]["id"].as_i64().unwrap();

    // Race schedules where each writer's driver and vehicle ids agree;
    // a torn write would leave them mismatched.
    let mut handles = Vec::new();
    for n in 1..=3i64 {
        let app = app.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let response = put_request(
                &app,
                &token,
                id,
                json!({
                    "status": "scheduled",
                    "driver_id": n,
                    "vehicle_id": n,
                    "scheduled_time": tomorrow(),
                }),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/requests/{id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let fetched = body_json(response).await;
    let assignment = &fetched["data"]["assignment"];
    assert_eq!(
        assignment["driver_id"].as_i64().unwrap(),
        assignment["vehicle_id"].as_i64().unwrap()
    );
    assert_eq!(state.fleet.assignment_count(), 1);
}

// -- Analytics ----------------------------------------------------------------

#[tokio::test]
async fn test_overview_counts_scheduled_requests() {
    let (state, app) = test_app().await;
    let token = coordinator_token(&state);

    let created = create_request(&app, "Scheduled Customer", 2).await;
    let id = created["data"]["id"].as_i64().unwrap();
    create_request(&app, "Pending Customer", 2).await;

    put_request(
        &app,
        &token,
        id,
        json!({"status": "scheduled", "driver_id": 1, "vehicle_id": 1, "scheduled_time": tomorrow()}),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analytics/overview")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let overview = body_json(response).await;
    assert_eq!(overview["data"]["totalRequests"], 2);
    assert_eq!(overview["data"]["totalAssignments"], 1);
    assert_eq!(overview["data"]["pendingRequests"], 1);
    assert_eq!(overview["data"]["scheduledRequests"], 1);
    assert_eq!(overview["data"]["utilizationRate"], "50.00%");
}

// -- OpenAPI & metrics --------------------------------------------------------

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let (_, app) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert!(spec["paths"]["/api/requests"].is_object());
}

#[tokio::test]
async fn test_metrics_expose_request_gauges() {
    let (_, app) = test_app().await;
    create_request(&app, "Counted", 1).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("coachlink_requests_total"));
    assert!(text.contains("coachlink_drivers_total 3"));
}
