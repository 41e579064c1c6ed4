use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use metrics_core::MetricsConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::SqliteRunStore;

fn test_state() -> AppState {
    let store = SqliteRunStore::open_in_memory().expect("in-memory store");
    AppState::new(RunCatalog::new(store, MetricsConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn sample_checkpoint() -> Value {
    json!({
        "metadata": { "excution_queue": ["a1"], "current_agent_index": 0 },
        "physical_environment": {
            "dimensions": [8, 8],
            "crisis": { "level": 2 },
            "resources": [{ "id": "r1", "location": { "x": 1, "y": 2 }, "quantity": 6 }]
        },
        "social_environment": {
            "agents": [
                { "id": "a1", "type": "moral", "state": { "hp": 40, "location": { "x": 1, "y": 2 } } },
                { "id": "a2", "type": "immoral", "state": { "hp": 80 } }
            ]
        }
    })
}

async fn seeded_app() -> Router {
    let app = router(test_state());
    let (status, _) = send(&app, "POST", "/api/v1/runs", Some(json!({ "runId": "run_a" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/runs/run_a/checkpoints/1",
        Some(sample_checkpoint()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    app
}

#[tokio::test]
async fn unknown_run_returns_error_envelope() {
    let app = router(test_state());
    let (status, body) = send(&app, "GET", "/api/v1/runs/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], json!("RUN_NOT_FOUND"));
    assert_eq!(body["details"], json!("run_id=missing"));
}

#[tokio::test]
async fn metrics_endpoint_summarizes_checkpoint() {
    let app = seeded_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/runs/run_a/checkpoints/1/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["totalAgents"], json!(2));
    assert_eq!(body["metrics"]["moralAgents"], json!(1));
    assert_eq!(body["metrics"]["averageHP"], json!(60.0));
    assert_eq!(body["metrics"]["crisisLevel"], json!(2.0));
    assert_eq!(body["message"], Value::Null);
}

#[tokio::test]
async fn malformed_checkpoint_reports_no_metrics() {
    let app = seeded_app().await;
    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/runs/run_a/checkpoints/2",
        Some(json!({ "physical_environment": { "resources": [] } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/v1/runs/run_a/checkpoints/2/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"], Value::Null);
    assert_eq!(body["message"], json!("no metrics available"));
}

#[tokio::test]
async fn description_patch_distinguishes_missing_from_null() {
    let app = router(test_state());
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/runs",
        Some(json!({ "runId": "run_a", "description": "baseline" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "PATCH", "/api/v1/runs/run_a/description", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("baseline"));

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/runs/run_a/description",
        Some(json!({ "description": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("description").map_or(true, Value::is_null), "{body}");

    let (_, body) = send(&app, "GET", "/api/v1/runs/run_a", None).await;
    assert!(body["run"].get("description").map_or(true, Value::is_null), "{body}");
}

#[tokio::test]
async fn non_integer_time_step_is_rejected() {
    let app = seeded_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/runs/run_a/checkpoints/first", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], json!("INVALID_QUERY"));
}

#[tokio::test]
async fn missing_checkpoint_is_distinguished_from_missing_run() {
    let app = seeded_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/runs/run_a/checkpoints/9", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], json!("CHECKPOINT_NOT_FOUND"));
}

#[tokio::test]
async fn hide_and_restore_round_trip_through_admin() {
    let app = seeded_app().await;

    let (status, body) = send(&app, "DELETE", "/api/v1/runs/run_a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "hidden": 1 }));

    let (_, listed) = send(&app, "GET", "/api/v1/runs", None).await;
    assert_eq!(listed, json!([]));
    let (status, _) = send(&app, "GET", "/api/v1/runs/run_a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, hidden) = send(&app, "GET", "/api/v1/admin/hidden-runs", None).await;
    assert_eq!(hidden[0]["runId"], json!("run_a"));

    let (status, restored) = send(&app, "POST", "/api/v1/admin/hidden-runs/run_a/restore", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["visible"], json!(true));

    let (status, detail) = send(&app, "GET", "/api/v1/runs/run_a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["checkpoints"][0]["timeStep"], json!(1));
}

#[tokio::test]
async fn views_are_wrapped_in_query_responses() {
    let app = seeded_app().await;

    let (status, grid) = send(&app, "GET", "/api/v1/runs/run_a/checkpoints/1/grid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grid["query_type"], json!("grid"));
    assert_eq!(grid["time_step"], json!(1));
    assert_eq!(grid["data"]["width"], json!(8));

    let (status, detail) = send(
        &app,
        "GET",
        "/api/v1/runs/run_a/checkpoints/1/agents/a1?recent_actions=3",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["isCurrent"], json!(true));

    let (status, missing) =
        send(&app, "GET", "/api/v1/runs/run_a/checkpoints/1/agents/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error_code"], json!("AGENT_NOT_FOUND"));

    let (_, timeline) = send(&app, "GET", "/api/v1/runs/run_a/timeline", None).await;
    assert_eq!(timeline["data"]["maxTimeStep"], json!(1));
}

#[tokio::test]
async fn options_requests_get_cors_preflight() {
    let app = router(test_state());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/runs")
        .body(Body::empty())
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn closed_store_answers_service_unavailable() {
    let state = test_state();
    let app = router(state.clone());
    state.shutdown().await.expect("close store");

    let (status, body) = send(&app, "GET", "/api/v1/runs", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], json!("SERVICE_UNAVAILABLE"));
}

#[test]
fn time_step_parsing_accepts_integers_only() {
    assert_eq!(util::parse_time_step("12").expect("integer"), 12);
    assert!(util::parse_time_step("1.5").is_err());
    assert!(util::parse_time_step("").is_err());
}
