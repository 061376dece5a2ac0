// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with
// scripted analyzers behind the orchestrator.
//
// Covered:
// - GET /health
// - POST /analyze (200 contract, 400 on blank or missing text)
// - GET /analysis/history/{post_id}
// - GET /analysis/stats

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::*;
use post_analyzer::api::{self, AppState};
use post_analyzer::history::InMemoryHistory;
use post_analyzer::AnalysisOrchestrator;

const BODY_LIMIT: usize = 1024 * 1024;

fn test_orchestrator() -> Arc<AnalysisOrchestrator> {
    let orch = orchestrator(
        Scripted::always(Step::Reply(primary_body(0.5, &["markets", "rally"]))),
        Scripted::always(connection_refused()),
        Recorder::new(),
    )
    .with_log_sink(Arc::new(InMemoryHistory::with_capacity(64)));
    Arc::new(orch)
}

fn test_router(orch: Arc<AnalysisOrchestrator>) -> Router {
    api::router(AppState::new(orch))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn post_analyze(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /analyze")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(test_orchestrator());

    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_analyze_returns_combined_verdict() {
    let app = test_router(test_orchestrator());

    let (status, v) = send(
        &app,
        post_analyze(json!({ "text": "Markets had a great and excellent session." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Contract checks for UI consumers
    for key in ["primary", "secondary", "combinedSentiment", "insights", "timing", "quality"] {
        assert!(v.get(key).is_some(), "missing '{key}' in {v}");
    }
    assert_eq!(v["quality"]["primaryAvailable"], json!(true));
    assert_eq!(v["quality"]["secondaryAvailable"], json!(false));
    assert_eq!(v["quality"]["fallbackUsed"], json!(true));
    assert_eq!(v["combinedSentiment"]["label"], json!("positive"));
    assert!(v["timing"]["totalMs"].is_u64());
    assert_eq!(v["primary"]["keywords"], json!(["markets", "rally"]));
}

#[tokio::test]
async fn api_analyze_rejects_blank_or_missing_text() {
    let app = test_router(test_orchestrator());

    for payload in [json!({ "text": "   " }), json!({ "postId": 4 }), json!({ "text": null })] {
        let (status, v) = send(&app, post_analyze(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(v["error"].as_str().is_some(), "error body for {payload}: {v}");
    }
}

#[tokio::test]
async fn api_history_and_stats_reflect_logged_runs() {
    let orch = test_orchestrator();
    let app = test_router(orch.clone());

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            post_analyze(json!({ "text": "A great quarter for everyone", "postId": 11 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    // no postId, not logged
    send(&app, post_analyze(json!({ "text": "A great quarter" }))).await;
    assert_eq!(orch.flush(Duration::from_secs(2)).await, 0);

    let (status, history) = send(&app, get("/analysis/history/11")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().expect("history array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], json!("enhanced_analysis"));
    assert_eq!(entries[0]["postId"], json!(11));

    let (_, empty) = send(&app, get("/analysis/history/12")).await;
    assert_eq!(empty, json!([]));

    let (status, stats) = send(&app, get("/analysis/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalAnalyses"], json!(2));
    assert_eq!(stats["fallbackAnalyses"], json!(2));
    assert_eq!(stats["remoteAnalyses"], json!(0));
}

#[tokio::test]
async fn api_history_rejects_non_numeric_post_id() {
    let app = test_router(test_orchestrator());
    let resp = app
        .oneshot(get("/analysis/history/abc"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
