use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::analyze::{AnalysisError, AnalysisOrchestrator, AnalysisRequest, CombinedVerdict};
use crate::history::{AnalysisLogEntry, AnalysisStats, LogSinkError};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .route("/analysis/history/{post_id}", get(analysis_history))
        .route("/analysis/stats", get(analysis_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReq {
    // missing text is reported as invalid input, not as a JSON rejection
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    post_id: Option<i64>,
}

enum ApiError {
    BadRequest(String),
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.to_string()),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

fn sink_failure(what: &'static str, e: LogSinkError) -> ApiError {
    error!(target: "api", error = %e, "{what}");
    ApiError::Internal(what)
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<CombinedVerdict>, ApiError> {
    let request = AnalysisRequest {
        text: body.text.unwrap_or_default(),
        post_id: body.post_id,
    };
    let verdict = state.orchestrator.analyze(request).await?;
    Ok(Json(verdict))
}

async fn analysis_history(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<AnalysisLogEntry>>, ApiError> {
    state
        .orchestrator
        .history(post_id)
        .await
        .map(Json)
        .map_err(|e| sink_failure("failed to fetch analysis history", e))
}

async fn analysis_stats(State(state): State<AppState>) -> Result<Json<AnalysisStats>, ApiError> {
    state
        .orchestrator
        .stats()
        .await
        .map(Json)
        .map_err(|e| sink_failure("failed to fetch analysis stats", e))
}
