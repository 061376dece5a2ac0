// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod history;
pub mod metrics;
pub mod observe;

// Orchestrator, remote clients, lexical fallback and combiner
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{
    AnalysisError, AnalysisOrchestrator, AnalysisRequest, CombinedVerdict,
};
pub use crate::api::router;
pub use crate::bootstrap::AnalyzerRuntime;

use axum::Router;

/// Full in-process app: config from env/files, orchestrator, API and `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let runtime = AnalyzerRuntime::from_env()?;
    let metrics = metrics::Metrics::init(&runtime.cfg)?;
    let state = api::AppState::new(runtime.orchestrator.clone());
    Ok(api::router(state).merge(metrics.router()))
}
