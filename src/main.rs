//! Post analyzer service binary entrypoint.
//! Boots the Axum HTTP server with the analysis orchestrator behind it.

use post_analyzer::{api, metrics::Metrics, AnalyzerRuntime};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ANALYZER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ANALYZER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("post_analyzer=info,warn"));

    // Shuttle may already have installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let runtime = AnalyzerRuntime::from_env()?;
    let probe = runtime.quick_probe().await;
    tracing::info!(
        primary_up = probe.primary_up,
        secondary_up = probe.secondary_up,
        "analyzer probe finished"
    );

    let metrics = Metrics::init(&runtime.cfg)?;
    let state = api::AppState::new(runtime.orchestrator.clone());
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
