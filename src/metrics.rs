use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::config::AnalyzerConfig;

/// The recorder can be installed once per process; later `init` calls reuse it.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured call budget
    /// as static gauges.
    pub fn init(cfg: &AnalyzerConfig) -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        gauge!("analyzer_timeout_ms", "role" => "primary").set(cfg.primary_timeout_ms as f64);
        gauge!("analyzer_timeout_ms", "role" => "secondary").set(cfg.secondary_timeout_ms as f64);
        gauge!("analyzer_max_attempts", "role" => "primary").set(f64::from(cfg.max_retries));

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
