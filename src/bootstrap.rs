// src/bootstrap.rs
use crate::analyze::{
    primary_client, secondary_client, AnalysisOrchestrator, DynTransport, HttpTransport,
};
use crate::config::AnalyzerConfig;
use crate::history::{AnalysisLogSink, InMemoryHistory, JsonlHistory};
use crate::observe::{DynObserver, TracingObserver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health of both analyzers at probe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub primary_up: bool,
    pub secondary_up: bool,
}

/// Everything the service needs, wired from one config.
pub struct AnalyzerRuntime {
    pub cfg: AnalyzerConfig,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    primary_http: HttpTransport,
    secondary_http: HttpTransport,
}

impl AnalyzerRuntime {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_config(AnalyzerConfig::load()?)
    }

    pub fn from_config(cfg: AnalyzerConfig) -> anyhow::Result<Self> {
        // Safe diagnostics: endpoints + budget only
        info!(
            "analyzer cfg loaded: primary={} ({}ms x{}), secondary={} ({}ms), log={}",
            cfg.primary_endpoint,
            cfg.primary_timeout_ms,
            cfg.max_retries,
            cfg.secondary_endpoint,
            cfg.secondary_timeout_ms,
            cfg.log_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string())
        );

        let observer: DynObserver = Arc::new(TracingObserver::new());
        let primary_http = HttpTransport::new(&cfg.primary_endpoint)?;
        let secondary_http = HttpTransport::new(&cfg.secondary_endpoint)?;

        let sink: Arc<dyn AnalysisLogSink> = match &cfg.log_path {
            Some(path) => Arc::new(JsonlHistory::new(path)),
            None => Arc::new(InMemoryHistory::with_capacity(cfg.log_capacity)),
        };

        let primary_t: DynTransport = Arc::new(primary_http.clone());
        let secondary_t: DynTransport = Arc::new(secondary_http.clone());
        let orchestrator = AnalysisOrchestrator::new(
            primary_client(&cfg, primary_t, Arc::clone(&observer)),
            secondary_client(&cfg, secondary_t, Arc::clone(&observer)),
        )
        .with_log_sink(sink)
        .with_observer(observer);

        Ok(Self {
            cfg,
            orchestrator: Arc::new(orchestrator),
            primary_http,
            secondary_http,
        })
    }

    /// Hits both `/health` endpoints once. Never fails; an analyzer that is
    /// down only means its role will run on the lexical fallback.
    pub async fn quick_probe(&self) -> ProbeReport {
        let (p, s) = tokio::join!(
            self.primary_http.probe(PROBE_TIMEOUT),
            self.secondary_http.probe(PROBE_TIMEOUT)
        );
        for (role, endpoint, res) in [
            ("primary", &self.cfg.primary_endpoint, &p),
            ("secondary", &self.cfg.secondary_endpoint, &s),
        ] {
            match res {
                Ok(()) => info!(role, endpoint = %endpoint, "analyzer reachable"),
                Err(e) => warn!(
                    role,
                    endpoint = %endpoint,
                    cause = e.cause(),
                    error = %e,
                    "analyzer unreachable, fallback analysis will be used"
                ),
            }
        }
        ProbeReport {
            primary_up: p.is_ok(),
            secondary_up: s.is_ok(),
        }
    }
}
