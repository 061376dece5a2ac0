// src/analyze/mod.rs
//! Analysis pipeline: lexical fallback, remote clients, combiner and the
//! orchestrator tying them together.

pub mod combine;
pub mod error;
pub mod lexical;
pub mod orchestrator;
pub mod remote;
pub mod types;

use std::time::Duration;

// Re-export convenient types.
pub use crate::analyze::combine::combine;
pub use crate::analyze::error::{AnalysisError, CallError};
pub use crate::analyze::orchestrator::AnalysisOrchestrator;
pub use crate::analyze::remote::{
    AnalyzerClient, AnalyzerTransport, DynTransport, HttpTransport, RemoteAnalysis, RetryPolicy,
};
pub use crate::analyze::types::{
    AnalysisRequest, AnalyzerOutcome, AnalyzerRole, CombinedVerdict, PrimaryAnalysis, Readability,
    SecondaryAnalysis, SentimentLabel,
};

use crate::config::analyzer::AnalyzerConfig;
use crate::observe::DynObserver;

/// Primary client per config: retries with linear backoff.
pub fn primary_client(
    cfg: &AnalyzerConfig,
    transport: DynTransport,
    observer: DynObserver,
) -> AnalyzerClient<PrimaryAnalysis> {
    let retry = RetryPolicy::new(
        cfg.max_retries,
        Duration::from_millis(cfg.retry_base_delay_ms),
        Duration::from_millis(cfg.retry_max_delay_ms),
    );
    AnalyzerClient::new(transport, Duration::from_millis(cfg.primary_timeout_ms), retry)
        .with_observer(observer)
}

/// Secondary client per config: single attempt.
pub fn secondary_client(
    cfg: &AnalyzerConfig,
    transport: DynTransport,
    observer: DynObserver,
) -> AnalyzerClient<SecondaryAnalysis> {
    AnalyzerClient::new(
        transport,
        Duration::from_millis(cfg.secondary_timeout_ms),
        RetryPolicy::none(),
    )
    .with_observer(observer)
}
