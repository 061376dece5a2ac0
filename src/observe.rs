// src/observe.rs
//! Observability hooks injected into the analyzer clients and the orchestrator.

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::analyze::error::CallError;
use crate::analyze::types::{AnalyzerRole, CombinedVerdict};
use crate::history::LogSinkError;

/// Receives diagnostics from the analysis pipeline. All methods default to
/// no-ops so implementations only override what they care about.
pub trait AnalysisObserver: Send + Sync {
    /// One remote attempt failed; the client may still retry.
    fn attempt_failed(&self, _role: AnalyzerRole, _attempt: u32, _err: &CallError) {}

    /// An analyzer invocation settled, remote or fallback.
    fn analyzer_settled(&self, _role: AnalyzerRole, _available: bool, _latency_ms: u64) {}

    /// An analyzer task died before settling; a fallback was substituted.
    fn task_crashed(&self, _role: AnalyzerRole, _reason: &str) {}

    fn verdict_ready(&self, _post_id: Option<i64>, _verdict: &CombinedVerdict) {}

    fn log_write_failed(&self, _post_id: i64, _err: &LogSinkError) {}
}

pub type DynObserver = Arc<dyn AnalysisObserver>;

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "analyzer_attempt_failures_total",
            "Failed remote analyzer attempts by role and cause."
        );
        describe_counter!(
            "analyzer_calls_total",
            "Settled analyzer invocations by role and availability."
        );
        describe_histogram!(
            "analyzer_latency_ms",
            "Analyzer invocation latency in milliseconds, retries included."
        );
        describe_counter!(
            "analysis_verdicts_total",
            "Combined verdicts produced, by sentiment label."
        );
        describe_counter!(
            "analysis_log_write_failures_total",
            "Analysis log entries that could not be persisted."
        );
    });
}

/// Default observer: structured `tracing` events plus `metrics` series.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisObserver for TracingObserver {
    fn attempt_failed(&self, role: AnalyzerRole, attempt: u32, err: &CallError) {
        counter!(
            "analyzer_attempt_failures_total",
            "role" => role.as_str(),
            "cause" => err.cause()
        )
        .increment(1);
        warn!(
            target: "analyzer",
            role = role.as_str(),
            attempt,
            cause = err.cause(),
            error = %err,
            "analyzer attempt failed"
        );
    }

    fn analyzer_settled(&self, role: AnalyzerRole, available: bool, latency_ms: u64) {
        counter!(
            "analyzer_calls_total",
            "role" => role.as_str(),
            "available" => if available { "true" } else { "false" }
        )
        .increment(1);
        histogram!("analyzer_latency_ms", "role" => role.as_str()).record(latency_ms as f64);
        if available {
            debug!(target: "analyzer", role = role.as_str(), latency_ms, "remote analysis used");
        } else {
            info!(target: "analyzer", role = role.as_str(), latency_ms, "fallback analysis used");
        }
    }

    fn task_crashed(&self, role: AnalyzerRole, reason: &str) {
        error!(target: "analyzer", role = role.as_str(), reason, "analyzer task crashed");
    }

    fn verdict_ready(&self, post_id: Option<i64>, verdict: &CombinedVerdict) {
        counter!(
            "analysis_verdicts_total",
            "label" => verdict.combined_sentiment.label.as_str()
        )
        .increment(1);
        info!(
            target: "analysis",
            post_id,
            label = verdict.combined_sentiment.label.as_str(),
            score = verdict.combined_sentiment.score,
            fallback_used = verdict.quality.fallback_used,
            total_ms = verdict.timing.total_ms,
            "analysis complete"
        );
    }

    fn log_write_failed(&self, post_id: i64, err: &LogSinkError) {
        counter!("analysis_log_write_failures_total").increment(1);
        error!(target: "analysis", post_id, error = %err, "error logging analysis");
    }
}
