//! # Analysis Orchestrator
//! Runs both analyzer roles concurrently, waits for both to settle, combines
//! them and hands the verdict back. Log persistence happens in a detached
//! task that is never on the return path.
//!
//! Each role runs in its own spawned task. Dropping the `analyze` future
//! aborts both tasks; a task that dies is replaced by that role's fallback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::task::TaskTracker;

use super::combine::combine;
use super::error::{ensure_text, AnalysisError};
use super::remote::{elapsed_ms, AnalyzerClient, RemoteAnalysis};
use super::types::{
    AnalysisRequest, AnalyzerOutcome, CombinedVerdict, PrimaryAnalysis, SecondaryAnalysis,
};
use crate::history::{AnalysisLogEntry, AnalysisLogSink, AnalysisStats, LogSinkError};
use crate::observe::{DynObserver, NoopObserver};

/// Join handle that aborts its task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct AnalysisOrchestrator {
    primary: Arc<AnalyzerClient<PrimaryAnalysis>>,
    secondary: Arc<AnalyzerClient<SecondaryAnalysis>>,
    sink: Option<Arc<dyn AnalysisLogSink>>,
    observer: DynObserver,
    /// In-flight log writes. Detached: dropping the orchestrator leaves them
    /// running; `flush` only waits on them.
    pending_writes: TaskTracker,
}

impl AnalysisOrchestrator {
    pub fn new(
        primary: AnalyzerClient<PrimaryAnalysis>,
        secondary: AnalyzerClient<SecondaryAnalysis>,
    ) -> Self {
        Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
            sink: None,
            observer: Arc::new(NoopObserver),
            pending_writes: TaskTracker::new(),
        }
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn AnalysisLogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_observer(mut self, observer: DynObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn primary(&self) -> &AnalyzerClient<PrimaryAnalysis> {
        &self.primary
    }

    pub fn secondary(&self) -> &AnalyzerClient<SecondaryAnalysis> {
        &self.secondary
    }

    /// Only blank text is an error; every other failure degrades to a
    /// fallback and is reported in `quality`.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<CombinedVerdict, AnalysisError> {
        ensure_text(&request.text)?;

        let started = Instant::now();
        let text: Arc<str> = Arc::from(request.text.as_str());

        let primary = spawn_role(Arc::clone(&self.primary), Arc::clone(&text));
        let secondary = spawn_role(Arc::clone(&self.secondary), Arc::clone(&text));

        // settle both; neither side cancels the other
        let (p, s) = tokio::join!(primary, secondary);

        let p = self.settle(p, &text, started);
        let s = self.settle(s, &text, started);
        let verdict = combine(p, s, elapsed_ms(started));

        self.observer.verdict_ready(request.post_id, &verdict);
        if let Some(post_id) = request.post_id {
            self.persist(post_id, &verdict);
        }
        Ok(verdict)
    }

    /// Turns a task result into an outcome, substituting the fallback when the
    /// task itself died.
    fn settle<R: RemoteAnalysis>(
        &self,
        joined: Result<Result<AnalyzerOutcome<R>, AnalysisError>, JoinError>,
        text: &str,
        started: Instant,
    ) -> AnalyzerOutcome<R> {
        let reason = match joined {
            Ok(Ok(outcome)) => return outcome,
            // text was validated before dispatch
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        self.observer.task_crashed(R::ROLE, &reason);
        AnalyzerOutcome::fallback(R::fallback(text), elapsed_ms(started))
    }

    /// Fire-and-forget append. Failures go to the observer and are not retried.
    fn persist(&self, post_id: i64, verdict: &CombinedVerdict) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let entry = AnalysisLogEntry::enhanced(post_id, verdict.clone());
        let observer = Arc::clone(&self.observer);
        let task = async move {
            if let Err(e) = sink.append(entry).await {
                observer.log_write_failed(post_id, &e);
            }
        };
        self.pending_writes.spawn(task);
    }

    /// Waits for in-flight log writes, up to `timeout`. Returns how many
    /// writes were still running when the deadline hit. Cancelling this
    /// future, or hitting the deadline, leaves the writes running.
    pub async fn flush(&self, timeout: Duration) -> usize {
        // a closed tracker still accepts writes; closing only lets `wait` finish
        self.pending_writes.close();
        let drained = tokio::time::timeout(timeout, self.pending_writes.wait()).await;
        self.pending_writes.reopen();
        match drained {
            Ok(()) => 0,
            Err(_) => self.pending_writes.len(),
        }
    }

    /// Stored runs for one post, newest first. Empty when no sink is attached.
    pub async fn history(&self, post_id: i64) -> Result<Vec<AnalysisLogEntry>, LogSinkError> {
        match &self.sink {
            Some(sink) => sink.query_by_post_id(post_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn stats(&self) -> Result<AnalysisStats, LogSinkError> {
        match &self.sink {
            Some(sink) => sink.stats().await,
            None => Ok(AnalysisStats::default()),
        }
    }
}

fn spawn_role<R: RemoteAnalysis>(
    client: Arc<AnalyzerClient<R>>,
    text: Arc<str>,
) -> AbortOnDrop<Result<AnalyzerOutcome<R>, AnalysisError>> {
    AbortOnDrop(tokio::spawn(async move { client.invoke(&text).await }))
}
