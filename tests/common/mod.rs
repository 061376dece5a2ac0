// tests/common/mod.rs
//
// Scripted analyzer transports and a recording observer shared by the
// integration tests. No sockets involved.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use post_analyzer::analyze::{
    AnalysisOrchestrator, AnalyzerClient, AnalyzerRole, AnalyzerTransport, CallError,
    CombinedVerdict, RetryPolicy,
};
use post_analyzer::history::LogSinkError;
use post_analyzer::observe::AnalysisObserver;

pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(10);
pub const SECONDARY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn primary_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(200), Duration::from_millis(2_000))
}

#[derive(Clone)]
pub enum Step {
    Reply(Value),
    Fail(CallError),
    /// Answers only after this long (timeouts fire first).
    Delay(Duration, Value),
    Hang,
    Panic,
}

/// Plays back steps in order; the last step repeats once the script runs out.
pub struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
}

impl Scripted {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(vec![step])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Step {
        let mut steps = self.steps.lock();
        match steps.pop_front() {
            Some(s) => {
                *self.last.lock() = Some(s.clone());
                s
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or(Step::Fail(CallError::Transport("empty script".into()))),
        }
    }
}

#[async_trait]
impl AnalyzerTransport for Scripted {
    async fn analyze(&self, _text: &str) -> Result<Value, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next() {
            Step::Reply(v) => Ok(v),
            Step::Fail(e) => Err(e),
            Step::Delay(d, v) => {
                tokio::time::sleep(d).await;
                Ok(v)
            }
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(CallError::Transport("hung call woke up".into()))
            }
            Step::Panic => panic!("scripted analyzer crash"),
        }
    }

    fn endpoint(&self) -> &str {
        "scripted"
    }
}

pub fn primary_body(score: f64, keywords: &[&str]) -> Value {
    json!({
        "wordCount": 42,
        "keywordCount": keywords.len(),
        "sentimentScore": score,
        "keywords": keywords,
        "readingTime": 1
    })
}

pub fn secondary_body(score: f64, label: &str, phrases: &[&str]) -> Value {
    json!({
        "sentiment_score": score,
        "sentiment_label": label,
        "subjectivity_score": 0.4,
        "text_category": "technical",
        "category_confidence": 0.8,
        "key_phrases": phrases,
        "word_count": 42,
        "reading_time_minutes": 0.21
    })
}

pub fn connection_refused() -> Step {
    Step::Fail(CallError::ConnectionRefused("127.0.0.1:9 refused".into()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AttemptFailed(AnalyzerRole, u32, &'static str),
    Settled(AnalyzerRole, bool),
    Crashed(AnalyzerRole),
    Verdict(Option<i64>),
    LogWriteFailed(i64),
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn failures(&self, role: AnalyzerRole) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::AttemptFailed(r, _, cause) if r == role => Some(cause),
                _ => None,
            })
            .collect()
    }
}

impl AnalysisObserver for Recorder {
    fn attempt_failed(&self, role: AnalyzerRole, attempt: u32, err: &CallError) {
        self.events
            .lock()
            .push(Event::AttemptFailed(role, attempt, err.cause()));
    }

    fn analyzer_settled(&self, role: AnalyzerRole, available: bool, _latency_ms: u64) {
        self.events.lock().push(Event::Settled(role, available));
    }

    fn task_crashed(&self, role: AnalyzerRole, _reason: &str) {
        self.events.lock().push(Event::Crashed(role));
    }

    fn verdict_ready(&self, post_id: Option<i64>, _verdict: &CombinedVerdict) {
        self.events.lock().push(Event::Verdict(post_id));
    }

    fn log_write_failed(&self, post_id: i64, _err: &LogSinkError) {
        self.events.lock().push(Event::LogWriteFailed(post_id));
    }
}

/// Orchestrator with production-shaped policies over scripted transports.
pub fn orchestrator(
    primary: Arc<Scripted>,
    secondary: Arc<Scripted>,
    recorder: Arc<Recorder>,
) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        AnalyzerClient::new(primary, PRIMARY_TIMEOUT, primary_retry())
            .with_observer(recorder.clone()),
        AnalyzerClient::new(secondary, SECONDARY_TIMEOUT, RetryPolicy::none())
            .with_observer(recorder.clone()),
    )
    .with_observer(recorder)
}
