//! Remote analyzer client: transport abstraction, boundary validation and the
//! per-role retry policy.
//!
//! `invoke` never fails for availability reasons. Transport errors, timeouts,
//! HTTP error statuses and malformed bodies all end in the lexical fallback
//! with `available = false`. Only blank input is an error.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use super::error::{ensure_text, AnalysisError, CallError};
use super::lexical;
use super::types::{AnalyzerOutcome, AnalyzerRole, PrimaryAnalysis, SecondaryAnalysis, SentimentLabel};
use crate::observe::{DynObserver, NoopObserver};

/// Largest keyword / key-phrase list kept from a remote response.
const MAX_REMOTE_TERMS: usize = 5;

// ------------------------------------------------------------
// Transport
// ------------------------------------------------------------

/// Low-level request/response call to one analyzer backend. Separated from
/// the client so tests can script failures without sockets.
#[async_trait]
pub trait AnalyzerTransport: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Value, CallError>;

    /// Endpoint description for diagnostics.
    fn endpoint(&self) -> &str;
}

pub type DynTransport = Arc<dyn AnalyzerTransport>;

/// `POST {base}/analyze` with `{"text": ...}`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("post-analyzer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// `GET {base}/health`; true on any 2xx.
    pub async fn probe(&self, timeout: Duration) -> Result<(), CallError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(timeout)
            .send()
            .await?;
        resp.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl AnalyzerTransport for HttpTransport {
    async fn analyze(&self, text: &str) -> Result<Value, CallError> {
        #[derive(Serialize)]
        struct Req<'a> {
            text: &'a str,
        }

        let resp = self
            .http
            .post(format!("{}/analyze", self.base_url))
            .json(&Req { text })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CallError::HttpStatus(status.as_u16()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| CallError::Malformed(e.to_string()))
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}

// ------------------------------------------------------------
// Result shapes: boundary validation + fallback
// ------------------------------------------------------------

/// A result shape one analyzer role produces.
pub trait RemoteAnalysis: Sized + Send + 'static {
    const ROLE: AnalyzerRole;

    /// Structural check of a raw response body.
    fn from_response(body: Value) -> Result<Self, CallError>;

    /// Local substitute when the remote is unavailable.
    fn fallback(text: &str) -> Self;
}

/// Primary service wire format (camelCase; reading time as `readingTime`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryWire {
    word_count: u64,
    #[serde(default)]
    keyword_count: Option<u64>,
    sentiment_score: f64,
    keywords: Vec<String>,
    #[serde(alias = "readingTimeMinutes")]
    reading_time: u64,
}

/// Secondary service wire format (snake_case).
#[derive(Debug, Deserialize)]
struct SecondaryWire {
    sentiment_score: f64,
    sentiment_label: SentimentLabel,
    subjectivity_score: f64,
    #[serde(alias = "category")]
    text_category: String,
    category_confidence: f64,
    #[serde(default)]
    key_phrases: Vec<String>,
    word_count: u64,
    reading_time_minutes: f64,
}

fn malformed(msg: impl Into<String>) -> CallError {
    CallError::Malformed(msg.into())
}

fn in_range(name: &str, v: f64, lo: f64, hi: f64) -> Result<f64, CallError> {
    if !v.is_finite() {
        return Err(malformed(format!("{name} is not finite")));
    }
    if !(lo..=hi).contains(&v) {
        return Err(malformed(format!("{name}={v} outside [{lo}, {hi}]")));
    }
    Ok(v)
}

fn truncated(mut terms: Vec<String>) -> Vec<String> {
    terms.truncate(MAX_REMOTE_TERMS);
    terms
}

impl RemoteAnalysis for PrimaryAnalysis {
    const ROLE: AnalyzerRole = AnalyzerRole::Primary;

    fn from_response(body: Value) -> Result<Self, CallError> {
        let w: PrimaryWire =
            serde_json::from_value(body).map_err(|e| malformed(format!("primary: {e}")))?;
        if !w.sentiment_score.is_finite() {
            return Err(malformed("primary: sentimentScore is not finite"));
        }
        let keywords = truncated(w.keywords);
        Ok(PrimaryAnalysis {
            word_count: w.word_count,
            keyword_count: w.keyword_count.unwrap_or(keywords.len() as u64),
            sentiment_score: w.sentiment_score,
            keywords,
            reading_time_minutes: w.reading_time,
        })
    }

    fn fallback(text: &str) -> Self {
        lexical::analyze_primary(text)
    }
}

impl RemoteAnalysis for SecondaryAnalysis {
    const ROLE: AnalyzerRole = AnalyzerRole::Secondary;

    fn from_response(body: Value) -> Result<Self, CallError> {
        let w: SecondaryWire =
            serde_json::from_value(body).map_err(|e| malformed(format!("secondary: {e}")))?;
        let reading = w.reading_time_minutes;
        if !reading.is_finite() || reading < 0.0 {
            return Err(malformed("secondary: reading_time_minutes must be >= 0"));
        }
        Ok(SecondaryAnalysis {
            sentiment_score: in_range("sentiment_score", w.sentiment_score, -1.0, 1.0)?,
            sentiment_label: w.sentiment_label,
            subjectivity_score: in_range("subjectivity_score", w.subjectivity_score, 0.0, 1.0)?,
            category: w.text_category,
            category_confidence: in_range("category_confidence", w.category_confidence, 0.0, 1.0)?,
            key_phrases: truncated(w.key_phrases),
            word_count: w.word_count,
            reading_time_minutes: reading,
        })
    }

    fn fallback(text: &str) -> Self {
        lexical::analyze_secondary(text)
    }
}

// ------------------------------------------------------------
// Retry policy
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Backoff before the attempt following `attempt` (1-based): base × attempt, capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt)
            .min(self.max_delay)
    }
}

// ------------------------------------------------------------
// Client
// ------------------------------------------------------------

/// Calls one analyzer role with timeout, retries and fallback.
pub struct AnalyzerClient<R: RemoteAnalysis> {
    transport: DynTransport,
    timeout: Duration,
    retry: RetryPolicy,
    observer: DynObserver,
    _shape: PhantomData<fn() -> R>,
}

impl<R: RemoteAnalysis> AnalyzerClient<R> {
    pub fn new(transport: DynTransport, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            transport,
            timeout,
            retry,
            observer: Arc::new(NoopObserver),
            _shape: PhantomData,
        }
    }

    pub fn with_observer(mut self, observer: DynObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn role(&self) -> AnalyzerRole {
        R::ROLE
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Latency is measured from the first attempt's start, so a late success
    /// reports the time spent on every attempt before it.
    pub async fn invoke(&self, text: &str) -> Result<AnalyzerOutcome<R>, AnalysisError> {
        ensure_text(text)?;

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(text).await {
                Ok(value) => {
                    let latency_ms = elapsed_ms(started);
                    self.observer.analyzer_settled(R::ROLE, true, latency_ms);
                    return Ok(AnalyzerOutcome::remote(value, latency_ms));
                }
                Err(err) => {
                    self.observer.attempt_failed(R::ROLE, attempt, &err);
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                        continue;
                    }
                    let value = R::fallback(text);
                    let latency_ms = elapsed_ms(started);
                    self.observer.analyzer_settled(R::ROLE, false, latency_ms);
                    return Ok(AnalyzerOutcome::fallback(value, latency_ms));
                }
            }
        }
    }

    async fn attempt(&self, text: &str) -> Result<R, CallError> {
        let body = tokio::time::timeout(self.timeout, self.transport.analyze(text))
            .await
            .map_err(|_| CallError::Timeout)??;
        R::from_response(body)
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
