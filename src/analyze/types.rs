//! types.rs: shapes shared by the analyzers, the combiner and the API.
//!
//! Everything here is created per request and never mutated after it leaves
//! the component that built it. JSON field names are camelCase so the UI can
//! consume the verdict as-is.

use serde::{Deserialize, Serialize};

/// Which of the two remote backends a call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerRole {
    Primary,
    Secondary,
}

impl AnalyzerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyzerRole::Primary => "primary",
            AnalyzerRole::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for AnalyzerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of a single orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub text: String,
    /// Ties the run to a log entry; ephemeral run when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            post_id: None,
        }
    }

    pub fn for_post(text: impl Into<String>, post_id: i64) -> Self {
        Self {
            text: text.into(),
            post_id: Some(post_id),
        }
    }
}

/// Result shape of the primary analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAnalysis {
    pub word_count: u64,
    pub keyword_count: u64,
    /// Not bounded by the remote; expected near [-1, 1].
    pub sentiment_score: f64,
    pub keywords: Vec<String>,
    /// Whole minutes, ceiled.
    pub reading_time_minutes: u64,
}

/// Result shape of the secondary analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryAnalysis {
    /// In [-1, 1].
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    /// In [0, 1].
    pub subjectivity_score: f64,
    pub category: String,
    /// In [0, 1].
    pub category_confidence: f64,
    pub key_phrases: Vec<String>,
    pub word_count: u64,
    /// Fractional minutes, not ceiled.
    pub reading_time_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Symmetric threshold labeling: `> t` positive, `< -t` negative.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            SentimentLabel::Positive
        } else if score < -threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readability {
    Easy,
    Moderate,
    Complex,
}

/// What one analyzer invocation settled to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerOutcome<T> {
    pub value: T,
    pub latency_ms: u64,
    /// True only when a validated remote response was used.
    pub available: bool,
}

impl<T> AnalyzerOutcome<T> {
    pub fn remote(value: T, latency_ms: u64) -> Self {
        Self {
            value,
            latency_ms,
            available: true,
        }
    }

    pub fn fallback(value: T, latency_ms: u64) -> Self {
        Self {
            value,
            latency_ms,
            available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSentiment {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInsights {
    pub category: String,
    pub readability: Readability,
    /// At most 8, no duplicates, first-seen order.
    pub key_topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTime {
    pub primary_ms: u64,
    pub secondary_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuality {
    pub primary_available: bool,
    pub secondary_available: bool,
    pub fallback_used: bool,
}

/// The merged answer returned to callers. Both sub-results are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedVerdict {
    pub primary: PrimaryAnalysis,
    pub secondary: SecondaryAnalysis,
    pub combined_sentiment: CombinedSentiment,
    pub insights: TextInsights,
    pub timing: ProcessingTime,
    pub quality: AnalysisQuality,
}
