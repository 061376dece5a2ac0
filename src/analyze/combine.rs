//! Result combiner: merges both analyzer outcomes into one verdict.
//!
//! combined = 0.4 * tanh(primary) + 0.6 * secondary
//!
//! The primary score is squashed first because the remote does not bound it;
//! the secondary score is already in [-1, 1] and used as-is.

use super::types::{
    AnalysisQuality, AnalyzerOutcome, CombinedSentiment, CombinedVerdict, PrimaryAnalysis,
    ProcessingTime, Readability, SecondaryAnalysis, SentimentLabel, TextInsights,
};

pub const PRIMARY_WEIGHT: f64 = 0.4;
pub const SECONDARY_WEIGHT: f64 = 0.6;
/// Looser than the fallback analyzer's ±0.1.
pub const LABEL_THRESHOLD: f64 = 0.05;
pub const BASE_CONFIDENCE: f64 = 0.1;
pub const MAX_KEY_TOPICS: usize = 8;

const EASY_BELOW_MINUTES: f64 = 0.5;
const MODERATE_BELOW_MINUTES: f64 = 2.0;

/// Pure given its inputs.
pub fn combine(
    primary: AnalyzerOutcome<PrimaryAnalysis>,
    secondary: AnalyzerOutcome<SecondaryAnalysis>,
    elapsed_total_ms: u64,
) -> CombinedVerdict {
    let score = blend(primary.value.sentiment_score, secondary.value.sentiment_score);

    let insights = TextInsights {
        category: secondary.value.category.clone(),
        readability: readability(secondary.value.reading_time_minutes),
        key_topics: key_topics(&primary.value.keywords, &secondary.value.key_phrases),
    };

    CombinedVerdict {
        combined_sentiment: CombinedSentiment {
            score,
            label: SentimentLabel::from_score(score, LABEL_THRESHOLD),
            confidence: (score.abs() + BASE_CONFIDENCE).min(1.0),
        },
        insights,
        timing: ProcessingTime {
            primary_ms: primary.latency_ms,
            secondary_ms: secondary.latency_ms,
            total_ms: elapsed_total_ms,
        },
        quality: AnalysisQuality {
            primary_available: primary.available,
            secondary_available: secondary.available,
            fallback_used: !primary.available || !secondary.available,
        },
        primary: primary.value,
        secondary: secondary.value,
    }
}

/// Weighted blend; stays in [-1, 1] for any finite primary score.
pub fn blend(primary_score: f64, secondary_score: f64) -> f64 {
    let normalized = primary_score.tanh();
    let raw = PRIMARY_WEIGHT * normalized + SECONDARY_WEIGHT * secondary_score;
    // NaN from a non-finite input collapses to neutral
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(-1.0, 1.0)
    }
}

pub fn readability(reading_time_minutes: f64) -> Readability {
    if reading_time_minutes < EASY_BELOW_MINUTES {
        Readability::Easy
    } else if reading_time_minutes < MODERATE_BELOW_MINUTES {
        Readability::Moderate
    } else {
        Readability::Complex
    }
}

/// Keywords then key phrases, first occurrence wins, at most `MAX_KEY_TOPICS`.
pub fn key_topics(keywords: &[String], key_phrases: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_KEY_TOPICS);
    for topic in keywords.iter().chain(key_phrases) {
        if out.len() == MAX_KEY_TOPICS {
            break;
        }
        if !out.contains(topic) {
            out.push(topic.clone());
        }
    }
    out
}
