//! Lexical fallback analyzer.
//!
//! Pure, deterministic approximations of both remote result shapes, used when
//! a remote analyzer cannot be reached. Every function here is total: empty
//! text yields zero counts, never an error.
//!
//! Two deliberate asymmetries are kept as observed in production:
//! - the fallback labels sentiment at ±0.1 while the combiner uses ±0.05;
//! - primary reading time is ceiled to whole minutes, secondary stays fractional.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{PrimaryAnalysis, SecondaryAnalysis, SentimentLabel};

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "love",
    "like",
    "enjoy",
    "happy",
    "beautiful",
    "perfect",
    "fantastic",
    "brilliant",
    "outstanding",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "dislike",
    "horrible",
    "worst",
    "disappointing",
    "frustrated",
    "angry",
    "sad",
    "upset",
    "annoying",
    "boring",
];

/// Category name → trigger substrings. Order breaks ties.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "technical",
        &["code", "programming", "algorithm", "database", "api"],
    ),
    (
        "personal",
        &["family", "friend", "relationship", "love", "life"],
    ),
    (
        "business",
        &["company", "startup", "market", "investment", "strategy"],
    ),
    (
        "news",
        &["politics", "election", "government", "policy", "economy"],
    ),
];

const DEFAULT_CATEGORY: &str = "general";

const WORDS_PER_MINUTE: f64 = 200.0;
const HIT_WEIGHT: f64 = 0.1;
const LABEL_THRESHOLD: f64 = 0.1;
const MAX_EXTRACTED: usize = 5;
/// Tokens strictly longer than this become primary keywords.
const KEYWORD_MIN_EXCLUSIVE: usize = 5;
/// Tokens strictly longer than this become secondary key phrases.
const KEY_PHRASE_MIN_EXCLUSIVE: usize = 4;
const MAX_CATEGORY_CONFIDENCE: f64 = 0.9;
const CONSTANT_SUBJECTIVITY: f64 = 0.5;

static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| whole_word_alternation(POSITIVE_WORDS));
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| whole_word_alternation(NEGATIVE_WORDS));

fn whole_word_alternation(words: &[&str]) -> Regex {
    let body = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{body})\b")).expect("valid lexicon pattern")
}

/// Baseline for the primary analyzer shape.
pub fn analyze_primary(text: &str) -> PrimaryAnalysis {
    let words = tokenize(text);
    let keywords = longer_than(&words, KEYWORD_MIN_EXCLUSIVE);
    let word_count = words.len() as u64;

    PrimaryAnalysis {
        word_count,
        keyword_count: keywords.len() as u64,
        sentiment_score: lexicon_score(text),
        keywords,
        reading_time_minutes: (word_count as f64 / WORDS_PER_MINUTE).ceil() as u64,
    }
}

/// Baseline for the secondary analyzer shape.
pub fn analyze_secondary(text: &str) -> SecondaryAnalysis {
    let words = tokenize(text);
    let score = lexicon_score(text);
    let (category, best) = detect_category(text);

    SecondaryAnalysis {
        sentiment_score: score,
        sentiment_label: SentimentLabel::from_score(score, LABEL_THRESHOLD),
        subjectivity_score: CONSTANT_SUBJECTIVITY,
        category: category.to_string(),
        category_confidence: (best as f64 / 5.0).min(MAX_CATEGORY_CONFIDENCE),
        key_phrases: longer_than(&words, KEY_PHRASE_MIN_EXCLUSIVE),
        word_count: words.len() as u64,
        reading_time_minutes: words.len() as f64 / WORDS_PER_MINUTE,
    }
}

/// Whitespace-run tokenization; empty tokens never appear.
fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// First `MAX_EXTRACTED` tokens longer than `min_exclusive` chars, document order.
fn longer_than(words: &[&str], min_exclusive: usize) -> Vec<String> {
    words
        .iter()
        .filter(|w| w.chars().count() > min_exclusive)
        .take(MAX_EXTRACTED)
        .map(|w| (*w).to_string())
        .collect()
}

/// +0.1 per positive whole-word hit, -0.1 per negative hit, clamped to [-1, 1].
fn lexicon_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let pos = POSITIVE_RE.find_iter(&lower).count() as f64;
    let neg = NEGATIVE_RE.find_iter(&lower).count() as f64;
    (pos * HIT_WEIGHT - neg * HIT_WEIGHT).clamp(-1.0, 1.0)
}

/// Substring-containment scoring; returns the winner and its score.
fn detect_category(text: &str) -> (&'static str, usize) {
    let lower = text.to_lowercase();
    let mut best = (DEFAULT_CATEGORY, 0usize);
    for (name, triggers) in CATEGORIES {
        let score = triggers.iter().filter(|t| lower.contains(**t)).count();
        if score > best.1 {
            best = (*name, score);
        }
    }
    best
}
