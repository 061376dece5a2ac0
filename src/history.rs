//! history.rs: append-only analysis log keyed by post id.
//!
//! The orchestrator only writes here (best-effort, off the request path); the
//! API reads history and aggregate stats back. Two stores are provided: a
//! capped in-memory vector and a JSON-lines file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::analyze::types::CombinedVerdict;

/// Kind tag written for every orchestrator run.
pub const ENHANCED_ANALYSIS: &str = "enhanced_analysis";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisLogEntry {
    pub post_id: Option<i64>,
    pub kind: String,
    pub verdict: CombinedVerdict,
    pub total_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisLogEntry {
    pub fn enhanced(post_id: i64, verdict: CombinedVerdict) -> Self {
        Self {
            post_id: Some(post_id),
            kind: ENHANCED_ANALYSIS.to_string(),
            total_ms: verdict.timing.total_ms,
            verdict,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate counters over every stored entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total_analyses: u64,
    /// Runs where both analyzers answered remotely.
    pub remote_analyses: u64,
    pub fallback_analyses: u64,
    pub average_processing_time_ms: u64,
}

impl AnalysisStats {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a AnalysisLogEntry>,
    {
        let mut stats = AnalysisStats::default();
        let mut total_ms: u128 = 0;
        for e in entries {
            stats.total_analyses += 1;
            total_ms += u128::from(e.total_ms);
            if e.verdict.quality.fallback_used {
                stats.fallback_analyses += 1;
            } else {
                stats.remote_analyses += 1;
            }
        }
        if stats.total_analyses > 0 {
            let avg = total_ms as f64 / stats.total_analyses as f64;
            stats.average_processing_time_ms = avg.round() as u64;
        }
        stats
    }
}

#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("log store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("log entry (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("log store unavailable: {0}")]
    Unavailable(String),
}

/// Narrow save/query interface to the durable analysis log.
#[async_trait]
pub trait AnalysisLogSink: Send + Sync {
    async fn append(&self, entry: AnalysisLogEntry) -> Result<(), LogSinkError>;

    /// Entries for one post, newest first.
    async fn query_by_post_id(&self, post_id: i64) -> Result<Vec<AnalysisLogEntry>, LogSinkError>;

    async fn stats(&self) -> Result<AnalysisStats, LogSinkError>;
}

/// Newest-first for a single post. Input is in append order; the stable sort
/// keeps reverse append order for equal timestamps.
fn newest_first<'a, I>(entries: I, post_id: i64) -> Vec<AnalysisLogEntry>
where
    I: DoubleEndedIterator<Item = &'a AnalysisLogEntry>,
{
    let mut out: Vec<AnalysisLogEntry> = entries
        .rev()
        .filter(|e| e.post_id == Some(post_id))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

// ------------------------------------------------------------
// In-memory store
// ------------------------------------------------------------

#[derive(Debug)]
pub struct InMemoryHistory {
    inner: Mutex<Vec<AnalysisLogEntry>>,
    cap: usize,
}

impl InMemoryHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> LogSinkError {
        LogSinkError::Unavailable("history mutex poisoned".to_string())
    }
}

#[async_trait]
impl AnalysisLogSink for InMemoryHistory {
    async fn append(&self, entry: AnalysisLogEntry) -> Result<(), LogSinkError> {
        let mut v = self.inner.lock().map_err(|_| Self::poisoned())?;
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
        Ok(())
    }

    async fn query_by_post_id(&self, post_id: i64) -> Result<Vec<AnalysisLogEntry>, LogSinkError> {
        let v = self.inner.lock().map_err(|_| Self::poisoned())?;
        Ok(newest_first(v.iter(), post_id))
    }

    async fn stats(&self) -> Result<AnalysisStats, LogSinkError> {
        let v = self.inner.lock().map_err(|_| Self::poisoned())?;
        Ok(AnalysisStats::from_entries(v.iter()))
    }
}

// ------------------------------------------------------------
// JSON-lines file store
// ------------------------------------------------------------

/// One JSON entry per line. Appends are serialized so lines never interleave.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<AnalysisLogEntry>, LogSinkError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AnalysisLogEntry>(line) {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(
                    target: "history",
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping malformed analysis log line"
                ),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl AnalysisLogSink for JsonlHistory {
    async fn append(&self, entry: AnalysisLogEntry) -> Result<(), LogSinkError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    async fn query_by_post_id(&self, post_id: i64) -> Result<Vec<AnalysisLogEntry>, LogSinkError> {
        let all = self.read_all().await?;
        Ok(newest_first(all.iter(), post_id))
    }

    async fn stats(&self) -> Result<AnalysisStats, LogSinkError> {
        let all = self.read_all().await?;
        Ok(AnalysisStats::from_entries(all.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{combine::combine, lexical, types::AnalyzerOutcome};
    use chrono::Duration;

    fn verdict(text: &str, primary_up: bool, total_ms: u64) -> CombinedVerdict {
        let p = AnalyzerOutcome {
            value: lexical::analyze_primary(text),
            latency_ms: 5,
            available: primary_up,
        };
        let s = AnalyzerOutcome::remote(lexical::analyze_secondary(text), 7);
        combine(p, s, total_ms)
    }

    fn entry(post_id: i64, primary_up: bool, total_ms: u64, age_secs: i64) -> AnalysisLogEntry {
        let mut e = AnalysisLogEntry::enhanced(post_id, verdict("some text", primary_up, total_ms));
        e.created_at = Utc::now() - Duration::seconds(age_secs);
        e
    }

    #[tokio::test]
    async fn in_memory_returns_newest_first_for_one_post() {
        let h = InMemoryHistory::with_capacity(10);
        h.append(entry(1, true, 10, 30)).await.unwrap();
        h.append(entry(2, true, 20, 20)).await.unwrap();
        h.append(entry(1, false, 30, 10)).await.unwrap();

        let rows = h.query_by_post_id(1).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_ms, 30);
        assert_eq!(rows[1].total_ms, 10);
        assert!(rows.iter().all(|r| r.kind == ENHANCED_ANALYSIS));
        assert!(h.query_by_post_id(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_drops_oldest_past_capacity() {
        let h = InMemoryHistory::with_capacity(2);
        for ms in [1, 2, 3] {
            h.append(entry(7, true, ms, 0)).await.unwrap();
        }
        assert_eq!(h.len(), 2);
        let kept: Vec<u64> = h
            .query_by_post_id(7)
            .await
            .unwrap()
            .iter()
            .map(|e| e.total_ms)
            .collect();
        assert!(!kept.contains(&1));
    }

    #[tokio::test]
    async fn stats_split_remote_and_fallback_runs() {
        let h = InMemoryHistory::with_capacity(10);
        assert_eq!(h.stats().await.unwrap(), AnalysisStats::default());

        h.append(entry(1, true, 10, 0)).await.unwrap();
        h.append(entry(1, false, 20, 0)).await.unwrap();
        h.append(entry(2, false, 31, 0)).await.unwrap();

        let s = h.stats().await.unwrap();
        assert_eq!(s.total_analyses, 3);
        assert_eq!(s.remote_analyses, 1);
        assert_eq!(s.fallback_analyses, 2);
        assert_eq!(s.average_processing_time_ms, 20);
    }

    #[tokio::test]
    async fn jsonl_round_trips_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/analysis.jsonl");
        let h = JsonlHistory::new(&path);

        assert!(h.query_by_post_id(1).await.unwrap().is_empty());

        h.append(entry(1, true, 11, 20)).await.unwrap();
        h.append(entry(1, false, 22, 10)).await.unwrap();

        let mut f = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        f.write_all(b"{not json}\n").await.unwrap();
        drop(f);

        let rows = h.query_by_post_id(1).await.unwrap();
        assert_eq!(rows.iter().map(|e| e.total_ms).collect::<Vec<_>>(), vec![22, 11]);
        assert_eq!(h.stats().await.unwrap().total_analyses, 2);
    }
}
