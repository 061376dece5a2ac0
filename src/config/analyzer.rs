// src/config/analyzer.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";

const ENV_PRIMARY_URL: &str = "PRIMARY_ANALYZER_URL";
const ENV_SECONDARY_URL: &str = "SECONDARY_ANALYZER_URL";
const ENV_PRIMARY_TIMEOUT: &str = "PRIMARY_TIMEOUT_MS";
const ENV_SECONDARY_TIMEOUT: &str = "SECONDARY_TIMEOUT_MS";
const ENV_MAX_RETRIES: &str = "ANALYZER_MAX_RETRIES";
const ENV_LOG_PATH: &str = "ANALYSIS_LOG_PATH";

fn default_primary_endpoint() -> String {
    "http://localhost:8000".to_string()
}
fn default_secondary_endpoint() -> String {
    "http://localhost:8001".to_string()
}
fn default_primary_timeout_ms() -> u64 {
    10_000
}
fn default_secondary_timeout_ms() -> u64 {
    5_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    200
}
fn default_retry_max_delay_ms() -> u64 {
    2_000
}
fn default_log_capacity() -> usize {
    10_000
}

/// Endpoints, deadlines and retry budget, fixed at orchestrator construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_primary_endpoint")]
    pub primary_endpoint: String,
    #[serde(default = "default_secondary_endpoint")]
    pub secondary_endpoint: String,
    #[serde(default = "default_primary_timeout_ms")]
    pub primary_timeout_ms: u64,
    #[serde(default = "default_secondary_timeout_ms")]
    pub secondary_timeout_ms: u64,
    /// Total primary attempts, first one included. Secondary never retries.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// JSON-lines analysis log; in-memory store when absent.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            primary_endpoint: default_primary_endpoint(),
            secondary_endpoint: default_secondary_endpoint(),
            primary_timeout_ms: default_primary_timeout_ms(),
            secondary_timeout_ms: default_secondary_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            log_path: None,
            log_capacity: default_log_capacity(),
        }
    }
}

impl AnalyzerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading analyzer config from {}", path.display()))?;
        let cfg: AnalyzerConfig = toml::from_str(&data)
            .with_context(|| format!("parsing analyzer config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Config resolution:
    /// 1) $ANALYZER_CONFIG_PATH (must exist)
    /// 2) config/analyzer.toml if present
    /// 3) built-in defaults
    ///
    /// then environment overrides, then sanitization.
    pub fn load() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            Self::load_from_file(PathBuf::from(p))?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides()?.sanitized())
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_nonempty(ENV_PRIMARY_URL) {
            self.primary_endpoint = v;
        }
        if let Some(v) = env_nonempty(ENV_SECONDARY_URL) {
            self.secondary_endpoint = v;
        }
        if let Some(v) = env_nonempty(ENV_PRIMARY_TIMEOUT) {
            self.primary_timeout_ms = v
                .parse()
                .with_context(|| format!("{ENV_PRIMARY_TIMEOUT} must be an integer, got {v:?}"))?;
        }
        if let Some(v) = env_nonempty(ENV_SECONDARY_TIMEOUT) {
            self.secondary_timeout_ms = v
                .parse()
                .with_context(|| format!("{ENV_SECONDARY_TIMEOUT} must be an integer, got {v:?}"))?;
        }
        if let Some(v) = env_nonempty(ENV_MAX_RETRIES) {
            self.max_retries = v
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES} must be an integer, got {v:?}"))?;
        }
        if let Some(v) = env_nonempty(ENV_LOG_PATH) {
            self.log_path = Some(PathBuf::from(v));
        }
        Ok(self)
    }

    /// Zero deadlines/budgets fall back to defaults; the backoff cap is never
    /// below the base delay.
    pub fn sanitized(mut self) -> Self {
        if self.primary_timeout_ms == 0 {
            self.primary_timeout_ms = default_primary_timeout_ms();
        }
        if self.secondary_timeout_ms == 0 {
            self.secondary_timeout_ms = default_secondary_timeout_ms();
        }
        if self.max_retries == 0 {
            self.max_retries = default_max_retries();
        }
        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            self.retry_max_delay_ms = self.retry_base_delay_ms;
        }
        if self.log_capacity == 0 {
            self.log_capacity = default_log_capacity();
        }
        self.primary_endpoint = self.primary_endpoint.trim().trim_end_matches('/').to_string();
        self.secondary_endpoint = self.secondary_endpoint.trim().trim_end_matches('/').to_string();
        self
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
