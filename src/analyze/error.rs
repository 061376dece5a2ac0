//! Error taxonomy of the analysis pipeline.

use std::error::Error as StdError;

use thiserror::Error;

/// The only error an orchestrator caller can see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Why a single remote attempt failed. Every variant collapses to the same
/// `available = false` outcome; the class only feeds diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CallError {
    /// Stable label for metrics and structured logs.
    pub fn cause(&self) -> &'static str {
        match self {
            CallError::ConnectionRefused(_) => "connection_refused",
            CallError::Timeout => "timeout",
            CallError::HttpStatus(_) => "http_status",
            CallError::Transport(_) => "transport",
            CallError::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CallError::Timeout
        } else if e.is_connect() && refused_by_peer(&e) {
            CallError::ConnectionRefused(e.to_string())
        } else if let Some(status) = e.status() {
            CallError::HttpStatus(status.as_u16())
        } else if e.is_decode() {
            CallError::Malformed(e.to_string())
        } else {
            CallError::Transport(e.to_string())
        }
    }
}

/// True when an `io::Error` with `ConnectionRefused` sits anywhere in the
/// source chain. DNS, TLS and unreachable-host failures are not refusals.
fn refused_by_peer(err: &(dyn StdError + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        cur = e.source();
    }
    false
}

/// Rejects text that is empty after trimming.
pub fn ensure_text(text: &str) -> Result<(), AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::InvalidInput("text is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    #[test]
    fn blank_text_is_invalid() {
        assert!(ensure_text("").is_err());
        assert!(ensure_text(" \n\t ").is_err());
        assert!(ensure_text(" x ").is_ok());
    }

    #[test]
    fn causes_are_distinct() {
        let all = [
            CallError::ConnectionRefused("x".into()),
            CallError::Timeout,
            CallError::HttpStatus(503),
            CallError::Transport("x".into()),
            CallError::Malformed("x".into()),
        ];
        let causes: HashSet<_> = all.iter().map(CallError::cause).collect();
        assert_eq!(causes.len(), all.len());
    }

    #[derive(Debug, Error)]
    #[error("connect failed")]
    struct ConnectFailed(#[source] std::io::Error);

    #[test]
    fn only_refusals_deep_in_the_chain_count_as_refused() {
        let refused = ConnectFailed(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(refused_by_peer(&refused));

        let dns = ConnectFailed(io::Error::new(io::ErrorKind::Other, "dns error: no such host"));
        assert!(!refused_by_peer(&dns));

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(!refused_by_peer(&reset));
    }
}
