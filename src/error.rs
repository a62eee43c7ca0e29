// src/error.rs
use thiserror::Error;

/// Failures raised while collecting items for a source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectError {
    /// Timeouts, temporary load failures. Retried by the collector policy.
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Handle not found, private or deleted. Never retried.
    #[error("source unavailable: {0}")]
    Permanent(String),

    /// The platform session could not be opened at all.
    #[error("session error: {0}")]
    Session(String),
}

impl From<reqwest::Error> for CollectError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            CollectError::Transient(err.to_string())
        } else {
            CollectError::Session(err.to_string())
        }
    }
}

/// Failures raised by the enricher. The item is dropped for this cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichError {
    #[error("no text content to analyze")]
    NoContent,

    #[error("empty response")]
    EmptyResponse,

    #[error("unparseable response")]
    Unparseable,

    #[error("analyzer failed: {0}")]
    Analyzer(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid record id: {0}")]
    InvalidId(String),

    #[error("record store io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CycleError {
    /// Another cycle holds the lock; the trigger is rejected.
    #[error("a check cycle is already running")]
    Busy,

    #[error("check cycle aborted: {0}")]
    Aborted(#[from] anyhow::Error),
}
