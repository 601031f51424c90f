//! Live backend source error types.

use std::sync::Arc;

/// Errors from a live backend source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// Query rejected before it was sent.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Authentication failed.
    #[error("authentication failed")]
    AuthError,

    /// Rate limited by the backend.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Any other failure reported by the source.
    #[error("source failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SourceError::Timeout } else { SourceError::Network(Arc::new(err)) }
    }
}

impl From<SourceError> for scout_core::Error {
    fn from(err: SourceError) -> Self {
        scout_core::Error::SourceFailure(err.to_string())
    }
}
