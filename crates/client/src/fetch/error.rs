//! Fetch capability error types.

use std::sync::Arc;

/// Per-item deep fetch failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Item URL could not be used.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timeout.
    #[error("fetch timeout")]
    Timeout,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Response body exceeded the byte limit.
    #[error("response too large: {0} bytes")]
    TooLarge(usize),

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Any other failure reported by the fetcher.
    #[error("fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::HttpError { status } => *status == 429 || *status >= 500,
            FetchError::InvalidUrl(_) | FetchError::TooLarge(_) | FetchError::Failed(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(Arc::new(err)) }
    }
}

impl From<FetchError> for scout_core::Error {
    fn from(err: FetchError) -> Self {
        scout_core::Error::FetchFailure(err.to_string())
    }
}
