//! Classifier capability error types.

use std::sync::Arc;

/// Errors from a classifier call.
///
/// None of these ever reach the caller of the collection layer; they only
/// select a fail-safe default.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    /// The call exceeded its deadline.
    #[error("classifier timeout")]
    Timeout,

    /// No endpoint configured.
    #[error("classifier not configured: {0}")]
    NotConfigured(String),

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Any other failure reported by the classifier.
    #[error("classifier failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ClassifierError::Timeout } else { ClassifierError::Network(Arc::new(err)) }
    }
}

impl From<ClassifierError> for scout_core::Error {
    fn from(err: ClassifierError) -> Self {
        scout_core::Error::ClassifierFailure(err.to_string())
    }
}
