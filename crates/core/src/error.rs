//! Unified error types for scout.
//!
//! Only [`Error::Configuration`] is allowed to escape the top-level collection
//! entrypoint. Every other variant is absorbed into graceful degradation by the
//! component that observes it.

use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Unified error types for the scout workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache backend unreachable or misbehaving.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// Database operation failed.
    #[error("CACHE_UNAVAILABLE: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Cached payload could not be encoded or decoded.
    #[error("CACHE_UNAVAILABLE: payload codec: {0}")]
    Payload(String),

    /// Classifier timed out or errored.
    #[error("CLASSIFIER_FAILURE: {0}")]
    ClassifierFailure(String),

    /// Deep fetch of a single item failed.
    #[error("FETCH_FAILURE: {0}")]
    FetchFailure(String),

    /// A live backend source failed.
    #[error("SOURCE_FAILURE: {0}")]
    SourceFailure(String),

    /// Startup configuration is unusable.
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether this error must escape the collection entrypoint.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Payload(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheUnavailable("connection closed".to_string());
        assert!(err.to_string().starts_with("CACHE_UNAVAILABLE"));
        assert!(err.to_string().contains("connection closed"));
    }

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(Error::Configuration("no sources".into()).is_fatal());
        assert!(!Error::ClassifierFailure("timeout".into()).is_fatal());
        assert!(!Error::FetchFailure("404".into()).is_fatal());
        assert!(!Error::CacheUnavailable("down".into()).is_fatal());
    }

    #[test]
    fn test_config_error_converts_to_configuration() {
        let err: Error = ConfigError::Invalid { field: "namespace".into(), reason: "must not be empty".into() }.into();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("namespace"));
    }
}
