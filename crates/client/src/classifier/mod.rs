//! Classifier capability.
//!
//! The classifier is an external judgment call that receives a flat map of
//! string fields and answers with unstructured text. The only contract is
//! "a string comes back, or an error/timeout happens"; every consumer parses
//! the text defensively.

pub mod error;
pub mod http;

pub use error::ClassifierError;
pub use http::{HttpClassifier, HttpClassifierConfig};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Named inputs for a classifier call (query, section, title, has_media, ...).
pub type Fields = BTreeMap<String, String>;

/// External judgment capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, fields: &Fields) -> Result<String, ClassifierError>;
}

/// Run a classifier call under a deadline, mapping expiry to `Timeout`.
pub async fn classify_within(
    classifier: &dyn Classifier, fields: &Fields, timeout: Duration,
) -> Result<String, ClassifierError> {
    match tokio::time::timeout(timeout, classifier.classify(fields)).await {
        Ok(result) => result,
        Err(_) => Err(ClassifierError::Timeout),
    }
}
