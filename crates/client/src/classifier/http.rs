//! HTTP classifier adapter.
//!
//! POSTs the fields as a JSON object to a configured endpoint and returns the
//! response body verbatim as the classifier's raw text.

use async_trait::async_trait;
use reqwest::header;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_core::{AppConfig, ConfigError};

use super::{Classifier, ClassifierError, Fields};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "scout/0.1";

/// HTTP classifier configuration.
#[derive(Debug, Clone)]
pub struct HttpClassifierConfig {
    /// Endpoint receiving `{"fields": {...}}`.
    pub endpoint: String,
    /// Request timeout (default: 5s).
    pub timeout: Duration,
    /// User-agent string (default: scout/0.x).
    pub user_agent: String,
}

impl Default for HttpClassifierConfig {
    fn default() -> Self {
        Self { endpoint: String::new(), timeout: DEFAULT_TIMEOUT, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

impl HttpClassifierConfig {
    /// Derive from the application config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no classifier URL is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: config.require_classifier_url()?.to_string(),
            timeout: config.classifier_timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    fields: &'a Fields,
}

/// Classifier reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http: reqwest::Client,
    config: HttpClassifierConfig,
}

impl HttpClassifier {
    /// Create a new classifier client with the given configuration.
    pub fn new(config: HttpClassifierConfig) -> Result<Self, ClassifierError> {
        if config.endpoint.is_empty() {
            return Err(ClassifierError::NotConfigured("empty endpoint".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClassifierError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpClassifierConfig {
        &self.config
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, fields: &Fields) -> Result<String, ClassifierError> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.config.endpoint)
            .header(header::ACCEPT, "text/plain, application/json")
            .json(&ClassifyRequest { fields })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::HttpError { status: status.as_u16() });
        }

        let text = response.text().await?;
        tracing::debug!(elapsed = ?start.elapsed(), bytes = text.len(), "classifier responded");
        Ok(text)
    }
}
