//! JSON-over-HTTP source adapter.
//!
//! Queries a backend that answers `GET {base_url}?q=..&section=..` with
//! `{"items": [{"title", "url", "snippet", "pinned", "has_media", "relevance"}]}`
//! and normalizes the records into [`Item`]s. Requests are spaced by a minimum
//! interval so a rate-limited platform API is not hammered.

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use scout_core::{AppConfig, Backend, Item, QueryContext, Section};

use super::{Source, SourceError};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum interval between requests.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for an [`ApiSource`].
#[derive(Debug, Clone)]
pub struct ApiSourceConfig {
    pub base_url: String,
    /// Backend the source reports as (default: `STRUCTURED_API`).
    pub backend: Backend,
    /// Optional bearer token.
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub min_interval: Duration,
}

impl Default for ApiSourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            backend: Backend::StructuredApi,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: "scout/0.1".to_string(),
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl ApiSourceConfig {
    pub fn new(base_url: impl Into<String>, backend: Backend) -> Self {
        Self { base_url: base_url.into(), backend, ..Default::default() }
    }

    /// Take timeout and user agent from the application config.
    pub fn with_app_config(mut self, config: &AppConfig) -> Self {
        self.timeout = config.source_timeout();
        self.user_agent = config.user_agent.clone();
        self
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<tokio::time::Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(tokio::time::Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiRecord>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    title: String,
    url: String,
    #[serde(default, alias = "description")]
    snippet: String,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    has_media: bool,
    #[serde(default)]
    relevance: Option<f64>,
}

impl ApiRecord {
    fn into_item(self, section: Section, backend: Backend, rank: usize) -> Item {
        let mut item = Item::new(self.title, self.url, self.snippet, section)
            .pinned(self.pinned)
            .with_media(self.has_media)
            .with_metadata("source", backend.as_str())
            .with_metadata("rank", rank.to_string());
        item.relevance = self.relevance;
        item
    }
}

/// Live backend reached over HTTP with a JSON response.
#[derive(Debug, Clone)]
pub struct ApiSource {
    http: reqwest::Client,
    config: ApiSourceConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl ApiSource {
    pub fn new(config: ApiSourceConfig) -> Result<Self, SourceError> {
        if config.base_url.is_empty() {
            return Err(SourceError::InvalidQuery("base_url must not be empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| SourceError::Network(Arc::new(e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_interval));
        Ok(Self { http, config, rate_limiter })
    }

    pub fn config(&self) -> &ApiSourceConfig {
        &self.config
    }

    fn normalize(&self, body: &[u8], section: Section) -> Result<Vec<Item>, SourceError> {
        let raw: ApiResponse = serde_json::from_slice(body).map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(raw
            .items
            .into_iter()
            .enumerate()
            .map(|(idx, r)| r.into_item(section, self.config.backend, idx + 1))
            .collect())
    }
}

#[async_trait]
impl Source for ApiSource {
    fn backend(&self) -> Backend {
        self.config.backend
    }

    async fn query(&self, query: &str, ctx: &QueryContext) -> Result<Vec<Item>, SourceError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(SourceError::InvalidQuery("query must not be empty".into()));
        }

        self.rate_limiter.acquire().await;
        let start = Instant::now();

        let mut request = self
            .http
            .get(&self.config.base_url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&[("q", q), ("section", ctx.section.as_str())]);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(backend = %self.config.backend, %status, "source response");

        if status == 401 || status == 403 {
            return Err(SourceError::AuthError);
        }
        if status == 429 {
            return Err(SourceError::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(SourceError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        let items = self.normalize(&bytes, ctx.section)?;

        tracing::debug!(backend = %self.config.backend, elapsed = ?start.elapsed(), results = items.len(), "source query completed");
        Ok(items)
    }
}
