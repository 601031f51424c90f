//! HTTP deep-fetch adapter.
//!
//! Fetches each item's URL, enforces redirect and byte limits, and stores the
//! page's visible text as the item's full content.

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

use scout_core::model::url::canonicalize;
use scout_core::{AppConfig, Item};

use super::text::{document_title, visible_text};
use super::{FetchError, Fetcher};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "scout/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "scout/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.fetch_timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetcher implementing the deep-fetch capability.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Failed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch_item(&self, item: &Item) -> Result<Item, FetchError> {
        let start = Instant::now();
        let url = canonicalize(&item.url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let mut response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError { status: status.as_u16() });
        }

        if let Some(len) = response.content_length().map(|len| len as usize).filter(|&len| len > self.config.max_bytes) {
            return Err(FetchError::TooLarge(len));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        let raw = String::from_utf8_lossy(&body);
        let is_html = content_type.as_deref().is_none_or(|ct| ct.contains("html"));
        let (content, page_title) =
            if is_html { (visible_text(&raw), document_title(&raw)) } else { (raw.trim().to_string(), None) };

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(url = %url, final_url = %final_url, fetch_ms, bytes = body.len(), "deep fetch complete");

        let mut enriched = item.clone();
        enriched.content = Some(content);
        enriched.metadata.insert("final_url".into(), final_url);
        enriched.metadata.insert("fetch_ms".into(), fetch_ms.to_string());
        enriched.metadata.insert("fetched_at".into(), chrono::Utc::now().to_rfc3339());
        if let Some(content_type) = content_type {
            enriched.metadata.insert("content_type".into(), content_type);
        }
        if let Some(page_title) = page_title {
            enriched.metadata.insert("page_title".into(), page_title);
        }
        Ok(enriched)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, items: &[Item]) -> Vec<Result<Item, FetchError>> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let result = self.fetch_item(item).await;
            if let Err(e) = &result {
                tracing::debug!(url = %item.url, error = %e, "deep fetch failed");
            }
            results.push(result);
        }
        results
    }
}
