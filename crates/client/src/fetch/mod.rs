//! Deep-fetch capability.
//!
//! A fetcher takes discovered items and returns them enriched with their full
//! content. Results are reported per item so one bad page never sinks the
//! rest of a batch.

pub mod error;
pub mod http;
pub mod text;

pub use error::FetchError;
pub use http::{FetchConfig, HttpFetcher};
pub use text::visible_text;

use async_trait::async_trait;
use scout_core::Item;
use std::sync::Arc;
use std::time::Duration;

/// Deeper, more expensive fetch of discovered items.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch every item. The result has exactly one entry per input, in order.
    async fn fetch(&self, items: &[Item]) -> Vec<Result<Item, FetchError>>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, items: &[Item]) -> Vec<Result<Item, FetchError>> {
        (**self).fetch(items).await
    }
}

/// Fetch a single item under a deadline, mapping expiry to `Timeout`.
pub async fn fetch_one_within(fetcher: &dyn Fetcher, item: &Item, timeout: Duration) -> Result<Item, FetchError> {
    let call = fetcher.fetch(std::slice::from_ref(item));
    match tokio::time::timeout(timeout, call).await {
        Ok(mut results) => results
            .pop()
            .unwrap_or_else(|| Err(FetchError::Failed("fetcher returned no result".into()))),
        Err(_) => Err(FetchError::Timeout),
    }
}
