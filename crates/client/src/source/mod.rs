//! Live backend sources.
//!
//! A source answers a query with list-style discovery results. The collector
//! queries the sources chosen by the router, one after another, each under
//! its own deadline.

pub mod error;
pub mod http;

pub use error::SourceError;
pub use http::{ApiSource, ApiSourceConfig};

use async_trait::async_trait;
use std::time::Duration;

use scout_core::{Backend, Item, QueryContext};

/// A live backend that can be queried for items.
#[async_trait]
pub trait Source: Send + Sync {
    /// Backend this source answers for.
    fn backend(&self) -> Backend;

    async fn query(&self, query: &str, ctx: &QueryContext) -> Result<Vec<Item>, SourceError>;
}

/// Run a source query under a deadline, mapping expiry to `Timeout`.
pub async fn query_within(
    source: &dyn Source, query: &str, ctx: &QueryContext, timeout: Duration,
) -> Result<Vec<Item>, SourceError> {
    match tokio::time::timeout(timeout, source.query(query, ctx)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Section;

    struct Stalled;

    #[async_trait]
    impl Source for Stalled {
        fn backend(&self) -> Backend {
            Backend::ShallowFetch
        }

        async fn query(&self, _query: &str, _ctx: &QueryContext) -> Result<Vec<Item>, SourceError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(Vec::new())
        }
    }

    struct Fixed;

    #[async_trait]
    impl Source for Fixed {
        fn backend(&self) -> Backend {
            Backend::StructuredApi
        }

        async fn query(&self, query: &str, ctx: &QueryContext) -> Result<Vec<Item>, SourceError> {
            Ok(vec![Item::new(query, "https://example.com/a", "", ctx.section)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_within_times_out() {
        let ctx = QueryContext::new(Section::Overview);
        let result = query_within(&Stalled, "q", &ctx, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SourceError::Timeout)));
    }

    #[tokio::test]
    async fn test_query_within_passes_result() {
        let ctx = QueryContext::new(Section::Discussion);
        let items = query_within(&Fixed, "hello", &ctx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].section, Section::Discussion);
    }
}
