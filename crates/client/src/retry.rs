//! Retry-with-backoff wrapper around the fetch capability.
//!
//! Nothing in the engine retries on its own. Callers that want retries wrap
//! their fetcher in [`Retrying`] at the call site.

use async_trait::async_trait;
use std::time::Duration;

use scout_core::{AppConfig, Item};

use crate::fetch::{FetchError, Fetcher};

/// Explicit retry policy: `delay(attempt) = base_delay * 2^attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1, base_delay: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.retry_max_attempts, config.retry_base_delay())
    }

    /// Delay before the retry that follows `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// A fetcher that re-runs retryable per-item failures under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrying<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> Retrying<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for Retrying<F> {
    async fn fetch(&self, items: &[Item]) -> Vec<Result<Item, FetchError>> {
        let mut results = self.inner.fetch(items).await;

        for attempt in 0..self.policy.max_attempts.saturating_sub(1) {
            let pending: Vec<usize> = results
                .iter()
                .enumerate()
                .filter(|(_, r)| r.as_ref().err().is_some_and(FetchError::is_retryable))
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() {
                break;
            }

            let delay = self.policy.delay(attempt);
            tracing::warn!(attempt = attempt + 1, retrying = pending.len(), delay_ms = delay.as_millis() as u64, "retrying deep fetch");
            tokio::time::sleep(delay).await;

            let batch: Vec<Item> = pending.iter().map(|&i| items[i].clone()).collect();
            let retried = self.inner.fetch(&batch).await;
            for (slot, result) in pending.into_iter().zip(retried) {
                results[slot] = result;
            }
        }

        results
    }
}
