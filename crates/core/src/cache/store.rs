//! Storage backend seam for the content cache.
//!
//! Implementations only have to make each call atomic; expiry policy,
//! degradation and logging live in [`ContentCache`](super::ContentCache).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entry::CacheEntry;
use crate::Error;

/// Key/value storage with LRU bookkeeping.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Fetch a live entry and record the access.
    ///
    /// An entry that is expired at `now` is removed and reported absent.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>, Error>;

    /// Fetch an entry without touching its access time.
    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>, Error>;

    /// Insert or replace an entry.
    ///
    /// When the key is new and the store already holds `max_size` entries, the
    /// least recently accessed entry is evicted first. Returns the evicted key.
    async fn set(&self, entry: CacheEntry, max_size: usize) -> Result<Option<String>, Error>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, Error>;

    /// Remove every entry expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;

    /// Number of stored entries, expired or not.
    async fn len(&self) -> Result<usize, Error>;

    /// Number of unexpired entries whose key starts with `prefix`.
    async fn count_live_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<usize, Error>;
}

/// Store used when the configured backend could not be reached at startup.
///
/// Every call fails with [`Error::CacheUnavailable`], which the content cache
/// turns into misses and no-op writes.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn err(&self) -> Error {
        Error::CacheUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &str, _now: DateTime<Utc>) -> Result<Option<CacheEntry>, Error> {
        Err(self.err())
    }

    async fn peek(&self, _key: &str) -> Result<Option<CacheEntry>, Error> {
        Err(self.err())
    }

    async fn set(&self, _entry: CacheEntry, _max_size: usize) -> Result<Option<String>, Error> {
        Err(self.err())
    }

    async fn delete(&self, _key: &str) -> Result<bool, Error> {
        Err(self.err())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, Error> {
        Err(self.err())
    }

    async fn len(&self) -> Result<usize, Error> {
        Err(self.err())
    }

    async fn count_live_prefix(&self, _prefix: &str, _now: DateTime<Utc>) -> Result<usize, Error> {
        Err(self.err())
    }
}
