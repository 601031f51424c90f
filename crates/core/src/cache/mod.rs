//! Content-addressed cache with TTL expiry and LRU eviction.
//!
//! [`ContentCache`] is the single piece of state shared by concurrent
//! requests. It is constructed once at startup and cloned into every
//! component that needs it. Storage sits behind [`CacheStore`]:
//!
//! - [`MemoryStore`] keeps entries in-process
//! - [`SqliteStore`] keeps them in a SQLite database (WAL mode, migrations)
//!
//! Absence is never an error. When the store fails, reads degrade to misses
//! and writes to no-ops; the failure is logged and never reaches the caller.

pub mod entry;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use crate::Error;

pub use entry::CacheEntry;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{CacheStore, UnavailableStore};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, CacheBackendKind};
use crate::model::Section;

/// Existing-data metadata handed to the source router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheSummary {
    /// Unexpired entries under the section's key prefix.
    pub live_entries: usize,
    /// Whether the store answered at all.
    pub available: bool,
}

impl CacheSummary {
    pub fn has_data(&self) -> bool {
        self.available && self.live_entries > 0
    }
}

/// Shared cache service.
#[derive(Clone, Debug)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    namespace: Arc<str>,
    max_size: usize,
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, namespace: &str, max_size: usize) -> Self {
        Self { store, clock, namespace: Arc::from(namespace), max_size }
    }

    /// In-process cache on the wall clock.
    pub fn in_memory(namespace: &str, max_size: usize) -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), namespace, max_size)
    }

    /// Build the cache described by `config`.
    ///
    /// A SQLite database that cannot be opened does not fail startup: the
    /// cache comes up degraded and behaves as always-miss.
    pub async fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let store: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
            CacheBackendKind::Sqlite => match SqliteStore::open(&config.db_path).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(path = %config.db_path.display(), error = %e, "cache database unavailable, running degraded");
                    Arc::new(UnavailableStore::new(e.to_string()))
                }
            },
        };
        tracing::info!(
            backend = ?config.cache_backend,
            namespace = %config.namespace,
            max_size = config.cache_max_size,
            "content cache ready"
        );
        Self::new(store, clock, &config.namespace, config.cache_max_size)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Compose a key of the form `{namespace}:{section}:{hash}`.
    pub fn key(&self, section: Section, hash: &str) -> String {
        format!("{}:{}:{}", self.namespace, section, hash)
    }

    fn section_prefix(&self, section: Section) -> String {
        format!("{}:{}:", self.namespace, section)
    }

    /// Look up a live entry, recording the access.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get(key, self.clock.now()).await {
            Ok(Some(entry)) => {
                tracing::debug!(key, "cache hit");
                Some(entry)
            }
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache get failed, treating as miss");
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry under `key`.
    ///
    /// Returns whether the write was accepted.
    pub async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> bool {
        if self.max_size == 0 {
            return false;
        }
        let entry = CacheEntry::new(key, payload, ttl, self.clock.now());
        match self.store.set(entry, self.max_size).await {
            Ok(evicted) => {
                if let Some(evicted) = evicted {
                    tracing::debug!(key, evicted = %evicted, "cache full, evicted least recently used entry");
                }
                true
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache set failed, dropping write");
                false
            }
        }
    }

    /// Remove an entry. Returns whether one was removed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// True only when the entry is present, unexpired, and at most `max_age` old.
    ///
    /// Does not count as an access for LRU purposes.
    pub async fn is_fresh(&self, key: &str, max_age: Duration) -> bool {
        let now = self.clock.now();
        match self.store.peek(key).await {
            Ok(Some(entry)) => !entry.is_expired(now) && entry.is_within(now, max_age),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache freshness check failed, treating as stale");
                false
            }
        }
    }

    /// Typed read of a JSON payload. Undecodable payloads count as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get(key).await?;
        match serde_json::from_slice(&entry.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "cached payload undecodable, treating as miss");
                None
            }
        }
    }

    /// Typed write of a JSON payload.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_vec(value) {
            Ok(payload) => self.set(key, payload, ttl).await,
            Err(e) => {
                tracing::warn!(key, error = %e, "payload not serializable, dropping write");
                false
            }
        }
    }

    /// Number of stored entries (0 when the store is unavailable).
    pub async fn len(&self) -> usize {
        self.store.len().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cache len failed");
            0
        })
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Existing-data metadata for a section.
    pub async fn summary(&self, section: Section) -> CacheSummary {
        match self.store.count_live_prefix(&self.section_prefix(section), self.clock.now()).await {
            Ok(live_entries) => CacheSummary { live_entries, available: true },
            Err(e) => {
                tracing::warn!(section = %section, error = %e, "cache summary failed");
                CacheSummary { live_entries: 0, available: false }
            }
        }
    }

    /// Remove every expired entry. Returns the number removed.
    pub async fn purge_expired(&self) -> u64 {
        match self.store.purge_expired(self.clock.now()).await {
            Ok(count) => {
                if count > 0 {
                    tracing::debug!(count, "purged expired cache entries");
                }
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache purge failed");
                0
            }
        }
    }

    /// Spawn the optional background sweep.
    ///
    /// Expiry is also enforced lazily on every read, so the sweep only bounds
    /// memory. Abort the returned handle to stop it.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.purge_expired().await;
            }
        })
    }
}
