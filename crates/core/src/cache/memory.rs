//! In-process cache storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::entry::CacheEntry;
use super::store::CacheStore;
use crate::Error;

/// HashMap-backed store with an ordered LRU index.
///
/// A single mutex guards the map, the index and the access counter so that
/// access bookkeeping, size accounting and eviction happen atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    lru: BTreeMap<(DateTime<Utc>, u64), String>,
    next_seq: u64,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(&entry.lru_rank());
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<String> {
        let (_, key) = self.lru.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>, Error> {
        let mut inner = self.inner.lock().await;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return Ok(None),
        };
        if expired {
            inner.remove(key);
            return Ok(None);
        }

        let seq = inner.next_seq();
        let Some(mut entry) = inner.remove(key) else {
            return Ok(None);
        };
        entry.touch(now, seq);
        inner.lru.insert(entry.lru_rank(), key.to_string());
        inner.entries.insert(key.to_string(), entry.clone());
        Ok(Some(entry))
    }

    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        Ok(self.inner.lock().await.entries.get(key).cloned())
    }

    async fn set(&self, mut entry: CacheEntry, max_size: usize) -> Result<Option<String>, Error> {
        let mut inner = self.inner.lock().await;

        let mut evicted = None;
        if inner.remove(&entry.key).is_none() && inner.entries.len() >= max_size {
            evicted = inner.evict_lru();
        }

        entry.access_seq = inner.next_seq();
        inner.lru.insert(entry.lru_rank(), entry.key.clone());
        inner.entries.insert(entry.key.clone(), entry);
        Ok(evicted)
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.inner.lock().await.remove(key).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<String> = inner
            .entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        Ok(expired.len() as u64)
    }

    async fn len(&self) -> Result<usize, Error> {
        Ok(self.inner.lock().await.entries.len())
    }

    async fn count_live_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<usize, Error> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .values()
            .filter(|e| e.key.starts_with(prefix) && !e.is_expired(now))
            .count())
    }
}
