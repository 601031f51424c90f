//! Cache entry with expiry and access bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single cached payload.
///
/// Entries are never mutated in place except for `last_accessed` and the
/// access sequence; a refresh replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub last_accessed: DateTime<Utc>,
    /// Monotonic access counter; breaks LRU ties between equal timestamps.
    #[serde(default)]
    pub access_seq: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, payload: Vec<u8>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self { key: key.into(), payload, created_at: now, ttl, last_accessed: now, access_seq: 0 }
    }

    /// Time since creation. A clock that moved backwards yields zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Expired once strictly more than `ttl` has elapsed since creation.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }

    /// Present-and-young check used by `is_fresh`.
    pub fn is_within(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) <= max_age
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.last_accessed = now;
        self.access_seq = seq;
    }

    /// LRU ordering key: oldest access first.
    pub(crate) fn lru_rank(&self) -> (DateTime<Utc>, u64) {
        (self.last_accessed, self.access_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new("k", b"v".to_vec(), Duration::from_secs(60), now);
        assert!(!entry.is_expired(now + chrono::Duration::seconds(59)));
        assert!(!entry.is_expired(now + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(now + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_age_never_negative() {
        let now = Utc::now();
        let entry = CacheEntry::new("k", Vec::new(), Duration::from_secs(1), now);
        assert_eq!(entry.age(now - chrono::Duration::seconds(5)), Duration::ZERO);
    }

    #[test]
    fn test_is_within_max_age() {
        let now = Utc::now();
        let entry = CacheEntry::new("k", Vec::new(), Duration::from_secs(3600), now);
        let later = now + chrono::Duration::seconds(120);
        assert!(entry.is_within(later, Duration::from_secs(120)));
        assert!(!entry.is_within(later, Duration::from_secs(119)));
    }

    #[test]
    fn test_lru_rank_uses_sequence_for_ties() {
        let now = Utc::now();
        let mut a = CacheEntry::new("a", Vec::new(), Duration::from_secs(1), now);
        let mut b = CacheEntry::new("b", Vec::new(), Duration::from_secs(1), now);
        a.touch(now, 1);
        b.touch(now, 2);
        assert!(a.lru_rank() < b.lru_rank());
    }
}
