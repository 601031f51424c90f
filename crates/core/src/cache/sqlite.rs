//! SQLite-backed cache storage.
//!
//! This is the externalized form of the cache backend (`GET`/`SET`/`DEL` by
//! key). The database is opened in WAL mode and every operation runs inside a
//! single tokio-rusqlite call, so read-modify-write sequences such as
//! touch-on-get and evict-then-insert are atomic with respect to each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::{Connection, params};

use super::entry::CacheEntry;
use super::migrations;
use super::store::CacheStore;
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

const SELECT_ENTRY: &str =
    "SELECT key, payload, created_at_ms, ttl_ms, last_accessed_ms, access_seq FROM cache_entries WHERE key = ?1";

/// Cache store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

/// Row shape before timestamp conversion.
struct RawEntry {
    key: String,
    payload: Vec<u8>,
    created_at_ms: i64,
    ttl_ms: i64,
    last_accessed_ms: i64,
    access_seq: i64,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            payload: row.get(1)?,
            created_at_ms: row.get(2)?,
            ttl_ms: row.get(3)?,
            last_accessed_ms: row.get(4)?,
            access_seq: row.get(5)?,
        })
    }

    fn into_entry(self) -> Result<CacheEntry, Error> {
        Ok(CacheEntry {
            key: self.key,
            payload: self.payload,
            created_at: from_millis(self.created_at_ms)?,
            ttl: Duration::from_millis(self.ttl_ms.max(0) as u64),
            last_accessed: from_millis(self.last_accessed_ms)?,
            access_seq: self.access_seq.max(0) as u64,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| Error::CacheUnavailable(format!("invalid timestamp: {ms}")))
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

/// Served from `idx_cache_entries_access_seq`, not a table scan.
fn next_seq(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(access_seq) FROM cache_entries", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) + 1)
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let tx = conn.transaction()?;
                let raw = tx.query_row(SELECT_ENTRY, params![key], RawEntry::from_row).optional()?;
                let Some(raw) = raw else {
                    return Ok(None);
                };

                let mut entry = raw.into_entry()?;
                if entry.is_expired(now) {
                    tx.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                    tx.commit()?;
                    return Ok(None);
                }

                let seq = next_seq(&tx)?;
                tx.execute(
                    "UPDATE cache_entries SET last_accessed_ms = ?1, access_seq = ?2 WHERE key = ?3",
                    params![now.timestamp_millis(), seq, key],
                )?;
                tx.commit()?;

                entry.touch(now, seq as u64);
                Ok(Some(entry))
            })
            .await
            .map_err(Error::from)
    }

    async fn peek(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let raw = conn.query_row(SELECT_ENTRY, params![key], RawEntry::from_row).optional()?;
                raw.map(RawEntry::into_entry).transpose()
            })
            .await
            .map_err(Error::from)
    }

    async fn set(&self, entry: CacheEntry, max_size: usize) -> Result<Option<String>, Error> {
        let max = i64::try_from(max_size).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let tx = conn.transaction()?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_entries WHERE key = ?1)",
                    params![entry.key],
                    |row| row.get(0),
                )?;

                let mut evicted = None;
                if !exists {
                    let count: i64 = tx.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                    if count >= max {
                        evicted = tx
                            .query_row(
                                "SELECT key FROM cache_entries ORDER BY last_accessed_ms ASC, access_seq ASC LIMIT 1",
                                [],
                                |row| row.get::<_, String>(0),
                            )
                            .optional()?;
                        if let Some(victim) = &evicted {
                            tx.execute("DELETE FROM cache_entries WHERE key = ?1", params![victim])?;
                        }
                    }
                }

                let seq = next_seq(&tx)?;
                tx.execute(
                    "INSERT INTO cache_entries (key, payload, created_at_ms, ttl_ms, last_accessed_ms, access_seq)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(key) DO UPDATE SET
                        payload = excluded.payload,
                        created_at_ms = excluded.created_at_ms,
                        ttl_ms = excluded.ttl_ms,
                        last_accessed_ms = excluded.last_accessed_ms,
                        access_seq = excluded.access_seq",
                    params![
                        entry.key,
                        entry.payload,
                        entry.created_at.timestamp_millis(),
                        ttl_millis(entry.ttl),
                        entry.last_accessed.timestamp_millis(),
                        seq,
                    ],
                )?;
                tx.commit()?;
                Ok(evicted)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let now_ms = now.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE created_at_ms + ttl_ms < ?1", params![now_ms])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn len(&self) -> Result<usize, Error> {
        self.conn
            .call(|conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count.max(0) as usize)
            })
            .await
            .map_err(Error::from)
    }

    async fn count_live_prefix(&self, prefix: &str, now: DateTime<Utc>) -> Result<usize, Error> {
        let prefix = prefix.to_string();
        let now_ms = now.timestamp_millis();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries
                    WHERE substr(key, 1, length(?1)) = ?1
                    AND created_at_ms + ttl_ms >= ?2",
                    params![prefix, now_ms],
                    |row| row.get(0),
                )?;
                Ok(count.max(0) as usize)
            })
            .await
            .map_err(Error::from)
    }
}
