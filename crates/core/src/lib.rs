//! Core types and shared functionality for scout.
//!
//! This crate provides:
//! - The content cache (in-memory and SQLite backends)
//! - The item model and content hashing
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{CacheEntry, CacheSummary, ContentCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, CacheBackendKind, ConfigError};
pub use error::Error;
pub use model::{Backend, Freshness, FreshnessHint, Item, Priority, QueryContext, Section};
