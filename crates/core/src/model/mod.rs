//! Data model shared by the cache, router, orchestrator and aggregator.

pub mod context;
pub mod item;
pub mod kinds;
pub mod url;

pub use context::QueryContext;
pub use item::Item;
pub use kinds::{Backend, Freshness, FreshnessHint, Priority, Section};
