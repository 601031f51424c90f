//! Capability adapters for scout.
//!
//! This crate defines the three injected capabilities the engine depends on
//! ([`Classifier`], [`Fetcher`], [`Source`]), the explicit [`RetryPolicy`]
//! wrapper, and HTTP reference adapters for each of them.

pub mod classifier;
pub mod fetch;
pub mod retry;
pub mod source;

pub use classifier::{Classifier, ClassifierError, Fields, HttpClassifier, HttpClassifierConfig, classify_within};
pub use fetch::{FetchConfig, FetchError, Fetcher, HttpFetcher, fetch_one_within, visible_text};
pub use retry::{RetryPolicy, Retrying};
pub use source::{ApiSource, ApiSourceConfig, Source, SourceError, query_within};
