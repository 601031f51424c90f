//! Routing, escalation and aggregation for scout.
//!
//! This crate provides:
//! - [`SourceRouter`]: which backends to consult for a query
//! - [`EscalationOrchestrator`]: which discovered items deserve a deep fetch
//! - [`ResultAggregator`]: dedup and ranking into a [`ResultBundle`]
//! - [`Collector`]: the `route_and_collect` entrypoint tying them together

pub mod aggregate;
pub mod cancel;
pub mod collector;
pub mod escalation;
pub mod router;

pub use aggregate::{RankedItem, ResultAggregator, ResultBundle};
pub use cancel::CancelSignal;
pub use collector::Collector;
pub use escalation::{EscalationOrchestrator, EscalationOutcome, EscalationReport, EscalationSettings, EscalationStatus};
pub use router::{FALLBACK_SOURCES, SourceDecision, SourceRouter};
