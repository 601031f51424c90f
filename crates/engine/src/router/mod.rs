//! Source routing.
//!
//! Decides which backends to consult for a query. Two signals are layered:
//! a deterministic keyword heuristic (always evaluated, wins on conflict) and
//! an injected classifier that proposes the backend ordering. Classifier
//! failure of any kind narrows to a fixed fallback and is never surfaced.

pub mod heuristic;
pub mod parse;

pub use heuristic::TermSignal;
pub use parse::{ParsedRouting, parse_routing};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use scout_client::{Classifier, Fields, classify_within};
use scout_core::{AppConfig, Backend, CacheSummary, Error, FreshnessHint, Priority, QueryContext};

/// Backends used whenever the classifier gives nothing usable.
pub const FALLBACK_SOURCES: [Backend; 2] = [Backend::StructuredApi, Backend::ShallowFetch];

/// Ordered backends to consult for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDecision {
    /// Never empty.
    pub sources: Vec<Backend>,
    pub priority: Priority,
    /// Advisory only.
    pub rationale: String,
    /// Whether the fallback list replaced the classifier's proposal.
    #[serde(default)]
    pub used_fallback: bool,
}

impl SourceDecision {
    pub fn fallback(priority: Priority, rationale: impl Into<String>) -> Self {
        Self { sources: FALLBACK_SOURCES.to_vec(), priority, rationale: rationale.into(), used_fallback: true }
    }

    pub fn is_cache_only(&self) -> bool {
        self.sources.iter().all(Backend::is_cache)
    }
}

/// Routing decision engine.
#[derive(Clone)]
pub struct SourceRouter {
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
}

impl std::fmt::Debug for SourceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRouter").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl SourceRouter {
    pub fn new(classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        Self { classifier, timeout }
    }

    pub fn from_config(classifier: Arc<dyn Classifier>, config: &AppConfig) -> Self {
        Self::new(classifier, config.router_timeout())
    }

    /// Decide which backends to query.
    ///
    /// The freshness hint is read from `ctx`. Always returns a non-empty
    /// decision.
    pub async fn decide(&self, query: &str, ctx: &QueryContext, summary: &CacheSummary) -> SourceDecision {
        let terms = TermSignal::scan(query);
        let hint = ctx.freshness_hint;

        let mut fields = Fields::new();
        fields.insert("query".into(), query.to_string());
        fields.insert("section".into(), ctx.section.to_string());
        fields.insert("freshness_hint".into(), hint.as_str().to_string());
        fields.insert("cached_entries".into(), summary.live_entries.to_string());

        let (mut sources, classifier_priority, rationale, mut used_fallback) =
            match classify_within(self.classifier.as_ref(), &fields, self.timeout).await {
                Ok(raw) => {
                    let parsed = parse_routing(&raw);
                    if parsed.sources.is_empty() {
                        tracing::warn!("routing classifier named no known backend, using fallback");
                        (FALLBACK_SOURCES.to_vec(), parsed.priority, parsed.rationale, true)
                    } else {
                        (parsed.sources, parsed.priority, parsed.rationale, false)
                    }
                }
                Err(e) => {
                    let e = Error::from(e);
                    tracing::warn!(error = %e, "routing classifier failed, using fallback");
                    (FALLBACK_SOURCES.to_vec(), None, e.to_string(), true)
                }
            };

        let default_priority = if hint == FreshnessHint::Live { Priority::High } else { Priority::Medium };
        let priority = terms.priority().or(classifier_priority).unwrap_or(default_priority);

        let live_required = terms.recency || hint == FreshnessHint::Live;
        if live_required && sources.iter().all(Backend::is_cache) {
            sources = FALLBACK_SOURCES.to_vec();
            used_fallback = true;
        }

        if !summary.has_data() {
            sources.retain(|b| !b.is_cache());
            if sources.is_empty() {
                sources = FALLBACK_SOURCES.to_vec();
                used_fallback = true;
            }
        }

        let prefers_cache = hint == FreshnessHint::PreferCached || terms.historical;
        if prefers_cache && !live_required && summary.has_data() {
            sources.retain(|b| !b.is_cache());
            sources.insert(0, Backend::Cache);
        }

        let decision = SourceDecision { sources, priority, rationale, used_fallback };
        tracing::debug!(
            sources = ?decision.sources,
            priority = ?decision.priority,
            fallback = decision.used_fallback,
            "routing decision"
        );
        decision
    }
}
