//! Result aggregation.
//!
//! Merges the items collected from every backend into one deduplicated,
//! ranked bundle. Records sharing a content hash collapse to the one from the
//! highest-priority backend, as declared by the caller.

pub mod score;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use scout_core::{AppConfig, Backend, Error, Freshness, Item};

use crate::escalation::EscalationOutcome;

/// An item in a bundle with its provenance and score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: Item,
    /// Backend whose record won deduplication.
    pub backend: Backend,
    pub score: f64,
}

/// Terminal, request-scoped output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub query: String,
    pub sources_used: Vec<Backend>,
    pub freshness: Freshness,
    pub items: Vec<RankedItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<EscalationOutcome>,
    /// Set when the request was cancelled before collection finished.
    #[serde(default)]
    pub partial: bool,
    pub timestamp: DateTime<Utc>,
}

impl ResultBundle {
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            sources_used: Vec::new(),
            freshness: Freshness::None,
            items: Vec::new(),
            outcomes: Vec::new(),
            partial: false,
            timestamp: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Plain items in rank order.
    pub fn plain_items(&self) -> Vec<Item> {
        self.items.iter().map(|r| r.item.clone()).collect()
    }
}

/// Merge, dedup and rank collected items.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    priority: Vec<Backend>,
    max_results: Option<usize>,
}

struct Candidate {
    item: Item,
    backend: Backend,
    first_seen: usize,
}

impl ResultAggregator {
    /// Build an aggregator with the caller's backend priority, highest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the priority order is empty.
    pub fn new(priority: Vec<Backend>) -> Result<Self, Error> {
        if priority.is_empty() {
            return Err(Error::Configuration("backend priority order must not be empty".into()));
        }
        Ok(Self { priority, max_results: None })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self::new(config.backend_priority.clone())?.with_max_results(config.max_results))
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn priority(&self) -> &[Backend] {
        &self.priority
    }

    /// Lower is better. Unlisted backends rank below every listed one.
    fn rank_of(&self, backend: Backend) -> usize {
        self.priority.iter().position(|b| *b == backend).unwrap_or(self.priority.len())
    }

    /// Combine per-backend results for `query`.
    ///
    /// `items_by_backend` holds one entry per backend call that succeeded, in
    /// the order the calls were made; that order defines discovery order.
    pub fn combine(&self, items_by_backend: &[(Backend, Vec<Item>)], query: &str) -> ResultBundle {
        let mut sources_used = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut candidates: Vec<Candidate> = Vec::new();

        for (backend, items) in items_by_backend {
            if !sources_used.contains(backend) {
                sources_used.push(*backend);
            }
            for item in items {
                match index.get(item.content_hash.as_str()) {
                    None => {
                        index.insert(item.content_hash.as_str(), candidates.len());
                        candidates.push(Candidate { item: item.clone(), backend: *backend, first_seen: candidates.len() });
                    }
                    Some(&slot) => {
                        let current = &mut candidates[slot];
                        if self.rank_of(*backend) < self.rank_of(current.backend) {
                            current.item = item.clone();
                            current.backend = *backend;
                        }
                    }
                }
            }
        }

        let query_terms = score::terms(query);
        let mut ranked: Vec<(usize, RankedItem)> = candidates
            .into_iter()
            .map(|c| {
                let score = score::score(&c.item, &query_terms);
                (c.first_seen, RankedItem { item: c.item, backend: c.backend, score })
            })
            .collect();
        ranked.sort_by(|(ia, a), (ib, b)| b.score.total_cmp(&a.score).then(ia.cmp(ib)));

        let mut items: Vec<RankedItem> = ranked.into_iter().map(|(_, r)| r).collect();
        if let Some(max) = self.max_results {
            items.truncate(max);
        }

        let freshness = freshness_of(&items);
        tracing::debug!(query, results = items.len(), ?freshness, sources = ?sources_used, "aggregated results");

        ResultBundle {
            query: query.to_string(),
            sources_used,
            freshness,
            items,
            outcomes: Vec::new(),
            partial: false,
            timestamp: Utc::now(),
        }
    }
}

fn freshness_of(items: &[RankedItem]) -> Freshness {
    let from_cache = items.iter().any(|r| r.backend.is_cache());
    let from_live = items.iter().any(|r| !r.backend.is_cache());
    match (from_live, from_cache) {
        (true, true) => Freshness::Mixed,
        (true, false) => Freshness::Fresh,
        (false, true) => Freshness::Cached,
        (false, false) => Freshness::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Section;

    fn aggregator() -> ResultAggregator {
        ResultAggregator::new(vec![Backend::StructuredApi, Backend::EscalatedFetch, Backend::ShallowFetch]).unwrap()
    }

    fn item(title: &str, hash: &str) -> Item {
        Item::new(title, format!("https://example.com/{hash}"), "", Section::Listing).with_hash(hash)
    }

    #[test]
    fn test_empty_priority_rejected() {
        assert!(matches!(ResultAggregator::new(Vec::new()), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_dedup_keeps_higher_priority_record() {
        let inputs = vec![
            (Backend::ShallowFetch, vec![item("Foo (short)", "x1")]),
            (Backend::StructuredApi, vec![item("Foo", "x1")]),
        ];
        let bundle = aggregator().combine(&inputs, "foo");

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.items[0].item.title, "Foo");
        assert_eq!(bundle.items[0].backend, Backend::StructuredApi);
        assert_eq!(bundle.sources_used, vec![Backend::ShallowFetch, Backend::StructuredApi]);
    }

    #[test]
    fn test_dedup_equal_priority_keeps_first() {
        let inputs = vec![
            (Backend::ShallowFetch, vec![item("First", "x1")]),
            (Backend::ShallowFetch, vec![item("Second", "x1")]),
        ];
        let bundle = aggregator().combine(&inputs, "");
        assert_eq!(bundle.items[0].item.title, "First");
        assert_eq!(bundle.sources_used, vec![Backend::ShallowFetch]);
    }

    #[test]
    fn test_unlisted_backend_loses() {
        let inputs =
            vec![(Backend::Cache, vec![item("Cached", "x1")]), (Backend::ShallowFetch, vec![item("Crawled", "x1")])];
        let bundle = aggregator().combine(&inputs, "");
        assert_eq!(bundle.items[0].backend, Backend::ShallowFetch);
        assert_eq!(bundle.freshness, Freshness::Fresh);
    }

    #[test]
    fn test_ranking_and_stable_ties() {
        let inputs = vec![(
            Backend::StructuredApi,
            vec![
                item("Patch notes", "a"),
                item("Weekly thread", "b"),
                item("Leaderboard season", "c"),
                item("Misc", "d").pinned(true),
            ],
        )];
        let bundle = aggregator().combine(&inputs, "season leaderboard");
        let order: Vec<&str> = bundle.items.iter().map(|r| r.item.content_hash.as_str()).collect();
        assert_eq!(order, vec!["c", "d", "a", "b"]);
        assert_eq!(bundle.items[0].score, 6.0);
        assert_eq!(bundle.items[1].score, 2.0);
    }

    #[test]
    fn test_external_relevance_added() {
        let inputs = vec![(
            Backend::StructuredApi,
            vec![item("One", "a"), item("Two", "b").with_relevance(0.25)],
        )];
        let bundle = aggregator().combine(&inputs, "zzz");
        assert_eq!(bundle.items[0].item.content_hash, "b");
        assert_eq!(bundle.items[0].score, 0.25);
    }

    #[test]
    fn test_freshness_labels() {
        let agg = aggregator();
        assert_eq!(agg.combine(&[], "q").freshness, Freshness::None);
        assert_eq!(agg.combine(&[(Backend::StructuredApi, Vec::new())], "q").freshness, Freshness::None);

        let cached = vec![(Backend::Cache, vec![item("A", "a")])];
        assert_eq!(agg.combine(&cached, "q").freshness, Freshness::Cached);

        let mixed = vec![(Backend::Cache, vec![item("A", "a")]), (Backend::ShallowFetch, vec![item("B", "b")])];
        assert_eq!(agg.combine(&mixed, "q").freshness, Freshness::Mixed);
    }

    #[test]
    fn test_max_results_truncates_after_ranking() {
        let agg = aggregator().with_max_results(1);
        let inputs = vec![(Backend::ShallowFetch, vec![item("Other", "a"), item("Leaderboard", "b")])];
        let bundle = agg.combine(&inputs, "leaderboard");
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.items[0].item.content_hash, "b");
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { max_results: 5, ..Default::default() };
        let agg = ResultAggregator::from_config(&config).unwrap();
        assert_eq!(agg.priority()[0], Backend::StructuredApi);
        assert_eq!(agg.max_results, Some(5));
    }
}
