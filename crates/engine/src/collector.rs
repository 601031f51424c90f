//! Top-level collection entrypoint.
//!
//! [`Collector::route_and_collect`] runs one query through the whole
//! pipeline: route, query the chosen backends in order, escalate listing
//! results, aggregate. Every dependency failure degrades into a smaller or
//! emptier bundle; only configuration problems are reported as errors, and
//! those are caught when the collector is built.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use scout_client::{Classifier, Fetcher, RetryPolicy, Retrying, Source, query_within};
use scout_core::cache::hash::query_hash;
use scout_core::{AppConfig, Backend, ContentCache, Error, Freshness, Item, QueryContext};
use tokio::task::JoinHandle;

use crate::aggregate::{RankedItem, ResultAggregator, ResultBundle};
use crate::cancel::CancelSignal;
use crate::escalation::{EscalationOrchestrator, EscalationReport, EscalationSettings};
use crate::router::SourceRouter;

/// One query worker's view of the shared services.
#[derive(Clone)]
pub struct Collector {
    cache: ContentCache,
    router: SourceRouter,
    orchestrator: EscalationOrchestrator,
    aggregator: ResultAggregator,
    sources: HashMap<Backend, Arc<dyn Source>>,
    source_timeout: Duration,
    query_ttl: Duration,
    sweep_interval: Option<Duration>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("cache", &self.cache)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("source_timeout", &self.source_timeout)
            .field("query_ttl", &self.query_ttl)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Wire the pipeline from validated configuration and injected capabilities.
    ///
    /// The fetcher is wrapped in the configured [`RetryPolicy`]. The same
    /// classifier serves both routing and escalation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if:
    /// - `config` fails validation
    /// - no live source is registered
    /// - a source claims the `CACHE` or `ESCALATED_FETCH` backend
    /// - two sources claim the same backend
    pub fn new(
        config: &AppConfig, cache: ContentCache, classifier: Arc<dyn Classifier>, fetcher: Arc<dyn Fetcher>,
        sources: Vec<Arc<dyn Source>>,
    ) -> Result<Self, Error> {
        config.validate()?;

        if sources.is_empty() {
            return Err(Error::Configuration("at least one live source must be registered".into()));
        }
        let mut registry: HashMap<Backend, Arc<dyn Source>> = HashMap::new();
        for source in sources {
            let backend = source.backend();
            if backend.is_cache() || backend == Backend::EscalatedFetch {
                return Err(Error::Configuration(format!("{backend} cannot be served by a live source")));
            }
            if registry.insert(backend, source).is_some() {
                return Err(Error::Configuration(format!("more than one source registered for {backend}")));
            }
        }

        let fetcher: Arc<dyn Fetcher> = Arc::new(Retrying::new(fetcher, RetryPolicy::from_app_config(config)));
        let router = SourceRouter::from_config(Arc::clone(&classifier), config);
        let orchestrator =
            EscalationOrchestrator::new(cache.clone(), classifier, fetcher, EscalationSettings::from_config(config));
        let aggregator = ResultAggregator::from_config(config)?;

        tracing::info!(
            sources = ?registry.keys().collect::<Vec<_>>(),
            priority = ?config.backend_priority,
            "collector ready"
        );

        Ok(Self {
            cache,
            router,
            orchestrator,
            aggregator,
            sources: registry,
            source_timeout: config.source_timeout(),
            query_ttl: config.query_ttl(),
            sweep_interval: config.sweep_interval(),
        })
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Start the configured background expiry sweep, if any.
    pub fn start_sweeper(&self) -> Option<JoinHandle<()>> {
        self.sweep_interval.map(|interval| self.cache.spawn_sweeper(interval))
    }

    /// Answer a query.
    ///
    /// # Errors
    ///
    /// Only `Error::Configuration`; every other failure degrades into the
    /// returned bundle.
    pub async fn route_and_collect(&self, query: &str, ctx: QueryContext) -> Result<ResultBundle, Error> {
        self.route_and_collect_with_cancel(query, ctx, &CancelSignal::new()).await
    }

    /// Answer a query, returning a best-effort partial bundle if `cancel` fires.
    pub async fn route_and_collect_with_cancel(
        &self, query: &str, ctx: QueryContext, cancel: &CancelSignal,
    ) -> Result<ResultBundle, Error> {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("empty query, returning empty bundle");
            let mut bundle = ResultBundle::empty(query);
            bundle.timestamp = self.cache.now();
            return Ok(bundle);
        }

        let query_key = self.cache.key(ctx.section, &query_hash(query));
        let summary = self.cache.summary(ctx.section).await;
        let decision = self.router.decide(query, &ctx, &summary).await;

        let mut partial = false;
        let mut collected: Vec<(Backend, Vec<Item>)> = Vec::new();

        for backend in &decision.sources {
            if cancel.is_cancelled() {
                partial = true;
                break;
            }
            if backend.is_cache() {
                match self.cache.get_json::<Vec<Item>>(&query_key).await {
                    Some(items) => collected.push((Backend::Cache, items)),
                    None => tracing::debug!(query, "no cached results for query"),
                }
                continue;
            }

            let Some(source) = self.sources.get(backend) else {
                tracing::warn!(%backend, "no source registered for routed backend");
                continue;
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    partial = true;
                    break;
                }
                result = query_within(source.as_ref(), query, &ctx, self.source_timeout) => result,
            };
            match result {
                Ok(items) => {
                    tracing::debug!(%backend, results = items.len(), "source answered");
                    collected.push((*backend, items));
                }
                Err(e) => tracing::warn!(%backend, error = %Error::from(e), "source failed, omitting"),
            }
        }

        let discovered: Vec<Item> = collected
            .iter()
            .filter(|(backend, _)| !backend.is_cache())
            .flat_map(|(_, items)| items.iter().filter(|item| item.section.is_listing()).cloned())
            .collect();

        let report = if discovered.is_empty() || partial {
            EscalationReport::default()
        } else {
            self.orchestrator.escalate_with_cancel(query, &discovered, cancel).await
        };
        partial |= report.cancelled;

        let failed: HashSet<&str> = report.failed_hashes().collect();
        if !failed.is_empty() {
            for (_, items) in &mut collected {
                items.retain(|item| !failed.contains(item.content_hash.as_str()));
            }
        }
        let has_live = collected.iter().any(|(backend, items)| !backend.is_cache() && !items.is_empty());

        if !report.escalated.is_empty() {
            collected.push((Backend::EscalatedFetch, report.escalated.clone()));
        }
        // Cached deep copies compete at their fetch rank so they beat the shallow record.
        if !report.cached.is_empty() {
            collected.push((Backend::EscalatedFetch, report.cached.clone()));
        }

        let mut bundle = self.aggregator.combine(&collected, query);
        note_cache_reuse(&mut bundle, &report);
        bundle.outcomes = report.outcomes;
        bundle.partial = partial;
        bundle.timestamp = self.cache.now();

        if has_live && !partial {
            self.cache.set_json(&query_key, &bundle.plain_items(), self.query_ttl).await;
        }

        tracing::info!(
            query,
            section = %ctx.section,
            results = bundle.len(),
            freshness = ?bundle.freshness,
            sources = ?bundle.sources_used,
            partial = bundle.partial,
            "query collected"
        );
        Ok(bundle)
    }
}

/// Relabel provenance for escalated records that came out of the cache.
fn note_cache_reuse(bundle: &mut ResultBundle, report: &EscalationReport) {
    if report.escalated.is_empty() {
        bundle.sources_used.retain(|b| *b != Backend::EscalatedFetch);
    }

    let cached: HashSet<&str> = report.cached.iter().map(|item| item.content_hash.as_str()).collect();
    let reused = |r: &RankedItem| r.backend == Backend::EscalatedFetch && cached.contains(r.item.content_hash.as_str());
    if !bundle.items.iter().any(reused) {
        return;
    }

    if !bundle.sources_used.contains(&Backend::Cache) {
        bundle.sources_used.push(Backend::Cache);
    }
    let live = bundle.items.iter().any(|r| !r.backend.is_cache() && !reused(r));
    bundle.freshness = if live { Freshness::Mixed } else { Freshness::Cached };
}
