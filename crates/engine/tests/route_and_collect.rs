use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scout_client::{Classifier, ClassifierError, FetchError, Fetcher, Fields, Source, SourceError};
use scout_core::cache::{MemoryStore, UnavailableStore};
use scout_core::{
    AppConfig, Backend, ContentCache, Error, Freshness, FreshnessHint, Item, ManualClock, QueryContext, Section,
};
use scout_engine::{CancelSignal, Collector, EscalationStatus};

/// Routing reply for calls without a title, per-title verdicts otherwise.
#[derive(Default)]
struct ScriptedClassifier {
    routing: Mutex<String>,
    verdicts: HashMap<String, String>,
}

impl ScriptedClassifier {
    fn new(routing: &str, verdicts: &[(&str, &str)]) -> Self {
        Self {
            routing: Mutex::new(routing.to_string()),
            verdicts: verdicts.iter().map(|(t, v)| (t.to_string(), v.to_string())).collect(),
        }
    }

    fn set_routing(&self, routing: &str) {
        *self.routing.lock().unwrap() = routing.to_string();
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, fields: &Fields) -> Result<String, ClassifierError> {
        match fields.get("title") {
            Some(title) => Ok(self.verdicts.get(title).cloned().unwrap_or_else(|| "NO".into())),
            None => Ok(self.routing.lock().unwrap().clone()),
        }
    }
}

struct StaticSource {
    backend: Backend,
    items: Vec<Item>,
    calls: AtomicUsize,
    fail: bool,
    stall: bool,
}

impl StaticSource {
    fn new(backend: Backend, items: Vec<Item>) -> Self {
        Self { backend, items, calls: AtomicUsize::new(0), fail: false, stall: false }
    }
}

#[async_trait]
impl Source for StaticSource {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn query(&self, _query: &str, _ctx: &QueryContext) -> Result<Vec<Item>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail {
            return Err(SourceError::HttpError { status: 503 });
        }
        Ok(self.items.clone())
    }
}

/// Enriches every item except those whose URL contains "broken".
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, items: &[Item]) -> Vec<Result<Item, FetchError>> {
        self.calls.fetch_add(items.len(), Ordering::SeqCst);
        items
            .iter()
            .map(|item| {
                if item.url.contains("broken") {
                    Err(FetchError::HttpError { status: 500 })
                } else {
                    let mut full = item.clone();
                    full.content = Some(format!("full {}", item.title));
                    Ok(full)
                }
            })
            .collect()
    }
}

fn memory_cache() -> ContentCache {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    ContentCache::new(Arc::new(MemoryStore::new()), Arc::new(clock), "test", 100)
}

fn listing_item(title: &str) -> Item {
    Item::new(title, format!("https://forum.example.com/{}", title.to_lowercase()), "thread", Section::Listing)
}

fn collector(
    cache: ContentCache, classifier: Arc<ScriptedClassifier>, fetcher: Arc<CountingFetcher>,
    sources: Vec<Arc<StaticSource>>,
) -> Collector {
    let sources = sources.into_iter().map(|s| s as Arc<dyn Source>).collect();
    Collector::new(&AppConfig::default(), cache, classifier, fetcher, sources).unwrap()
}

#[tokio::test]
async fn test_listing_items_escalated_by_policy() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH", &[("B", "NO - snippet sufficient")]));
    let fetcher = Arc::new(CountingFetcher::default());
    let a = listing_item("A").pinned(true);
    let b = listing_item("B");
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, vec![a.clone(), b.clone()]));
    let collector = collector(memory_cache(), classifier, fetcher.clone(), vec![shallow]);

    let bundle = collector.route_and_collect("weekly threads", QueryContext::new(Section::Listing)).await.unwrap();

    let status = |hash: &str| bundle.outcomes.iter().find(|o| o.content_hash == hash).map(|o| o.status);
    assert_eq!(status(&a.content_hash), Some(EscalationStatus::Escalated));
    assert_eq!(status(&b.content_hash), Some(EscalationStatus::SkippedDeclined));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    assert_eq!(bundle.len(), 2);
    let ranked_a = bundle.items.iter().find(|r| r.item.content_hash == a.content_hash).unwrap();
    assert_eq!(ranked_a.backend, Backend::EscalatedFetch);
    assert_eq!(ranked_a.item.content.as_deref(), Some("full A"));
    assert_eq!(bundle.sources_used, vec![Backend::ShallowFetch, Backend::EscalatedFetch]);
    assert_eq!(bundle.freshness, Freshness::Fresh);
    assert!(!bundle.partial);
}

#[tokio::test]
async fn test_repeat_query_never_fetches_twice() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH", &[("B", "YES")]));
    let fetcher = Arc::new(CountingFetcher::default());
    let items = vec![listing_item("A").pinned(true), listing_item("B")];
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, items));
    let collector = collector(memory_cache(), classifier, fetcher.clone(), vec![shallow]);
    let ctx = QueryContext::new(Section::Listing);

    collector.route_and_collect("weekly threads", ctx).await.unwrap();
    let second = collector.route_and_collect("weekly threads", ctx).await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert!(second.outcomes.iter().all(|o| o.status == EscalationStatus::SkippedCached));
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn test_repeat_query_keeps_deep_content() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let a = listing_item("A").pinned(true);
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, vec![a.clone()]));
    let collector = collector(memory_cache(), classifier, fetcher.clone(), vec![shallow]);
    let ctx = QueryContext::new(Section::Listing);

    let first = collector.route_and_collect("threads", ctx).await.unwrap();
    assert_eq!(first.items[0].item.content.as_deref(), Some("full A"));

    let second = collector.route_and_collect("threads", ctx).await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.outcomes[0].status, EscalationStatus::SkippedCached);
    assert_eq!(second.len(), 1);
    assert_eq!(second.items[0].backend, Backend::EscalatedFetch);
    assert_eq!(second.items[0].item.content.as_deref(), Some("full A"));
    assert_eq!(second.sources_used, vec![Backend::ShallowFetch, Backend::Cache]);
    assert_eq!(second.freshness, Freshness::Cached);
}

#[tokio::test]
async fn test_failed_fetch_excluded_from_bundle() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let broken = Item::new("Broken", "https://forum.example.com/broken", "thread", Section::Listing).pinned(true);
    let fine = listing_item("Fine");
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, vec![broken.clone(), fine.clone()]));
    let collector = collector(memory_cache(), classifier, fetcher, vec![shallow]);

    let bundle = collector.route_and_collect("threads", QueryContext::new(Section::Listing)).await.unwrap();

    assert!(bundle.items.iter().all(|r| r.item.content_hash != broken.content_hash));
    assert!(bundle.items.iter().any(|r| r.item.content_hash == fine.content_hash));
    assert!(bundle.outcomes.iter().any(|o| o.status == EscalationStatus::Failed));
}

#[tokio::test]
async fn test_latest_query_skips_cache_only_routing() {
    let classifier = Arc::new(ScriptedClassifier::new("CACHE", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let api = Arc::new(StaticSource::new(
        Backend::StructuredApi,
        vec![Item::new("Leaderboard", "https://example.com/lb", "top players", Section::Overview)],
    ));
    let collector = collector(memory_cache(), classifier, fetcher, vec![api.clone()]);

    let bundle =
        collector.route_and_collect("What is the latest leaderboard?", QueryContext::new(Section::Overview)).await.unwrap();

    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(bundle.freshness, Freshness::Fresh);
    assert_eq!(bundle.sources_used, vec![Backend::StructuredApi]);
}

#[tokio::test]
async fn test_cached_query_answered_from_cache() {
    let classifier = Arc::new(ScriptedClassifier::new("STRUCTURED_API", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let api = Arc::new(StaticSource::new(
        Backend::StructuredApi,
        vec![
            Item::new("Season 3 leaderboard", "https://example.com/s3", "final standings", Section::Overview),
            Item::new("Season 2 leaderboard", "https://example.com/s2", "final standings", Section::Overview),
        ],
    ));
    let collector = collector(memory_cache(), classifier.clone(), fetcher, vec![api.clone()]);

    let first = collector.route_and_collect("season leaderboard", QueryContext::new(Section::Overview)).await.unwrap();
    assert_eq!(first.freshness, Freshness::Fresh);

    classifier.set_routing("CACHE");
    let ctx = QueryContext::new(Section::Overview).with_hint(FreshnessHint::PreferCached);
    let second = collector.route_and_collect("season leaderboard", ctx).await.unwrap();

    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.freshness, Freshness::Cached);
    assert_eq!(second.sources_used, vec![Backend::Cache]);
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn test_source_failure_yields_empty_bundle() {
    let classifier = Arc::new(ScriptedClassifier::new("STRUCTURED_API", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let mut api = StaticSource::new(Backend::StructuredApi, Vec::new());
    api.fail = true;
    let collector = collector(memory_cache(), classifier, fetcher, vec![Arc::new(api)]);

    let bundle = collector.route_and_collect("anything", QueryContext::new(Section::Overview)).await.unwrap();

    assert!(bundle.is_empty());
    assert!(bundle.sources_used.is_empty());
    assert_eq!(bundle.freshness, Freshness::None);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_source_times_out() {
    let classifier = Arc::new(ScriptedClassifier::new("STRUCTURED_API, SHALLOW_FETCH", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let mut api = StaticSource::new(Backend::StructuredApi, Vec::new());
    api.stall = true;
    let shallow = StaticSource::new(
        Backend::ShallowFetch,
        vec![Item::new("Overview", "https://example.com", "intro", Section::Overview)],
    );
    let collector = collector(memory_cache(), classifier, fetcher, vec![Arc::new(api), Arc::new(shallow)]);

    let bundle = collector.route_and_collect("overview", QueryContext::new(Section::Overview)).await.unwrap();

    assert_eq!(bundle.sources_used, vec![Backend::ShallowFetch]);
    assert_eq!(bundle.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_returns_partial_bundle() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH, STRUCTURED_API", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let shallow = StaticSource::new(
        Backend::ShallowFetch,
        vec![Item::new("Overview", "https://example.com", "intro", Section::Overview)],
    );
    let mut api = StaticSource::new(Backend::StructuredApi, Vec::new());
    api.stall = true;
    let collector = collector(memory_cache(), classifier, fetcher, vec![Arc::new(shallow), Arc::new(api)]);

    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    let ctx = QueryContext::new(Section::Overview);
    let (bundle, _) = tokio::join!(collector.route_and_collect_with_cancel("overview", ctx, &cancel), async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let bundle = bundle.unwrap();

    assert!(bundle.partial);
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.sources_used, vec![Backend::ShallowFetch]);
}

#[tokio::test]
async fn test_unavailable_cache_degrades() {
    let cache = ContentCache::new(
        Arc::new(UnavailableStore::new("connection refused")),
        Arc::new(ManualClock::default()),
        "test",
        100,
    );
    let classifier = Arc::new(ScriptedClassifier::new("CACHE, SHALLOW_FETCH", &[]));
    let fetcher = Arc::new(CountingFetcher::default());
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, vec![listing_item("A").pinned(true)]));
    let collector = collector(cache, classifier, fetcher.clone(), vec![shallow]);

    let bundle = collector.route_and_collect("threads", QueryContext::new(Section::Listing)).await.unwrap();

    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.freshness, Freshness::Fresh);
    assert!(!bundle.sources_used.contains(&Backend::Cache));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_query_returns_empty_bundle() {
    let classifier = Arc::new(ScriptedClassifier::new("SHALLOW_FETCH", &[]));
    let shallow = Arc::new(StaticSource::new(Backend::ShallowFetch, vec![listing_item("A")]));
    let collector = collector(memory_cache(), classifier, Arc::new(CountingFetcher::default()), vec![shallow.clone()]);

    let bundle = collector.route_and_collect("   ", QueryContext::new(Section::Listing)).await.unwrap();

    assert!(bundle.is_empty());
    assert_eq!(bundle.freshness, Freshness::None);
    assert_eq!(shallow.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_configuration_errors_fail_fast() {
    let classifier: Arc<dyn Classifier> = Arc::new(ScriptedClassifier::default());
    let fetcher: Arc<dyn Fetcher> = Arc::new(CountingFetcher::default());
    let config = AppConfig::default();

    let none = Collector::new(&config, memory_cache(), classifier.clone(), fetcher.clone(), Vec::new());
    assert!(matches!(none, Err(Error::Configuration(_))));

    let duplicate: Vec<Arc<dyn Source>> = vec![
        Arc::new(StaticSource::new(Backend::ShallowFetch, Vec::new())),
        Arc::new(StaticSource::new(Backend::ShallowFetch, Vec::new())),
    ];
    let dup = Collector::new(&config, memory_cache(), classifier.clone(), fetcher.clone(), duplicate);
    assert!(matches!(dup, Err(Error::Configuration(_))));

    let cache_source: Vec<Arc<dyn Source>> = vec![Arc::new(StaticSource::new(Backend::Cache, Vec::new()))];
    let bad = Collector::new(&config, memory_cache(), classifier.clone(), fetcher.clone(), cache_source);
    assert!(matches!(bad, Err(Error::Configuration(_))));

    let invalid = AppConfig { backend_priority: Vec::new(), ..Default::default() };
    let sources: Vec<Arc<dyn Source>> = vec![Arc::new(StaticSource::new(Backend::ShallowFetch, Vec::new()))];
    let result = Collector::new(&invalid, memory_cache(), classifier, fetcher, sources);
    assert!(matches!(result, Err(Error::Configuration(_))));
}
