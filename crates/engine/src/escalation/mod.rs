//! Selective escalation of discovered items.
//!
//! Given the items a listing backend discovered, decide per item whether it
//! is worth an expensive deep fetch:
//!
//! 1. A fresh escalation record in the cache short-circuits to `SKIPPED_CACHED`.
//! 2. Pinned items are escalated without asking the classifier.
//! 3. Unpinned items are escalated only on an unambiguous "YES".
//! 4. A successful fetch is recorded in the cache before the outcome is reported.
//!
//! Pinned items are always decided before unpinned ones. A hash that another
//! concurrent pass is currently fetching waits for that fetch and takes its
//! result: `SKIPPED_CACHED` once it is recorded, `FAILED` if it failed. If the
//! owning pass is cancelled mid-fetch, a waiter claims the hash itself.

pub mod decision;
pub mod outcome;

pub use decision::is_affirmative;
pub use outcome::{EscalationOutcome, EscalationReport, EscalationStatus};

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scout_client::{Classifier, Fetcher, Fields, classify_within, fetch_one_within};
use scout_core::{AppConfig, ContentCache, Error, Item};
use tokio::sync::watch;

use crate::cancel::CancelSignal;

/// Timeouts and cache lifetimes for escalation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationSettings {
    pub classifier_timeout: Duration,
    pub fetch_timeout: Duration,
    /// Maximum age at which an escalation record still counts as fresh.
    pub max_age: Duration,
    /// Lifetime of the escalation record written after a fetch.
    pub ttl: Duration,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            classifier_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(20),
            max_age: Duration::from_secs(86_400),
            ttl: Duration::from_secs(86_400),
        }
    }
}

impl EscalationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            classifier_timeout: config.classifier_timeout(),
            fetch_timeout: config.fetch_timeout(),
            max_age: config.escalation_max_age(),
            ttl: config.escalation_ttl(),
        }
    }
}

/// Hashes being fetched, each with a receiver for the owning pass's result.
type InFlight = Arc<Mutex<HashMap<String, watch::Receiver<Option<EscalationStatus>>>>>;

enum Claim {
    Owner(InFlightGuard),
    Waiter(watch::Receiver<Option<EscalationStatus>>),
}

/// Claim on a hash being fetched; released on drop.
struct InFlightGuard {
    set: InFlight,
    hash: String,
    tx: watch::Sender<Option<EscalationStatus>>,
}

impl InFlightGuard {
    fn claim(set: &InFlight, hash: &str) -> Claim {
        let mut map = set.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rx) = map.get(hash) {
            return Claim::Waiter(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        map.insert(hash.to_string(), rx);
        Claim::Owner(Self { set: Arc::clone(set), hash: hash.to_string(), tx })
    }

    /// Publish the fetch result to waiting passes.
    fn finish(&self, status: EscalationStatus) {
        self.tx.send_replace(Some(status));
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().unwrap_or_else(|e| e.into_inner()).remove(&self.hash);
    }
}

/// Result published by the owning pass, or `None` if it gave up without one.
async fn settled(mut rx: watch::Receiver<Option<EscalationStatus>>) -> Option<EscalationStatus> {
    if rx.wait_for(Option::is_some).await.is_err() {
        return None;
    }
    *rx.borrow()
}

/// Per-item escalation decision engine.
///
/// Clones share the in-flight set, so one orchestrator cloned into many
/// request workers never fetches the same hash twice at once.
#[derive(Clone)]
pub struct EscalationOrchestrator {
    cache: ContentCache,
    classifier: Arc<dyn Classifier>,
    fetcher: Arc<dyn Fetcher>,
    settings: EscalationSettings,
    in_flight: InFlight,
}

impl std::fmt::Debug for EscalationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationOrchestrator")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EscalationOrchestrator {
    pub fn new(
        cache: ContentCache, classifier: Arc<dyn Classifier>, fetcher: Arc<dyn Fetcher>, settings: EscalationSettings,
    ) -> Self {
        Self { cache, classifier, fetcher, settings, in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn settings(&self) -> &EscalationSettings {
        &self.settings
    }

    /// Run one escalation pass over `items`.
    pub async fn escalate(&self, query: &str, items: &[Item]) -> EscalationReport {
        self.escalate_with_cancel(query, items, &CancelSignal::new()).await
    }

    /// Run one escalation pass, stopping early when `cancel` fires.
    ///
    /// Items decided before cancellation keep their outcomes and any cache
    /// writes already made stay in place.
    pub async fn escalate_with_cancel(&self, query: &str, items: &[Item], cancel: &CancelSignal) -> EscalationReport {
        let mut report = EscalationReport::default();
        let mut seen = HashSet::new();
        let (pinned, unpinned): (Vec<&Item>, Vec<&Item>) = items.iter().partition(|item| item.pinned);

        for item in pinned.into_iter().chain(unpinned) {
            if !seen.insert(item.content_hash.as_str()) {
                continue;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if self.decide(query, item, cancel, &mut report).await.is_break() {
                report.cancelled = true;
                break;
            }
        }

        tracing::info!(
            items = items.len(),
            escalated = report.count(EscalationStatus::Escalated),
            cached = report.count(EscalationStatus::SkippedCached),
            declined = report.count(EscalationStatus::SkippedDeclined),
            failed = report.count(EscalationStatus::Failed),
            cancelled = report.cancelled,
            "escalation pass complete"
        );
        report
    }

    async fn decide(
        &self, query: &str, item: &Item, cancel: &CancelSignal, report: &mut EscalationReport,
    ) -> ControlFlow<()> {
        let key = self.cache.key(item.section, &item.content_hash);

        if self.cache.is_fresh(&key, self.settings.max_age).await {
            self.skip_cached(&key, item, "fresh escalation record", report).await;
            return ControlFlow::Continue(());
        }

        if !item.pinned {
            let fields = classifier_fields(query, item);
            let verdict = tokio::select! {
                biased;
                _ = cancel.cancelled() => return ControlFlow::Break(()),
                verdict = classify_within(self.classifier.as_ref(), &fields, self.settings.classifier_timeout) => verdict,
            };
            match verdict {
                Ok(raw) if is_affirmative(&raw) => {}
                Ok(_) => {
                    tracing::debug!(hash = %item.content_hash, "escalation declined");
                    report.outcomes.push(
                        EscalationOutcome::new(&item.content_hash, EscalationStatus::SkippedDeclined)
                            .with_reason("classifier declined"),
                    );
                    return ControlFlow::Continue(());
                }
                Err(e) => {
                    let e = Error::from(e);
                    tracing::warn!(hash = %item.content_hash, error = %e, "escalation classifier failed, declining");
                    report.outcomes.push(
                        EscalationOutcome::new(&item.content_hash, EscalationStatus::SkippedDeclined)
                            .with_reason(e.to_string()),
                    );
                    return ControlFlow::Continue(());
                }
            }
        }

        let claim = loop {
            let rx = match InFlightGuard::claim(&self.in_flight, &item.content_hash) {
                Claim::Owner(guard) => break guard,
                Claim::Waiter(rx) => rx,
            };
            tracing::debug!(hash = %item.content_hash, "escalation in flight, waiting");
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return ControlFlow::Break(()),
                status = settled(rx) => status,
            };
            match status {
                Some(EscalationStatus::Escalated) => {
                    self.skip_cached(&key, item, "escalated concurrently", report).await;
                    return ControlFlow::Continue(());
                }
                Some(_) => {
                    report.outcomes.push(
                        EscalationOutcome::new(&item.content_hash, EscalationStatus::Failed)
                            .with_reason("concurrent escalation failed"),
                    );
                    return ControlFlow::Continue(());
                }
                None => continue,
            }
        };

        // Another pass may have finished this hash between the first check and the claim.
        if self.cache.is_fresh(&key, self.settings.max_age).await {
            self.skip_cached(&key, item, "escalated concurrently", report).await;
            return ControlFlow::Continue(());
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ControlFlow::Break(()),
            fetched = fetch_one_within(self.fetcher.as_ref(), item, self.settings.fetch_timeout) => fetched,
        };

        match fetched {
            Ok(mut enriched) => {
                enriched.content_hash = item.content_hash.clone();
                let at = self.cache.now();
                if !self.cache.set_json(&key, &enriched, self.settings.ttl).await {
                    tracing::warn!(hash = %item.content_hash, "escalation record not written");
                }
                tracing::info!(hash = %item.content_hash, url = %item.url, pinned = item.pinned, "item escalated");
                report.outcomes.push(EscalationOutcome::escalated(&item.content_hash, at));
                report.escalated.push(enriched);
                claim.finish(EscalationStatus::Escalated);
            }
            Err(e) => {
                let e = Error::from(e);
                tracing::warn!(hash = %item.content_hash, url = %item.url, error = %e, "deep fetch failed");
                report
                    .outcomes
                    .push(EscalationOutcome::new(&item.content_hash, EscalationStatus::Failed).with_reason(e.to_string()));
                claim.finish(EscalationStatus::Failed);
            }
        }
        ControlFlow::Continue(())
    }

    async fn skip_cached(&self, key: &str, item: &Item, reason: &str, report: &mut EscalationReport) {
        tracing::debug!(hash = %item.content_hash, reason, "escalation skipped, cached");
        report
            .outcomes
            .push(EscalationOutcome::new(&item.content_hash, EscalationStatus::SkippedCached).with_reason(reason));
        if let Some(cached) = self.cache.get_json::<Item>(key).await {
            report.cached.push(cached);
        }
    }
}

fn classifier_fields(query: &str, item: &Item) -> Fields {
    let mut fields = Fields::new();
    fields.insert("query".into(), query.to_string());
    fields.insert("section".into(), item.section.to_string());
    fields.insert("title".into(), item.title.clone());
    fields.insert("has_media".into(), item.has_media.to_string());
    fields.insert("pinned".into(), item.pinned.to_string());
    fields.insert("snippet".into(), item.content_snippet.clone());
    fields
}
