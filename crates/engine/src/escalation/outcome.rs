//! Per-item escalation outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scout_core::Item;

/// Terminal state of one item in an escalation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationStatus {
    SkippedCached,
    SkippedDeclined,
    Escalated,
    Failed,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::SkippedCached => "SKIPPED_CACHED",
            EscalationStatus::SkippedDeclined => "SKIPPED_DECLINED",
            EscalationStatus::Escalated => "ESCALATED",
            EscalationStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub content_hash: String,
    pub status: EscalationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,
    /// Short human-readable cause for skips and failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EscalationOutcome {
    pub(crate) fn new(content_hash: &str, status: EscalationStatus) -> Self {
        Self { content_hash: content_hash.to_string(), status, escalated_at: None, reason: None }
    }

    pub(crate) fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub(crate) fn escalated(content_hash: &str, at: DateTime<Utc>) -> Self {
        Self { escalated_at: Some(at), ..Self::new(content_hash, EscalationStatus::Escalated) }
    }
}

/// Result of one escalation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationReport {
    /// One outcome per distinct hash decided, pinned items first.
    pub outcomes: Vec<EscalationOutcome>,
    /// Items enriched by a deep fetch in this pass.
    pub escalated: Vec<Item>,
    /// Previously escalated items recovered from the cache.
    pub cached: Vec<Item>,
    /// Set when the pass stopped early on cancellation.
    pub cancelled: bool,
}

impl EscalationReport {
    pub fn status_of(&self, content_hash: &str) -> Option<EscalationStatus> {
        self.outcomes.iter().find(|o| o.content_hash == content_hash).map(|o| o.status)
    }

    pub fn count(&self, status: EscalationStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Hashes whose deep fetch failed.
    pub fn failed_hashes(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == EscalationStatus::Failed)
            .map(|o| o.content_hash.as_str())
    }
}
