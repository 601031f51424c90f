//! Closed enums shared by every component.
//!
//! Anything that arrives as free text (classifier output, config values) is
//! parsed against these enums; unknown tokens never become values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform section an item was discovered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Overview,
    Listing,
    Discussion,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Listing => "listing",
            Section::Discussion => "discussion",
        }
    }

    /// Whether this section returns list-style discovery results that are
    /// candidates for escalation.
    pub fn is_listing(&self) -> bool {
        matches!(self, Section::Listing)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Section::Overview),
            "listing" => Ok(Section::Listing),
            "discussion" => Ok(Section::Discussion),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Backend an item was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Backend {
    /// Previously collected results held in the content cache.
    Cache,
    /// Authoritative structured API.
    StructuredApi,
    /// Cheap listing crawl.
    ShallowFetch,
    /// Deep fetch performed by the escalation orchestrator.
    EscalatedFetch,
}

impl Backend {
    /// Backends a routing decision may name.
    pub const ROUTABLE: [Backend; 3] = [Backend::Cache, Backend::StructuredApi, Backend::ShallowFetch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cache => "CACHE",
            Backend::StructuredApi => "STRUCTURED_API",
            Backend::ShallowFetch => "SHALLOW_FETCH",
            Backend::EscalatedFetch => "ESCALATED_FETCH",
        }
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, Backend::Cache)
    }

    pub fn is_routable(&self) -> bool {
        Self::ROUTABLE.contains(self)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    /// Accepts `STRUCTURED_API`, `structured-api`, `Structured Api` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match token.as_str() {
            "CACHE" => Ok(Backend::Cache),
            "STRUCTURED_API" => Ok(Backend::StructuredApi),
            "SHALLOW_FETCH" => Ok(Backend::ShallowFetch),
            "ESCALATED_FETCH" => Ok(Backend::EscalatedFetch),
            _ => Err(format!("unknown backend: {}", s.trim())),
        }
    }
}

/// Routing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Where a result bundle's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Cached,
    Mixed,
    None,
}

/// Caller's freshness requirement for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessHint {
    /// Live data required; cache-only answers are not acceptable.
    Live,
    /// Cached data is preferred when present.
    PreferCached,
    #[default]
    Any,
}

impl FreshnessHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessHint::Live => "live",
            FreshnessHint::PreferCached => "prefer_cached",
            FreshnessHint::Any => "any",
        }
    }
}
