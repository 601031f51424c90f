//! Per-query request context.

use serde::{Deserialize, Serialize};

use super::kinds::{FreshnessHint, Section};

/// Context a query arrives with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub section: Section,
    #[serde(default)]
    pub freshness_hint: FreshnessHint,
}

impl QueryContext {
    pub fn new(section: Section) -> Self {
        Self { section, freshness_hint: FreshnessHint::default() }
    }

    pub fn with_hint(mut self, freshness_hint: FreshnessHint) -> Self {
        self.freshness_hint = freshness_hint;
        self
    }
}
