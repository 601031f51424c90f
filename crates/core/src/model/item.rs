//! Discovered content items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::kinds::Section;
use crate::cache::hash::content_hash;

/// A unit of content discovered on the platform.
///
/// `content_hash` is the sole identity key: two items with the same hash are
/// the same logical unit no matter which backend produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub content_hash: String,
    pub title: String,
    pub url: String,
    pub content_snippet: String,
    pub pinned: bool,
    pub section: Section,
    #[serde(default)]
    pub has_media: bool,
    /// Full content, present once the item has been deep-fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Relevance score supplied by the source, added verbatim when ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Source-specific optional fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Item {
    /// Create an unpinned item, deriving its content hash.
    pub fn new(
        title: impl Into<String>, url: impl Into<String>, content_snippet: impl Into<String>, section: Section,
    ) -> Self {
        let title = title.into();
        let url = url.into();
        let content_snippet = content_snippet.into();
        Self {
            content_hash: content_hash(&title, &url, &content_snippet),
            title,
            url,
            content_snippet,
            pinned: false,
            section,
            has_media: false,
            content: None,
            relevance: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_media(mut self, has_media: bool) -> Self {
        self.has_media = has_media;
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override the derived hash, for sources that supply their own identity.
    pub fn with_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = content_hash.into();
        self
    }
}
