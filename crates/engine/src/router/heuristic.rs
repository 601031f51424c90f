//! Deterministic keyword signal over the query text.

use scout_core::Priority;

/// Terms that demand live data.
pub const RECENCY_TERMS: &[&str] = &["latest", "now", "current"];

/// Terms that make cached data acceptable.
pub const HISTORICAL_TERMS: &[&str] = &["past", "historical", "archive"];

/// Which term families a query mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TermSignal {
    pub recency: bool,
    pub historical: bool,
}

impl TermSignal {
    /// Scan a query for whole-word, case-insensitive term matches.
    pub fn scan(query: &str) -> Self {
        let mut signal = Self::default();
        for word in query.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            signal.recency |= RECENCY_TERMS.contains(&word.as_str());
            signal.historical |= HISTORICAL_TERMS.contains(&word.as_str());
        }
        signal
    }

    /// Priority forced by the terms, if any. Recency wins over history.
    pub fn priority(&self) -> Option<Priority> {
        if self.recency {
            Some(Priority::High)
        } else if self.historical {
            Some(Priority::Low)
        } else {
            None
        }
    }

    pub fn is_silent(&self) -> bool {
        !self.recency && !self.historical
    }
}
