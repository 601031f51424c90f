//! Deterministic keyword scoring.

use std::collections::BTreeSet;

use scout_core::Item;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it", "of", "on", "or", "the",
    "this", "that", "to", "was", "what", "when", "where", "which", "who", "with",
];

const TITLE_WEIGHT: f64 = 3.0;
const SNIPPET_WEIGHT: f64 = 1.0;
const PINNED_BONUS: f64 = 2.0;

/// Lowercase alphanumeric words of two or more characters, minus stop words.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Number of distinct query terms present in `text`.
pub fn overlap(query_terms: &BTreeSet<String>, text: &str) -> usize {
    terms(text).intersection(query_terms).count()
}

/// `title overlap * 3 + snippet overlap + pinned bonus + supplied relevance`.
pub fn score(item: &Item, query_terms: &BTreeSet<String>) -> f64 {
    let title = overlap(query_terms, &item.title) as f64 * TITLE_WEIGHT;
    let snippet = overlap(query_terms, &item.content_snippet) as f64 * SNIPPET_WEIGHT;
    let pinned = if item.pinned { PINNED_BONUS } else { 0.0 };
    title + snippet + pinned + item.relevance.unwrap_or(0.0)
}
