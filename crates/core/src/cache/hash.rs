//! Content-addressed key generation.

use sha2::{Digest, Sha256};

use crate::model::url::canonical_str;

/// Trim, lowercase and collapse internal whitespace runs to a single space.
pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Compute the identity hash of an item.
///
/// The digest covers the normalized title, the canonical URL and the
/// normalized body text, so cosmetic differences between sources (casing,
/// whitespace, URL fragments) collapse to the same hash.
pub fn content_hash(title: &str, url: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(title).as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_str(url).as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_text(body).as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the cache key hash for a query's previously collected results.
pub fn query_hash(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(query).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = content_hash("Weekly Leaderboard", "https://example.com/board", "Top ten players");
        let hash2 = content_hash("Weekly Leaderboard", "https://example.com/board", "Top ten players");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_ignores_cosmetic_differences() {
        let hash1 = content_hash("Weekly  Leaderboard ", "https://EXAMPLE.com/board#top", "Top ten\nplayers");
        let hash2 = content_hash("weekly leaderboard", "example.com/board", "top ten players");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_body() {
        let hash1 = content_hash("Board", "https://example.com", "first");
        let hash2 = content_hash("Board", "https://example.com", "second");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_format() {
        let hash = content_hash("t", "https://example.com", "b");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_query_hash_normalized() {
        assert_eq!(query_hash("Latest  Scores"), query_hash("latest scores"));
        assert_ne!(query_hash("latest scores"), query_hash("past scores"));
    }
}
