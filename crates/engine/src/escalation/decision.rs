//! YES/NO parsing of escalation classifier output.

/// True only when the leading token is unambiguously "yes".
///
/// Surrounding punctuation and markup are stripped from the token, so
/// `"**Yes**, the snippet is truncated"` counts, while `"YES/NO"` and
/// `"yesterday"` do not.
pub fn is_affirmative(raw: &str) -> bool {
    let Some(first) = raw.split_whitespace().next() else {
        return false;
    };
    let token = first.trim_matches(|c: char| !c.is_alphanumeric());
    token.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_variants() {
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("yes - full thread needed"));
        assert!(is_affirmative("  Yes.\nrationale"));
        assert!(is_affirmative("**yes**"));
        assert!(is_affirmative("Yes, because"));
    }

    #[test]
    fn test_everything_else_declines() {
        assert!(!is_affirmative("NO - snippet sufficient"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("   "));
        assert!(!is_affirmative("YES/NO"));
        assert!(!is_affirmative("yesterday"));
        assert!(!is_affirmative("Maybe yes"));
        assert!(!is_affirmative("Y"));
    }
}
