//! Search term handling shared by every backend.

/// Trims a raw term; blank terms mean "no filter".
#[must_use]
pub fn normalize_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Case-insensitive substring match.
#[must_use]
pub fn matches(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(&term.to_lowercase())
}

/// Like [`matches`] for optional fields; `None` never matches.
#[must_use]
pub fn matches_opt(haystack: Option<&str>, term: &str) -> bool {
    haystack.is_some_and(|h| matches(h, term))
}

/// Builds an `ILIKE` pattern matching `term` anywhere, escaping wildcards.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_term("  "), None);
        assert_eq!(normalize_term(" Roland "), Some("Roland".to_string()));
    }

    #[test]
    fn test_matches_case_insensitive() {
        assert!(matches("Long & McQuade", "mcquade"));
        assert!(!matches("Yorkville", "coast"));
        assert!(matches_opt(Some("ap@coast.ca"), "COAST"));
        assert!(!matches_opt(None, "x"));
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("gibson"), "%gibson%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
