//! Small string helpers shared by the extractor and the aggregator.

use std::collections::HashSet;

/// Collapse every whitespace run to one space and trim the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `max_chars` characters of `text` (char-boundary safe).
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Exact-match dedup keeping first-seen order.
pub(crate) fn dedup<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_whitespace("  Hello\n\t  world  "), "Hello world");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn dedup_is_case_sensitive_and_ordered() {
        let out = dedup(["b", "a", "b", "A", "a"]);
        assert_eq!(out, vec!["b", "a", "A"]);
    }
}
