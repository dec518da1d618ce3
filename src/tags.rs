// Tag parsing for Scan History
// Records keep the raw comma-separated text the user typed; everything that
// reads tags goes through these helpers so spacing and empty entries never matter.

use std::collections::BTreeSet;

/// Split a raw tag field into trimmed, non-empty tags.
///
/// Order of first appearance is kept and repeated entries collapse, so
/// `" Bob,Alice , Bob,,"` yields `["Bob", "Alice"]`.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

/// Build the distinct tag set across many raw tag fields, sorted
/// lexicographically (byte order, so uppercase sorts before lowercase).
pub fn derive_tag_index<I, S>(raw_fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique = BTreeSet::new();

    for raw in raw_fields {
        let raw = raw.as_ref();
        if raw.is_empty() {
            continue;
        }
        for tag in raw.split(',').map(str::trim) {
            if !tag.is_empty() {
                unique.insert(tag.to_string());
            }
        }
    }

    unique.into_iter().collect()
}

/// Whether `tag` is one of the entries of a raw tag field (exact, case-sensitive).
pub fn contains_tag(raw: &str, tag: &str) -> bool {
    let tag = tag.trim();
    !tag.is_empty() && raw.split(',').map(str::trim).any(|entry| entry == tag)
}

/// Display line for a record's tags, e.g. `"With: Alice, Bob"`.
/// `None` when the field holds no usable tag.
pub fn tag_line(raw: &str) -> Option<String> {
    let tags = parse_tag_list(raw);
    if tags.is_empty() {
        None
    } else {
        Some(format!("With: {}", tags.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list_trims_and_dedupes() {
        assert_eq!(parse_tag_list(" Bob,Alice , Bob,,"), vec!["Bob", "Alice"]);
        assert!(parse_tag_list("").is_empty());
        assert!(parse_tag_list(" , ,").is_empty());
    }

    #[test]
    fn test_parse_tag_list_is_case_sensitive() {
        assert_eq!(parse_tag_list("bob, Bob"), vec!["bob", "Bob"]);
    }

    #[test]
    fn test_tag_index_collapses_duplicates_and_sorts() {
        let index = derive_tag_index(["A, b", "b,C", ""]);
        assert_eq!(index, vec!["A", "C", "b"]);
    }

    #[test]
    fn test_tag_index_of_nothing_is_empty() {
        let index = derive_tag_index(Vec::<String>::new());
        assert!(index.is_empty());
    }

    #[test]
    fn test_contains_tag_positions() {
        assert!(contains_tag("Alice", "Alice"));
        assert!(contains_tag("Alice,Bob,Carol", "Alice"));
        assert!(contains_tag("Alice, Bob, Carol", "Carol"));
        assert!(contains_tag("Alice, Bob,Carol", "Bob"));
        assert!(!contains_tag("Alice, Bob,Carol", "Bo"));
        assert!(!contains_tag("Alice, Bob,Carol", "bob"));
        assert!(!contains_tag("", "Alice"));
        assert!(!contains_tag("Alice", ""));
    }

    #[test]
    fn test_tag_line() {
        assert_eq!(tag_line("Alice,  Bob ,"), Some("With: Alice, Bob".to_string()));
        assert_eq!(tag_line(" , "), None);
    }
}
