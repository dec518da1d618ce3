// Filtered query for the history list

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::{DatabaseManager, ScanRecord};
use crate::tags::contains_tag;

/// Which records the history list shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    Tag(String),
}

impl HistoryFilter {
    /// Blank or whitespace-only tags mean no filter
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some(tag) if !tag.is_empty() => Self::Tag(tag.to_string()),
            _ => Self::All,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Tag(tag) => Some(tag),
        }
    }

    /// In-memory equivalent of the stored query, for records already loaded
    pub fn matches(&self, record: &ScanRecord) -> bool {
        match self {
            Self::All => true,
            Self::Tag(tag) => contains_tag(&record.tags, tag),
        }
    }

    /// Run the query once against the store, newest first
    pub fn fetch(&self, db: &DatabaseManager) -> Result<Vec<ScanRecord>> {
        match self {
            Self::All => db.get_all_records(),
            Self::Tag(tag) => db.get_records_by_tag(tag),
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Tag(tag) => write!(f, "tag '{}'", tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewScanRecord;

    #[test]
    fn test_from_tag() {
        assert_eq!(HistoryFilter::from_tag(None), HistoryFilter::All);
        assert_eq!(HistoryFilter::from_tag(Some("  ")), HistoryFilter::All);
        assert_eq!(
            HistoryFilter::from_tag(Some(" Bob ")),
            HistoryFilter::Tag("Bob".to_string())
        );
    }

    #[test]
    fn test_fetch_matches_in_memory_filter() {
        let db = DatabaseManager::open_in_memory().unwrap();
        for tags in ["Alice", "Alice, Bob,Carol", "Bob,Alice", "Carol ,  Alice", "Alicia", ""] {
            db.insert_record(&NewScanRecord::new("img", tags)).unwrap();
        }

        let everything = HistoryFilter::All.fetch(&db).unwrap();
        for filter in [
            HistoryFilter::All,
            HistoryFilter::from_tag(Some("Alice")),
            HistoryFilter::from_tag(Some("Bob")),
            HistoryFilter::from_tag(Some("Bo")),
        ] {
            let expected: Vec<_> = everything.iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect();
            assert_eq!(filter.fetch(&db).unwrap(), expected, "filter {}", filter);
        }

        assert_eq!(HistoryFilter::from_tag(Some("Alice")).fetch(&db).unwrap().len(), 4);
        assert!(HistoryFilter::from_tag(Some("Bo")).fetch(&db).unwrap().is_empty());
    }
}
