// Database models - Tags
use serde::{Deserialize, Serialize};

/// A normalized tag and how many records currently carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
    pub name: String,
    pub record_count: i64,
}
