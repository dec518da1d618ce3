// Tags repository for Scan History
// Read-only views over the tags attached to scan records

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::TagUsage;
use super::DatabaseManager;
use crate::tags::derive_tag_index;

impl DatabaseManager {
    /// Distinct tags in use, sorted; recomputed from the raw tag fields
    pub fn get_tag_index(&self) -> Result<Vec<String>> {
        let raw = self.with_connection(get_raw_tag_fields_impl)?;
        Ok(derive_tag_index(raw))
    }

    /// Raw tag text of every record whose tag field is non-empty
    pub fn get_raw_tag_fields(&self) -> Result<Vec<String>> {
        self.with_connection(get_raw_tag_fields_impl)
    }

    /// Tags with the number of records carrying each, ordered by name
    pub fn get_tag_usage(&self) -> Result<Vec<TagUsage>> {
        self.with_connection(get_tag_usage_impl)
    }

    /// Normalized tags of one record, ordered by name
    pub fn get_record_tags(&self, record_id: i64) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            get_record_tags_impl(conn, record_id)
        })
    }
}

fn get_raw_tag_fields_impl(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tags FROM scan_records WHERE tags != ''"
    ).context("Failed to prepare raw tag query")?;

    let tags = stmt.query_map([], |row| row.get::<_, String>(0))
        .context("Failed to query raw tags")?;

    tags.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect raw tags")
}

fn get_tag_usage_impl(conn: &Connection) -> Result<Vec<TagUsage>> {
    // Tags whose last record was deleted drop out through the inner join
    let mut stmt = conn.prepare(
        r#"
        SELECT t.name, COUNT(rt.record_id)
        FROM tags t
        JOIN record_tags rt ON t.id = rt.tag_id
        GROUP BY t.id
        ORDER BY t.name ASC
        "#
    ).context("Failed to prepare tag usage query")?;

    let usage = stmt.query_map([], |row| {
        Ok(TagUsage {
            name: row.get(0)?,
            record_count: row.get(1)?,
        })
    }).context("Failed to query tag usage")?;

    usage.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect tag usage")
}

fn get_record_tags_impl(conn: &Connection, record_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.name
        FROM tags t
        JOIN record_tags rt ON t.id = rt.tag_id
        WHERE rt.record_id = ?
        ORDER BY t.name ASC
        "#
    ).context("Failed to prepare get_record_tags query")?;

    let tags = stmt.query_map(params![record_id], |row| row.get::<_, String>(0))
        .context("Failed to query record tags")?;

    tags.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect record tags")
}
