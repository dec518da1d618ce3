// Scan records repository for Scan History
// Handles insert, delete and lookups for saved scans

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::migrations::link_tag;
use super::models::{NewScanRecord, ScanRecord};
use super::DatabaseManager;
use crate::tags::parse_tag_list;

const RECORD_COLUMNS: &str = "r.id, r.image_ref, r.tags, r.from_gallery, r.captured_at";

impl DatabaseManager {
    /// Insert a record; `id` and `captured_at` are assigned here
    pub fn insert_record(&self, record: &NewScanRecord) -> Result<ScanRecord> {
        let captured_at = chrono::Utc::now().timestamp_millis();
        let inserted = self.with_transaction(|conn| {
            insert_record_impl(conn, record, captured_at)
        })?;
        self.notify_changed();
        log::debug!("Inserted scan record {} ({})", inserted.id, inserted.image_ref);
        Ok(inserted)
    }

    /// Delete a record by id. Returns false when no such record existed.
    pub fn delete_record(&self, id: i64) -> Result<bool> {
        let removed = self.with_transaction(|conn| {
            delete_record_impl(conn, id)
        })?;
        if removed {
            self.notify_changed();
            log::debug!("Deleted scan record {}", id);
        }
        Ok(removed)
    }

    /// Get a record by id
    pub fn get_record(&self, id: i64) -> Result<Option<ScanRecord>> {
        self.with_connection(|conn| {
            get_record_impl(conn, id)
        })
    }

    /// Get all records (most recent first)
    pub fn get_all_records(&self) -> Result<Vec<ScanRecord>> {
        self.with_connection(get_all_records_impl)
    }

    /// Get records carrying `tag` (exact, case-sensitive), most recent first
    pub fn get_records_by_tag(&self, tag: &str) -> Result<Vec<ScanRecord>> {
        self.with_connection(|conn| {
            get_records_by_tag_impl(conn, tag)
        })
    }

    /// Number of stored records
    pub fn count_records(&self) -> Result<i64> {
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM scan_records", [], |row| row.get(0))
                .context("Failed to count records")
        })
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    Ok(ScanRecord {
        id: row.get(0)?,
        image_ref: row.get(1)?,
        tags: row.get(2)?,
        from_gallery: row.get(3)?,
        captured_at: row.get(4)?,
    })
}

fn insert_record_impl(conn: &Connection, record: &NewScanRecord, captured_at: i64) -> Result<ScanRecord> {
    conn.execute(
        "INSERT INTO scan_records (image_ref, tags, from_gallery, captured_at) VALUES (?1, ?2, ?3, ?4)",
        params![record.image_ref, record.tags, record.from_gallery, captured_at],
    ).context("Failed to insert scan record")?;

    let id = conn.last_insert_rowid();

    for tag in parse_tag_list(&record.tags) {
        link_tag(conn, id, &tag)?;
    }

    Ok(ScanRecord {
        id,
        image_ref: record.image_ref.clone(),
        tags: record.tags.clone(),
        from_gallery: record.from_gallery,
        captured_at,
    })
}

fn delete_record_impl(conn: &Connection, id: i64) -> Result<bool> {
    // Tag links go with the record through ON DELETE CASCADE
    let changes = conn.execute("DELETE FROM scan_records WHERE id = ?", params![id])
        .context("Failed to delete scan record")?;

    if changes > 0 {
        // Tags no record links to any more
        conn.execute(
            "DELETE FROM tags WHERE NOT EXISTS (SELECT 1 FROM record_tags rt WHERE rt.tag_id = tags.id)",
            [],
        ).context("Failed to prune unused tags")?;
    }

    Ok(changes > 0)
}

fn get_record_impl(conn: &Connection, id: i64) -> Result<Option<ScanRecord>> {
    let mut stmt = conn.prepare(
        &format!("SELECT {} FROM scan_records r WHERE r.id = ?", RECORD_COLUMNS)
    ).context("Failed to prepare get_record query")?;

    let result = stmt.query_row(params![id], record_from_row);

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get scan record"),
    }
}

fn get_all_records_impl(conn: &Connection) -> Result<Vec<ScanRecord>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM scan_records r
        ORDER BY r.captured_at DESC, r.id DESC
        "#,
        RECORD_COLUMNS
    )).context("Failed to prepare get_all_records query")?;

    let records = stmt.query_map([], record_from_row)
        .context("Failed to query scan records")?;

    records.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect scan records")
}

fn get_records_by_tag_impl(conn: &Connection, tag: &str) -> Result<Vec<ScanRecord>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM scan_records r
        WHERE EXISTS (
            SELECT 1
            FROM record_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.record_id = r.id AND t.name = ?1
        )
        ORDER BY r.captured_at DESC, r.id DESC
        "#,
        RECORD_COLUMNS
    )).context("Failed to prepare get_records_by_tag query")?;

    let records = stmt.query_map(params![tag.trim()], record_from_row)
        .context("Failed to query scan records by tag")?;

    records.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect scan records by tag")
}
