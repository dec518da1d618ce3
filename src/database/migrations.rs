// Database migrations for Scan History
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::tags::parse_tag_list;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    ).context("Failed to inspect schema_version table")?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    ).context("Failed to read schema version")?;

    Ok(version.unwrap_or(0))
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Settings table: Key-value store for user preferences
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            value_type TEXT NOT NULL DEFAULT 'string',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Scan records: one row per saved scan or import
        CREATE TABLE IF NOT EXISTS scan_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_ref TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '',
            captured_at INTEGER NOT NULL
                DEFAULT (CAST(ROUND((julianday('now') - 2440587.5) * 86400000) AS INTEGER))
        );

        CREATE INDEX IF NOT EXISTS idx_scan_records_captured_at
        ON scan_records(captured_at DESC);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
    "#).context("Failed to run migration v1")?;

    log::info!("Migration v1 completed successfully");
    Ok(())
}

/// Capture source tracking (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2 - Capture source");

    conn.execute_batch(r#"
        -- Existing rows predate gallery import and read as camera captures
        ALTER TABLE scan_records ADD COLUMN from_gallery INTEGER NOT NULL DEFAULT 0;

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
    "#).context("Failed to run migration v2")?;

    log::info!("Migration v2 completed successfully");
    Ok(())
}

/// Normalized tag relation (version 3)
fn migrate_v3(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v3 - Normalized tags");

    let tx = conn.unchecked_transaction()
        .context("Failed to begin migration v3")?;

    tx.execute_batch(r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS record_tags (
            record_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (record_id, tag_id),
            FOREIGN KEY (record_id) REFERENCES scan_records(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_record_tags_tag_id
        ON record_tags(tag_id);
    "#).context("Failed to create tag tables")?;

    // Backfill links for rows written before the relation existed
    let existing: Vec<(i64, String)> = {
        let mut stmt = tx.prepare("SELECT id, tags FROM scan_records WHERE tags != ''")
            .context("Failed to prepare tag backfill query")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Failed to query records for tag backfill")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect records for tag backfill")?
    };

    let mut linked = 0usize;
    for (record_id, raw_tags) in &existing {
        for tag in parse_tag_list(raw_tags) {
            link_tag(&tx, *record_id, &tag)?;
            linked += 1;
        }
    }

    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", params![3])
        .context("Failed to record migration v3")?;
    tx.commit().context("Failed to commit migration v3")?;

    log::info!(
        "Migration v3 completed successfully ({} records, {} tag links backfilled)",
        existing.len(),
        linked
    );
    Ok(())
}

/// Attach a tag to a record, creating the tag row on first use
pub(crate) fn link_tag(conn: &Connection, record_id: i64, tag: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
        params![tag],
    ).context("Failed to create tag")?;

    conn.execute(
        r#"
        INSERT OR IGNORE INTO record_tags (record_id, tag_id)
        SELECT ?1, id FROM tags WHERE name = ?2
        "#,
        params![record_id, tag],
    ).context("Failed to link tag to record")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();

        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Running again is a no-op
        run_migrations(&conn).unwrap();
        let rows: i32 = conn.query_row(
            "SELECT COUNT(*) FROM schema_version",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(rows, SCHEMA_VERSION);
    }

    #[test]
    fn test_captured_at_defaults_to_now() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let before = chrono::Utc::now().timestamp_millis();
        conn.execute("INSERT INTO scan_records (image_ref) VALUES ('img')", []).unwrap();
        let captured_at: i64 = conn.query_row(
            "SELECT captured_at FROM scan_records",
            [],
            |row| row.get(0),
        ).unwrap();

        assert!((captured_at - before).abs() < 60_000);
    }

    #[test]
    fn test_v2_defaults_old_rows_to_camera() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO scan_records (image_ref, tags, captured_at) VALUES ('old', 'Alice', 10)",
            [],
        ).unwrap();

        run_migrations(&conn).unwrap();

        let from_gallery: bool = conn.query_row(
            "SELECT from_gallery FROM scan_records WHERE image_ref = 'old'",
            [],
            |row| row.get(0),
        ).unwrap();
        assert!(!from_gallery);
    }

    #[test]
    fn test_v3_backfills_tag_links() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        conn.execute_batch(r#"
            INSERT INTO scan_records (image_ref, tags, captured_at) VALUES ('a', 'Alice, Bob,Alice', 1);
            INSERT INTO scan_records (image_ref, tags, captured_at) VALUES ('b', ' Bob ', 2);
            INSERT INTO scan_records (image_ref, tags, captured_at) VALUES ('c', '', 3);
        "#).unwrap();

        run_migrations(&conn).unwrap();

        let tag_count: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0)).unwrap();
        assert_eq!(tag_count, 2);

        let bob_links: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_tags rt JOIN tags t ON t.id = rt.tag_id WHERE t.name = 'Bob'",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(bob_links, 2);
    }
}
