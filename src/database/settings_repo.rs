// Settings repository for Scan History
// Key/value preferences that outlive a single history screen

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{HistorySettings, Setting};
use super::DatabaseManager;

const LAST_FILTER_TAG: &str = "history.last_filter_tag";

impl DatabaseManager {
    /// Get a single setting by key
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            get_setting_impl(conn, key)
        })
    }

    /// Set a single setting
    pub fn set_setting(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        self.with_connection(|conn| {
            set_setting_impl(conn, key, value, value_type)
        })
    }

    /// Delete a setting by key
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            delete_setting_impl(conn, key)
        })
    }

    /// Get all settings
    pub fn get_all_settings_list(&self) -> Result<Vec<Setting>> {
        self.with_connection(get_all_settings_impl)
    }

    /// Load the history preferences as a structured object
    pub fn load_history_settings(&self) -> Result<HistorySettings> {
        self.with_connection(|conn| {
            Ok(HistorySettings {
                last_filter_tag: get_setting_impl(conn, LAST_FILTER_TAG)?
                    .filter(|tag| !tag.trim().is_empty()),
            })
        })
    }

    /// Remember the tag filter last chosen on the history screen (`None` = all)
    pub fn save_last_filter_tag(&self, tag: Option<&str>) -> Result<()> {
        match tag {
            Some(tag) => self.set_setting(LAST_FILTER_TAG, tag, "string"),
            None => self.delete_setting(LAST_FILTER_TAG),
        }
    }
}

fn get_setting_impl(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM settings WHERE key = ?"
    ).context("Failed to prepare get_setting query")?;

    let result = stmt.query_row(params![key], |row| row.get(0));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get setting"),
    }
}

fn set_setting_impl(conn: &Connection, key: &str, value: &str, value_type: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, value_type, updated_at)
        VALUES (?1, ?2, ?3, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            value_type = excluded.value_type,
            updated_at = datetime('now')
        "#,
        params![key, value, value_type],
    ).context("Failed to set setting")?;

    Ok(())
}

fn get_all_settings_impl(conn: &Connection) -> Result<Vec<Setting>> {
    let mut stmt = conn.prepare(
        "SELECT key, value, value_type, updated_at FROM settings ORDER BY key"
    ).context("Failed to prepare get_all_settings query")?;

    let settings = stmt.query_map([], |row| {
        Ok(Setting {
            key: row.get(0)?,
            value: row.get(1)?,
            value_type: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }).context("Failed to query settings")?;

    settings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect settings")
}

fn delete_setting_impl(conn: &Connection, key: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM settings WHERE key = ?",
        params![key],
    ).context("Failed to delete setting")?;

    Ok(())
}
