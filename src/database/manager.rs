// Database Manager for Scan History
// Owns the SQLite connection and publishes a change counter for live queries

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;

use super::migrations;

/// Database manager that owns the SQLite connection
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    /// Bumped after every committed insert or delete
    changes: watch::Sender<u64>,
}

impl DatabaseManager {
    /// Open (or create) the database at the specified path and migrate it
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(&db_path)
            .context("Failed to open database")?;

        let manager = Self::from_connection(conn, db_path)?;
        log::info!("Database initialized at: {:?}", manager.db_path);
        Ok(manager)
    }

    /// Open a private in-memory database (nothing is persisted)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        // Enable foreign keys so tag links follow their record
        conn.execute("PRAGMA foreign_keys = ON", [])
            .context("Failed to enable foreign keys")?;

        migrations::run_migrations(&conn)
            .context("Failed to run database migrations")?;

        let (changes, _) = watch::channel(0);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            changes,
        })
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }

    /// Execute a function inside a single transaction; rolled back on error
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()
                .context("Failed to begin transaction")?;
            let value = f(&*tx)?;
            tx.commit().context("Failed to commit transaction")?;
            Ok(value)
        })
    }

    /// Receiver that observes every committed mutation
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Current value of the change counter
    pub fn change_version(&self) -> u64 {
        *self.changes.borrow()
    }

    pub(crate) fn notify_changed(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
        log::trace!("Store change published (version {})", self.change_version());
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connection, surfacing any error SQLite reports on shutdown
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner()
            .map_err(|e| anyhow::anyhow!("Database connection lock poisoned: {}", e))?;
        conn.close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")?;
        log::info!("Database closed: {:?}", self.db_path);
        Ok(())
    }
}
