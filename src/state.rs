// State management for Scan History

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::database::DatabaseManager;
use crate::history::{HistoryScreen, HistoryService, HistoryView, SubscriptionRegistry};

/// Everything a running app shares: the store, the async service over it and
/// the registry of live subscriptions. Built once at startup and closed on exit.
pub struct AppState {
    db: Arc<DatabaseManager>,
    registry: SubscriptionRegistry,
    service: HistoryService,
}

impl AppState {
    /// Open the store at the configured path
    pub fn open(config: &Config) -> Result<Self> {
        let db = DatabaseManager::new(config.db_path.clone())?;
        Ok(Self::from_manager(db))
    }

    pub fn from_manager(db: DatabaseManager) -> Self {
        let db = Arc::new(db);
        Self {
            service: HistoryService::new(db.clone()),
            registry: SubscriptionRegistry::new(),
            db,
        }
    }

    pub fn service(&self) -> &HistoryService {
        &self.service
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    pub async fn open_history_screen(&self, view: Arc<dyn HistoryView>) -> HistoryScreen {
        HistoryScreen::open(self.service.clone(), self.registry.clone(), view).await
    }

    /// Cancel every live query and close the store
    pub fn close(self) -> Result<()> {
        let cancelled = self.registry.cancel_all();
        if cancelled > 0 {
            log::info!("Cancelled {} live subscriptions on shutdown", cancelled);
        }

        let Self { db, service, .. } = self;
        drop(service);

        match Arc::try_unwrap(db) {
            Ok(db) => db.close(),
            Err(db) => {
                // Still borrowed by a screen or a finishing task; the
                // connection closes when the last reference goes away
                log::warn!(
                    "Database still has {} other references, deferring close",
                    Arc::strong_count(&db) - 1
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewScanRecord;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_save_close_reopen() {
        let dir = tempdir().unwrap();
        let config = Config::new(dir.path().join("history.db"));

        let state = AppState::open(&config).unwrap();
        let saved = state.service()
            .save_record(NewScanRecord::new("img", "Alice").from_gallery(true))
            .await
            .unwrap();
        state.close().unwrap();

        let state = AppState::open(&config).unwrap();
        let found = state.service().find_record(saved.id).await.unwrap();
        assert_eq!(found, Some(saved));
        state.close().unwrap();
    }

    #[test]
    fn test_close_without_subscriptions() {
        let state = AppState::from_manager(DatabaseManager::open_in_memory().unwrap());
        assert_eq!(state.registry().active_count(), 0);
        assert_eq!(state.database().count_records().unwrap(), 0);
        state.close().unwrap();
    }
}
