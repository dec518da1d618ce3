// Async facade over the record store
// Every storage call runs on the blocking pool so callers never stall a runtime thread

use std::sync::Arc;

use super::error::HistoryResult;
use super::live::{LiveQuery, SubscriptionEnd};
use super::query::HistoryFilter;
use crate::database::{
    DatabaseManager, HistorySettings, NewScanRecord, ScanRecord, Setting, TagUsage,
};

#[derive(Clone)]
pub struct HistoryService {
    db: Arc<DatabaseManager>,
}

impl HistoryService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> Arc<DatabaseManager> {
        self.db.clone()
    }

    async fn run_blocking<T, F>(&self, f: F) -> HistoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatabaseManager) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        let value = tokio::task::spawn_blocking(move || f(db.as_ref())).await??;
        Ok(value)
    }

    /// Save a scan; resolves once the row is committed
    pub async fn save_record(&self, record: NewScanRecord) -> HistoryResult<ScanRecord> {
        self.run_blocking(move |db| db.insert_record(&record)).await
    }

    /// Delete a scan; `false` if it was already gone
    pub async fn delete_record(&self, id: i64) -> HistoryResult<bool> {
        self.run_blocking(move |db| db.delete_record(id)).await
    }

    pub async fn find_record(&self, id: i64) -> HistoryResult<Option<ScanRecord>> {
        self.run_blocking(move |db| db.get_record(id)).await
    }

    /// One-shot filtered query, newest first
    pub async fn records(&self, filter: HistoryFilter) -> HistoryResult<Vec<ScanRecord>> {
        self.run_blocking(move |db| filter.fetch(db)).await
    }

    pub async fn tag_index(&self) -> HistoryResult<Vec<String>> {
        self.run_blocking(|db| db.get_tag_index()).await
    }

    pub async fn tag_usage(&self) -> HistoryResult<Vec<TagUsage>> {
        self.run_blocking(|db| db.get_tag_usage()).await
    }

    pub async fn count_records(&self) -> HistoryResult<i64> {
        self.run_blocking(|db| db.count_records()).await
    }

    pub async fn load_settings(&self) -> HistoryResult<HistorySettings> {
        self.run_blocking(|db| db.load_history_settings()).await
    }

    /// Every stored preference, ordered by key
    pub async fn settings(&self) -> HistoryResult<Vec<Setting>> {
        self.run_blocking(|db| db.get_all_settings_list()).await
    }

    pub async fn remember_filter(&self, filter: &HistoryFilter) -> HistoryResult<()> {
        let tag = filter.tag().map(str::to_string);
        self.run_blocking(move |db| db.save_last_filter_tag(tag.as_deref())).await
    }

    /// Live filtered query: emits now and after every store change
    pub fn watch_records<E, F>(&self, filter: HistoryFilter, emit: E, on_end: F) -> LiveQuery
    where
        E: FnMut(Vec<ScanRecord>) + Send + 'static,
        F: FnOnce(SubscriptionEnd) + Send + 'static,
    {
        log::debug!("Starting live record query ({})", filter);
        LiveQuery::spawn(self.db.clone(), move |db: &DatabaseManager| filter.fetch(db), emit, on_end)
    }

    /// Live tag index: emits now and after every store change
    pub fn watch_tag_index<E, F>(&self, emit: E, on_end: F) -> LiveQuery
    where
        E: FnMut(Vec<String>) + Send + 'static,
        F: FnOnce(SubscriptionEnd) + Send + 'static,
    {
        LiveQuery::spawn(self.db.clone(), |db: &DatabaseManager| db.get_tag_index(), emit, on_end)
    }
}
