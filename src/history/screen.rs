// History screen: binds live queries to a view

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::HistoryResult;
use super::live::SubscriptionEnd;
use super::presentation::{filter_chips, FilterChip, HistoryPage, Notice};
use super::query::HistoryFilter;
use super::registry::{QueryKind, SubscriptionKey, SubscriptionRegistry};
use super::service::HistoryService;
use crate::database::ScanRecord;

/// Rendering surface for a history screen.
/// Calls arrive from runtime worker threads; implementations must not block.
pub trait HistoryView: Send + Sync + 'static {
    fn render_page(&self, page: HistoryPage);
    fn render_filters(&self, chips: Vec<FilterChip>);
    fn show_notice(&self, notice: Notice);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One open history screen and the subscriptions it owns
pub struct HistoryScreen {
    id: String,
    service: HistoryService,
    registry: SubscriptionRegistry,
    view: Arc<dyn HistoryView>,
    filter: Arc<Mutex<HistoryFilter>>,
    last_index: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    /// Serializes writes of the remembered filter
    persist: tokio::sync::Mutex<()>,
}

impl HistoryScreen {
    /// Open a screen: restore the last filter, then start the tag index and
    /// record subscriptions
    pub async fn open(
        service: HistoryService,
        registry: SubscriptionRegistry,
        view: Arc<dyn HistoryView>,
    ) -> Self {
        let filter = match service.load_settings().await {
            Ok(settings) => HistoryFilter::from_tag(settings.last_filter_tag.as_deref()),
            Err(e) => {
                log::warn!("Failed to restore history filter, showing all scans: {}", e);
                HistoryFilter::All
            }
        };

        let screen = Self {
            id: uuid::Uuid::new_v4().to_string(),
            service,
            registry,
            view,
            filter: Arc::new(Mutex::new(filter.clone())),
            last_index: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            persist: tokio::sync::Mutex::new(()),
        };

        log::info!("Opened history screen {} ({})", screen.id, filter);
        screen.view.render_filters(filter_chips(&[], &filter));
        screen.start_tag_index();
        screen.start_records(filter);
        screen
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_filter(&self) -> HistoryFilter {
        lock(&self.filter).clone()
    }

    /// Switch the record subscription to a new filter and remember it.
    /// Selecting the current filter again is a no-op.
    pub async fn set_filter(&self, filter: HistoryFilter) {
        {
            // Filter and subscription change together; registering replaces
            // (and cancels) the previous record query
            let mut current = lock(&self.filter);
            if *current == filter {
                return;
            }
            *current = filter.clone();

            let index = lock(&self.last_index).clone();
            self.view.render_filters(filter_chips(&index, &filter));
            self.start_records(filter);
        }

        self.persist_current_filter().await;
    }

    /// Store whatever filter is current once the previous write is done,
    /// so the last write always matches the screen
    async fn persist_current_filter(&self) {
        let _guard = self.persist.lock().await;
        let filter = self.current_filter();
        if let Err(e) = self.service.remember_filter(&filter).await {
            log::warn!("Failed to persist history filter {}: {}", filter, e);
        }
    }

    /// Delete a scan and report the outcome to the view.
    /// The list itself refreshes through the live subscription.
    pub async fn delete(&self, id: i64) -> HistoryResult<bool> {
        match self.service.delete_record(id).await {
            Ok(removed) => {
                if !removed {
                    log::debug!("Scan {} was already deleted", id);
                }
                self.view.show_notice(Notice::info("Scan deleted."));
                Ok(removed)
            }
            Err(e) => {
                log::error!("Failed to delete scan {}: {}", id, e);
                self.view.show_notice(Notice::error(format!("Could not delete scan: {}", e)));
                Err(e)
            }
        }
    }

    /// Cancel every subscription of this screen
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancelled = self.registry.cancel_screen(&self.id);
        log::info!("Closed history screen {} ({} subscriptions cancelled)", self.id, cancelled);
    }

    fn key(&self, kind: QueryKind) -> SubscriptionKey {
        SubscriptionKey::new(&self.id, kind)
    }

    fn start_records(&self, filter: HistoryFilter) {
        let view = self.view.clone();
        let current = self.filter.clone();
        let page_filter = filter.clone();

        let emit = move |records: Vec<ScanRecord>| {
            // Pages for a filter the user already left are dropped
            if *lock(&current) != page_filter {
                return;
            }
            view.render_page(HistoryPage::new(page_filter.clone(), records));
        };

        let end_view = self.view.clone();
        let end_current = self.filter.clone();
        let end_filter = filter.clone();
        let closed = self.closed.clone();
        let screen_id = self.id.clone();

        let on_end = move |end: SubscriptionEnd| {
            let superseded = closed.load(Ordering::SeqCst) || *lock(&end_current) != end_filter;
            report_end(&screen_id, QueryKind::Records, end, superseded, end_view.as_ref());
        };

        let live = self.service.watch_records(filter, emit, on_end);
        self.registry.register(self.key(QueryKind::Records), live);
    }

    fn start_tag_index(&self) {
        let view = self.view.clone();
        let current = self.filter.clone();
        let last_index = self.last_index.clone();

        let emit = move |index: Vec<String>| {
            let filter = lock(&current).clone();
            view.render_filters(filter_chips(&index, &filter));
            *lock(&last_index) = index;
        };

        let end_view = self.view.clone();
        let closed = self.closed.clone();
        let screen_id = self.id.clone();

        let on_end = move |end: SubscriptionEnd| {
            let superseded = closed.load(Ordering::SeqCst);
            report_end(&screen_id, QueryKind::TagIndex, end, superseded, end_view.as_ref());
        };

        let live = self.service.watch_tag_index(emit, on_end);
        self.registry.register(self.key(QueryKind::TagIndex), live);
    }
}

impl Drop for HistoryScreen {
    fn drop(&mut self) {
        self.close();
    }
}

fn report_end(
    screen_id: &str,
    kind: QueryKind,
    end: SubscriptionEnd,
    superseded: bool,
    view: &dyn HistoryView,
) {
    match end {
        SubscriptionEnd::Cancelled => {
            log::debug!("{:?} subscription of screen {} cancelled", kind, screen_id);
        }
        SubscriptionEnd::Closed => {
            log::debug!("{:?} subscription of screen {} ended: store closed", kind, screen_id);
        }
        SubscriptionEnd::Failed(e) if superseded => {
            log::debug!("{:?} subscription of screen {} failed after cancel: {}", kind, screen_id, e);
        }
        SubscriptionEnd::Failed(e) => {
            log::error!("{:?} subscription of screen {} failed: {}", kind, screen_id, e);
            view.show_notice(Notice::error(format!("Could not load scan history: {}", e)));
        }
    }
}
