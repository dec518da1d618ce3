//! Subscription registry - tracks the live queries each screen owns

use dashmap::DashMap;
use std::sync::Arc;

use super::live::LiveQuery;

/// What a subscription feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Records,
    TagIndex,
}

/// One slot per screen and query kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub screen_id: String,
    pub kind: QueryKind,
}

impl SubscriptionKey {
    pub fn new(screen_id: &str, kind: QueryKind) -> Self {
        Self {
            screen_id: screen_id.to_string(),
            kind,
        }
    }
}

/// Registry of active live queries, keyed by screen and query kind.
/// Registering into an occupied slot cancels the query it replaces.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    queries: Arc<DashMap<SubscriptionKey, LiveQuery>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live query, cancelling any previous one in the same slot
    pub fn register(&self, key: SubscriptionKey, query: LiveQuery) {
        if let Some(previous) = self.queries.insert(key.clone(), query) {
            previous.cancel();
            log::debug!("Replaced {:?} subscription for screen {}", key.kind, key.screen_id);
        }
    }

    /// Cancel and remove one subscription
    pub fn cancel(&self, key: &SubscriptionKey) -> bool {
        self.queries
            .remove(key)
            .map(|(_, query)| query.cancel())
            .is_some()
    }

    /// Cancel and remove every subscription of a screen
    pub fn cancel_screen(&self, screen_id: &str) -> usize {
        let keys: Vec<SubscriptionKey> = self.queries
            .iter()
            .filter(|entry| entry.key().screen_id == screen_id)
            .map(|entry| entry.key().clone())
            .collect();

        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Cancel everything (store shutdown)
    pub fn cancel_all(&self) -> usize {
        let keys: Vec<SubscriptionKey> = self.queries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Whether the slot holds a query that is still running
    pub fn is_active(&self, key: &SubscriptionKey) -> bool {
        self.queries
            .get(key)
            .map(|query| !query.is_cancelled() && !query.is_finished())
            .unwrap_or(false)
    }

    /// Number of registered queries that are still running
    pub fn active_count(&self) -> usize {
        self.queries
            .iter()
            .filter(|entry| !entry.is_cancelled() && !entry.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;

    fn spawn_count_query(db: &Arc<DatabaseManager>) -> LiveQuery {
        LiveQuery::spawn(db.clone(), |db: &DatabaseManager| db.count_records(), |_| {}, |_| {})
    }

    #[tokio::test]
    async fn test_register_replaces_and_cancels_previous() {
        let db = Arc::new(DatabaseManager::open_in_memory().unwrap());
        let registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("screen-1", QueryKind::Records);

        let first = spawn_count_query(&db);
        let first_token = first.token().clone();
        registry.register(key.clone(), first);
        assert!(registry.is_active(&key));

        let second = spawn_count_query(&db);
        let second_token = second.token().clone();
        registry.register(key.clone(), second);

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_screen_only_touches_that_screen() {
        let db = Arc::new(DatabaseManager::open_in_memory().unwrap());
        let registry = SubscriptionRegistry::new();

        let a_records = spawn_count_query(&db);
        let a_token = a_records.token().clone();
        registry.register(SubscriptionKey::new("a", QueryKind::Records), a_records);
        registry.register(SubscriptionKey::new("a", QueryKind::TagIndex), spawn_count_query(&db));

        let b_records = spawn_count_query(&db);
        let b_token = b_records.token().clone();
        registry.register(SubscriptionKey::new("b", QueryKind::Records), b_records);

        assert_eq!(registry.cancel_screen("a"), 2);
        assert!(a_token.is_cancelled());
        assert!(!b_token.is_cancelled());
        assert_eq!(registry.cancel_screen("a"), 0);

        assert_eq!(registry.cancel_all(), 1);
        assert!(b_token.is_cancelled());
        assert_eq!(registry.active_count(), 0);
    }
}
