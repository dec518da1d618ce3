//! Live queries: re-run a read whenever the store commits a change
//!
//! A live query emits its current result straight away and again after every
//! insert or delete, until its `CancellationToken` fires or the store goes away.
//! The change counter is marked as seen *before* each read so that a write
//! racing with the read still schedules another pass.
//!
//! The task only holds a weak reference to the store between reads, so dropping
//! the last `Arc<DatabaseManager>` ends every live query with `Closed`.

use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::HistoryError;
use crate::database::DatabaseManager;

/// Why a live query stopped emitting
#[derive(Debug)]
pub enum SubscriptionEnd {
    /// Cancelled by its owner (filter change, screen closed). Not an error.
    Cancelled,
    /// The store shut down
    Closed,
    Failed(HistoryError),
}

impl SubscriptionEnd {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Drive a live query until it is cancelled, the store closes or a read fails.
pub async fn run_live_query<T, Q, E>(
    db: Weak<DatabaseManager>,
    token: CancellationToken,
    query: Q,
    mut emit: E,
) -> SubscriptionEnd
where
    T: Send + 'static,
    Q: Fn(&DatabaseManager) -> anyhow::Result<T> + Send + Sync + 'static,
    E: FnMut(T) + Send,
{
    let query = Arc::new(query);
    let mut changes = match db.upgrade() {
        Some(db) => db.subscribe_changes(),
        None => return SubscriptionEnd::Closed,
    };

    loop {
        let version = *changes.borrow_and_update();

        let Some(read_db) = db.upgrade() else {
            return SubscriptionEnd::Closed;
        };
        let read = Arc::clone(&query);
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return SubscriptionEnd::Cancelled,
            joined = tokio::task::spawn_blocking(move || (*read)(read_db.as_ref())) => joined,
        };

        let value = match fetched {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => return SubscriptionEnd::Failed(HistoryError::Storage(e)),
            Err(e) => return SubscriptionEnd::Failed(HistoryError::TaskJoin(e)),
        };

        // A result computed for a cancelled owner is dropped, not delivered
        if token.is_cancelled() {
            return SubscriptionEnd::Cancelled;
        }
        log::trace!("Live query emitting for store version {}", version);
        emit(value);

        tokio::select! {
            biased;
            _ = token.cancelled() => return SubscriptionEnd::Cancelled,
            changed = changes.changed() => {
                if changed.is_err() {
                    return SubscriptionEnd::Closed;
                }
            }
        }
    }
}

/// A spawned live query and the token that stops it
pub struct LiveQuery {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LiveQuery {
    /// Spawn a live query on the current tokio runtime. `on_end` runs once
    /// with the reason the query stopped.
    pub fn spawn<T, Q, E, F>(db: Arc<DatabaseManager>, query: Q, emit: E, on_end: F) -> Self
    where
        T: Send + 'static,
        Q: Fn(&DatabaseManager) -> anyhow::Result<T> + Send + Sync + 'static,
        E: FnMut(T) + Send + 'static,
        F: FnOnce(SubscriptionEnd) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let db = Arc::downgrade(&db);
        let handle = tokio::spawn(async move {
            let end = run_live_query(db, task_token, query, emit).await;
            on_end(end);
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for the task to finish (after cancelling it, typically)
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            log::warn!("Live query task ended abnormally: {}", e);
        }
    }
}
