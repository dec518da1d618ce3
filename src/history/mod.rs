// Scan history: filtered live queries and the screen that presents them

pub mod error;
pub mod live;
pub mod presentation;
pub mod query;
pub mod registry;
pub mod screen;
pub mod service;

pub use error::{HistoryError, HistoryResult};
pub use live::{LiveQuery, SubscriptionEnd};
pub use presentation::{
    filter_chips, saved_message, FilterChip, HistoryPage, Notice, NoticeKind, RecordCard,
};
pub use query::HistoryFilter;
pub use registry::{QueryKind, SubscriptionKey, SubscriptionRegistry};
pub use screen::{HistoryScreen, HistoryView};
pub use service::HistoryService;
