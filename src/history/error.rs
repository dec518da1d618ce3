use thiserror::Error;

/// Failures surfaced by the async history layer
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
