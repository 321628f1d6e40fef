use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store unreachable: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue publish failed: {0}")]
    Publish(String),

    #[error("Duplicate registry entry: {0}")]
    DuplicateKey(String),

    #[error("Run summary write failed: {0}")]
    SummaryWrite(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
