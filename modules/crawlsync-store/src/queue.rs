use async_trait::async_trait;
use sqlx::PgPool;

use crawlsync_common::SyncError;

use crate::client::StoreClient;

/// At-least-once handoff of missing-record payloads for re-fetch.
/// The queue name is static configuration; a transport failure for one
/// payload surfaces as `SyncError::Publish` for the caller to skip.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, payload: &[u8]) -> Result<(), SyncError>;
}

/// PGMQ publisher. Messages ride the same Postgres the record store uses,
/// via the pgmq extension's SQL API.
pub struct PgmqPublisher {
    pool: PgPool,
    queue: String,
}

impl PgmqPublisher {
    /// Ensure the extension and queue exist, then hand back a publisher.
    /// An unreachable queue at construction is fatal for the run.
    pub async fn new(client: &StoreClient, queue: &str) -> Result<Self, SyncError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS pgmq CASCADE")
            .execute(client.pool())
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue)
            .execute(client.pool())
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        Ok(Self {
            pool: client.pool().clone(),
            queue: queue.to_string(),
        })
    }
}

#[async_trait]
impl QueuePublisher for PgmqPublisher {
    async fn publish(&self, payload: &[u8]) -> Result<(), SyncError> {
        let body = std::str::from_utf8(payload)
            .map_err(|e| SyncError::Publish(format!("payload is not valid UTF-8: {e}")))?;
        sqlx::query("SELECT pgmq.send($1, $2::jsonb)")
            .bind(&self.queue)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Publish(e.to_string()))?;
        Ok(())
    }
}
