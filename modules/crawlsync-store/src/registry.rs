use async_trait::async_trait;

use crawlsync_common::{RegistryEntry, SyncError};

use crate::client::{map_sqlx, StoreClient};

/// Registry of URLs discovered as missing from the current run.
/// Insertion is at-most-once-attempted per id per run; a duplicate key
/// surfaces as `SyncError::DuplicateKey` for the caller to skip.
#[async_trait]
pub trait UrlRegistry: Send + Sync {
    async fn insert(&self, entry: &RegistryEntry) -> Result<(), SyncError>;
}

/// Postgres registry over the `url_registry` table (`unique_id` primary key).
pub struct PgUrlRegistry {
    client: StoreClient,
}

impl PgUrlRegistry {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlRegistry for PgUrlRegistry {
    async fn insert(&self, entry: &RegistryEntry) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO url_registry (unique_id, url, category, extra)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.unique_id())
        .bind(entry.url())
        .bind(entry.category())
        .bind(entry.extra())
        .execute(self.client.pool())
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}
