use async_trait::async_trait;

use crawlsync_common::SyncError;

use crate::client::StoreClient;

/// Counters from one master-update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasterPassCounts {
    pub updated: u64,
    pub new_records: u64,
    pub not_found: u64,
    pub total_records: u64,
}

/// Best-effort per-site run telemetry. One row per site, overwritten on
/// each run; a failed write degrades to a warning at the call site and
/// never blocks the primary outcome.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn record_missing(&self, site: &str, missing_count: u64) -> Result<(), SyncError>;

    async fn record_master_pass(
        &self,
        site: &str,
        counts: &MasterPassCounts,
    ) -> Result<(), SyncError>;
}

/// Postgres summary store over the `run_summaries` table.
pub struct PgSummaryStore {
    client: StoreClient,
}

impl PgSummaryStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    async fn record_missing(&self, site: &str, missing_count: u64) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO run_summaries (site, missing_count)
             VALUES ($1, $2)
             ON CONFLICT (site) DO UPDATE
             SET missing_count = EXCLUDED.missing_count, recorded_at = now()",
        )
        .bind(site)
        .bind(missing_count as i64)
        .execute(self.client.pool())
        .await
        .map_err(|e| SyncError::SummaryWrite(e.to_string()))?;
        Ok(())
    }

    async fn record_master_pass(
        &self,
        site: &str,
        counts: &MasterPassCounts,
    ) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO run_summaries (site, updated, new_records, not_found, total_records)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (site) DO UPDATE
             SET updated = EXCLUDED.updated,
                 new_records = EXCLUDED.new_records,
                 not_found = EXCLUDED.not_found,
                 total_records = EXCLUDED.total_records,
                 recorded_at = now()",
        )
        .bind(site)
        .bind(counts.updated as i64)
        .bind(counts.new_records as i64)
        .bind(counts.not_found as i64)
        .bind(counts.total_records as i64)
        .execute(self.client.pool())
        .await
        .map_err(|e| SyncError::SummaryWrite(e.to_string()))?;
        Ok(())
    }
}
