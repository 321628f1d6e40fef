use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crawlsync_common::{MissingRecord, Record, RecordPatch, RecordStatus, SyncError};

use crate::client::{map_sqlx, StoreClient};

/// Store interface consumed by the reconciliation engine. One method set
/// serves both source and master partitions; the partition key scopes
/// every query.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Distinct record ids in a partition, optionally restricted to one
    /// reconciled status.
    async fn distinct_ids(
        &self,
        partition: &str,
        status: Option<RecordStatus>,
    ) -> Result<HashSet<String>, SyncError>;

    /// Id/url pairs for the given ids, ordered by id.
    async fn find_by_ids(
        &self,
        partition: &str,
        ids: &[String],
    ) -> Result<Vec<MissingRecord>, SyncError>;

    /// One page of a full partition scan, keyed after the given id.
    /// Keyset pagination keeps long scans free of server-side cursors,
    /// so iteration never expires mid-pass.
    async fn scan_page(
        &self,
        partition: &str,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Record>, SyncError>;

    async fn find_one(
        &self,
        partition: &str,
        unique_id: &str,
    ) -> Result<Option<Record>, SyncError>;

    /// Apply a patch to one record. Unpatched columns are untouched and
    /// extras merge into the stored mapping.
    async fn update_one(
        &self,
        partition: &str,
        unique_id: &str,
        patch: &RecordPatch,
    ) -> Result<(), SyncError>;

    async fn insert_one(&self, partition: &str, record: &Record) -> Result<(), SyncError>;

    /// Bulk status transition. Returns the number of records touched.
    async fn set_status_many(
        &self,
        partition: &str,
        ids: &[String],
        status: RecordStatus,
    ) -> Result<u64, SyncError>;

    async fn estimated_count(&self, partition: &str) -> Result<u64, SyncError>;
}

/// Postgres-backed record store over a single `records` table keyed
/// (partition, unique_id).
pub struct PgRecordStore {
    client: StoreClient,
}

impl PgRecordStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    unique_id: String,
    record_url: String,
    status: String,
    run_id: Option<Uuid>,
    extras: serde_json::Value,
}

impl RecordRow {
    fn into_record(self) -> Result<Record, SyncError> {
        let status = self
            .status
            .parse::<RecordStatus>()
            .map_err(SyncError::Database)?;
        let extras: BTreeMap<String, String> = match self.extras {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, value)
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        Ok(Record {
            unique_id: self.unique_id,
            record_url: self.record_url,
            status,
            run_id: self.run_id,
            extras,
        })
    }
}

fn extras_json(extras: &BTreeMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        extras
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    )
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn distinct_ids(
        &self,
        partition: &str,
        status: Option<RecordStatus>,
    ) -> Result<HashSet<String>, SyncError> {
        let ids: Vec<String> = match status {
            None => {
                sqlx::query_scalar(
                    "SELECT DISTINCT unique_id FROM records WHERE partition = $1",
                )
                .bind(partition)
                .fetch_all(self.client.pool())
                .await
            }
            Some(status) => {
                sqlx::query_scalar(
                    "SELECT DISTINCT unique_id FROM records
                     WHERE partition = $1 AND status = $2",
                )
                .bind(partition)
                .bind(status.as_str())
                .fetch_all(self.client.pool())
                .await
            }
        }
        .map_err(map_sqlx)?;

        Ok(ids.into_iter().collect())
    }

    async fn find_by_ids(
        &self,
        partition: &str,
        ids: &[String],
    ) -> Result<Vec<MissingRecord>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT unique_id, record_url FROM records
             WHERE partition = $1 AND unique_id = ANY($2)
             ORDER BY unique_id",
        )
        .bind(partition)
        .bind(ids)
        .fetch_all(self.client.pool())
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(unique_id, record_url)| MissingRecord {
                unique_id,
                record_url,
            })
            .collect())
    }

    async fn scan_page(
        &self,
        partition: &str,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Record>, SyncError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT unique_id, record_url, status, run_id, extras FROM records
             WHERE partition = $1 AND ($2::text IS NULL OR unique_id > $2)
             ORDER BY unique_id
             LIMIT $3",
        )
        .bind(partition)
        .bind(after)
        .bind(limit)
        .fetch_all(self.client.pool())
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn find_one(
        &self,
        partition: &str,
        unique_id: &str,
    ) -> Result<Option<Record>, SyncError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT unique_id, record_url, status, run_id, extras FROM records
             WHERE partition = $1 AND unique_id = $2",
        )
        .bind(partition)
        .bind(unique_id)
        .fetch_optional(self.client.pool())
        .await
        .map_err(map_sqlx)?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn update_one(
        &self,
        partition: &str,
        unique_id: &str,
        patch: &RecordPatch,
    ) -> Result<(), SyncError> {
        sqlx::query(
            "UPDATE records
             SET status = $3, run_id = $4, record_url = $5,
                 extras = extras || $6, updated_at = now()
             WHERE partition = $1 AND unique_id = $2",
        )
        .bind(partition)
        .bind(unique_id)
        .bind(patch.status.as_str())
        .bind(patch.run_id)
        .bind(&patch.record_url)
        .bind(extras_json(&patch.extras))
        .execute(self.client.pool())
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn insert_one(&self, partition: &str, record: &Record) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO records (partition, unique_id, record_url, status, run_id, extras)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(partition)
        .bind(&record.unique_id)
        .bind(&record.record_url)
        .bind(record.status.as_str())
        .bind(record.run_id)
        .bind(extras_json(&record.extras))
        .execute(self.client.pool())
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_status_many(
        &self,
        partition: &str,
        ids: &[String],
        status: RecordStatus,
    ) -> Result<u64, SyncError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE records SET status = $3, updated_at = now()
             WHERE partition = $1 AND unique_id = ANY($2)",
        )
        .bind(partition)
        .bind(ids)
        .bind(status.as_str())
        .execute(self.client.pool())
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn estimated_count(&self, partition: &str) -> Result<u64, SyncError> {
        // The partition column is indexed; an exact count stands in for the
        // planner estimate the summary row reports.
        let count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM records WHERE partition = $1")
                .bind(partition)
                .fetch_one(self.client.pool())
                .await
                .map_err(map_sqlx)?;
        Ok(count as u64)
    }
}
