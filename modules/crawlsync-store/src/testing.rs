//! Test doubles for the store traits.
//!
//! Four in-memory implementations matching the four trait boundaries:
//! - MemoryRecordStore (RecordStore) — seedable BTreeMap partitions
//! - MemoryQueue (QueuePublisher) — captures payloads, per-id failure injection
//! - MemoryRegistry (UrlRegistry) — duplicate-key emulation
//! - MemorySummaries (SummaryStore) — last-write-wins rows, failure injection
//!
//! No network, no database, no Docker. `cargo test` in seconds.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crawlsync_common::{
    MissingRecord, Record, RecordPatch, RecordStatus, RegistryEntry, RunSummary, SyncError,
};

use crate::queue::QueuePublisher;
use crate::records::RecordStore;
use crate::registry::UrlRegistry;
use crate::summary::{MasterPassCounts, SummaryStore};

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

/// Stateful in-memory record store. Builder pattern: `.with_records()`.
#[derive(Default)]
pub struct MemoryRecordStore {
    partitions: Mutex<BTreeMap<String, BTreeMap<String, Record>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, partition: &str, records: Vec<Record>) -> Self {
        {
            let mut partitions = self.partitions.lock().unwrap();
            let slot = partitions.entry(partition.to_string()).or_default();
            for record in records {
                slot.insert(record.unique_id.clone(), record);
            }
        }
        self
    }

    /// Snapshot of one partition, ordered by id.
    pub fn partition(&self, partition: &str) -> Vec<Record> {
        self.partitions
            .lock()
            .unwrap()
            .get(partition)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn record(&self, partition: &str, unique_id: &str) -> Option<Record> {
        self.partitions
            .lock()
            .unwrap()
            .get(partition)
            .and_then(|p| p.get(unique_id).cloned())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn distinct_ids(
        &self,
        partition: &str,
        status: Option<RecordStatus>,
    ) -> Result<HashSet<String>, SyncError> {
        let partitions = self.partitions.lock().unwrap();
        let Some(records) = partitions.get(partition) else {
            return Ok(HashSet::new());
        };
        Ok(records
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.unique_id.clone())
            .collect())
    }

    async fn find_by_ids(
        &self,
        partition: &str,
        ids: &[String],
    ) -> Result<Vec<MissingRecord>, SyncError> {
        let partitions = self.partitions.lock().unwrap();
        let Some(records) = partitions.get(partition) else {
            return Ok(Vec::new());
        };
        // BTreeMap iteration keeps the result ordered by id.
        Ok(records
            .values()
            .filter(|r| ids.contains(&r.unique_id))
            .map(|r| MissingRecord {
                unique_id: r.unique_id.clone(),
                record_url: r.record_url.clone(),
            })
            .collect())
    }

    async fn scan_page(
        &self,
        partition: &str,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Record>, SyncError> {
        let partitions = self.partitions.lock().unwrap();
        let Some(records) = partitions.get(partition) else {
            return Ok(Vec::new());
        };
        Ok(records
            .values()
            .filter(|r| after.map_or(true, |a| r.unique_id.as_str() > a))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_one(
        &self,
        partition: &str,
        unique_id: &str,
    ) -> Result<Option<Record>, SyncError> {
        Ok(self.record(partition, unique_id))
    }

    async fn update_one(
        &self,
        partition: &str,
        unique_id: &str,
        patch: &RecordPatch,
    ) -> Result<(), SyncError> {
        let mut partitions = self.partitions.lock().unwrap();
        let record = partitions
            .get_mut(partition)
            .and_then(|p| p.get_mut(unique_id))
            .ok_or_else(|| {
                SyncError::Database(format!("no record {unique_id} in {partition}"))
            })?;
        record.status = patch.status;
        record.run_id = Some(patch.run_id);
        record.record_url = patch.record_url.clone();
        for (name, value) in &patch.extras {
            record.extras.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn insert_one(&self, partition: &str, record: &Record) -> Result<(), SyncError> {
        let mut partitions = self.partitions.lock().unwrap();
        let slot = partitions.entry(partition.to_string()).or_default();
        if slot.contains_key(&record.unique_id) {
            return Err(SyncError::DuplicateKey(record.unique_id.clone()));
        }
        slot.insert(record.unique_id.clone(), record.clone());
        Ok(())
    }

    async fn set_status_many(
        &self,
        partition: &str,
        ids: &[String],
        status: RecordStatus,
    ) -> Result<u64, SyncError> {
        let mut partitions = self.partitions.lock().unwrap();
        let Some(records) = partitions.get_mut(partition) else {
            return Ok(0);
        };
        let mut touched = 0;
        for id in ids {
            if let Some(record) = records.get_mut(id) {
                record.status = status;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn estimated_count(&self, partition: &str) -> Result<u64, SyncError> {
        let partitions = self.partitions.lock().unwrap();
        Ok(partitions.get(partition).map_or(0, |p| p.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// MemoryQueue
// ---------------------------------------------------------------------------

/// Captures published payloads. `.fail_for()` makes any payload containing
/// the given fragment fail with a publish error.
#[derive(Default)]
pub struct MemoryQueue {
    published: Mutex<Vec<Vec<u8>>>,
    fail_fragments: Mutex<Vec<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(self, fragment: &str) -> Self {
        self.fail_fragments.lock().unwrap().push(fragment.to_string());
        self
    }

    /// Published payloads decoded as JSON, in publish order.
    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| serde_json::from_slice(p).ok())
            .collect()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl QueuePublisher for MemoryQueue {
    async fn publish(&self, payload: &[u8]) -> Result<(), SyncError> {
        let text = String::from_utf8_lossy(payload);
        for fragment in self.fail_fragments.lock().unwrap().iter() {
            if text.contains(fragment.as_str()) {
                return Err(SyncError::Publish(format!(
                    "injected transport failure for payload containing {fragment}"
                )));
            }
        }
        self.published.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Id-unique registry keeping full entries for shape assertions.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: Mutex<BTreeMap<String, RegistryEntry>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, unique_id: &str) -> Option<RegistryEntry> {
        self.entries.lock().unwrap().get(unique_id).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl UrlRegistry for MemoryRegistry {
    async fn insert(&self, entry: &RegistryEntry) -> Result<(), SyncError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(entry.unique_id()) {
            return Err(SyncError::DuplicateKey(entry.unique_id().to_string()));
        }
        entries.insert(entry.unique_id().to_string(), entry.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemorySummaries
// ---------------------------------------------------------------------------

/// Last-write-wins summary rows. `.fail_writes()` makes every write fail,
/// for exercising the best-effort policy.
#[derive(Default)]
pub struct MemorySummaries {
    rows: Mutex<BTreeMap<String, RunSummary>>,
    fail_writes: Mutex<bool>,
}

impl MemorySummaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(self) -> Self {
        *self.fail_writes.lock().unwrap() = true;
        self
    }

    pub fn summary(&self, site: &str) -> Option<RunSummary> {
        self.rows.lock().unwrap().get(site).cloned()
    }

    fn check_injected_failure(&self) -> Result<(), SyncError> {
        if *self.fail_writes.lock().unwrap() {
            Err(SyncError::SummaryWrite(
                "injected summary write failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SummaryStore for MemorySummaries {
    async fn record_missing(&self, site: &str, missing_count: u64) -> Result<(), SyncError> {
        self.check_injected_failure()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(site.to_string()).or_insert_with(|| RunSummary {
            site: site.to_string(),
            ..RunSummary::default()
        });
        row.missing_count = missing_count;
        Ok(())
    }

    async fn record_master_pass(
        &self,
        site: &str,
        counts: &MasterPassCounts,
    ) -> Result<(), SyncError> {
        self.check_injected_failure()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(site.to_string()).or_insert_with(|| RunSummary {
            site: site.to_string(),
            ..RunSummary::default()
        });
        row.updated = counts.updated;
        row.new_records = counts.new_records;
        row.not_found = counts.not_found;
        row.total_records = counts.total_records;
        Ok(())
    }
}
