use tracing::{info, warn};

use crawlsync_common::{Record, RecordPatch, RecordStatus, RunContext, SyncError};
use crawlsync_store::MasterPassCounts;

use crate::spec::{ReconcileDeps, ReconcileSpec};
use crate::stats::MasterStats;

/// Page size for the full source scan. Keyset pagination means no
/// server-side cursor exists to expire, however long the pass runs.
const SCAN_PAGE_SIZE: i64 = 500;

/// The write-heavy reconciliation pass: upsert every source record into
/// master, then mark master records absent from the source stale.
///
/// The stale sweep runs after the scan completes, as a separate pass, so
/// records inserted during the scan are never re-evaluated against the
/// same run. Per-record write failures here are not isolated; a failed
/// master write aborts the pass and the run is simply repeated.
pub struct UpdateMaster<'a> {
    deps: &'a ReconcileDeps,
    spec: &'a ReconcileSpec,
    ctx: &'a RunContext,
}

impl<'a> UpdateMaster<'a> {
    pub fn new(deps: &'a ReconcileDeps, spec: &'a ReconcileSpec, ctx: &'a RunContext) -> Self {
        Self { deps, spec, ctx }
    }

    pub async fn run(&self) -> Result<MasterStats, SyncError> {
        let source = self.spec.source_partition(self.ctx).name();
        let master = self.spec.master_partition().name();

        let mut stats = MasterStats::default();
        let mut after: Option<String> = None;
        let mut shape_checked = self.spec.attributes.is_empty();

        loop {
            let page = self
                .deps
                .records
                .scan_page(&source, after.as_deref(), SCAN_PAGE_SIZE)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            if !shape_checked {
                // Required attributes are checked against the first observed
                // source record, before any master write.
                self.spec.attributes.validate_against(&page[0])?;
                shape_checked = true;
            }
            after = Some(last.unique_id.clone());

            for item in &page {
                match self.deps.records.find_one(&master, &item.unique_id).await? {
                    Some(_) => {
                        let patch = RecordPatch {
                            status: RecordStatus::Ok,
                            run_id: self.ctx.run_id,
                            record_url: item.record_url.clone(),
                            extras: self.spec.attributes.copy_from(&item.extras),
                        };
                        self.deps
                            .records
                            .update_one(&master, &item.unique_id, &patch)
                            .await?;
                        stats.updated += 1;
                    }
                    None => {
                        let record = Record {
                            unique_id: item.unique_id.clone(),
                            record_url: item.record_url.clone(),
                            status: RecordStatus::Ok,
                            run_id: Some(self.ctx.run_id),
                            extras: self.spec.attributes.copy_from(&item.extras),
                        };
                        self.deps.records.insert_one(&master, &record).await?;
                        stats.inserted += 1;
                    }
                }
            }
        }

        // Stale sweep: everything in master the source scan did not cover.
        let source_ids = self.deps.records.distinct_ids(&source, None).await?;
        let master_ids = self.deps.records.distinct_ids(&master, None).await?;
        let mut stale: Vec<String> = master_ids.difference(&source_ids).cloned().collect();
        stale.sort();
        stats.stale = self
            .deps
            .records
            .set_status_many(&master, &stale, RecordStatus::Stale)
            .await?;

        stats.total_records = self.deps.records.estimated_count(&master).await?;

        let counts = MasterPassCounts {
            updated: stats.updated,
            new_records: stats.inserted,
            not_found: stats.stale,
            total_records: stats.total_records,
        };
        if let Err(e) = self
            .deps
            .summaries
            .record_master_pass(&self.spec.site, &counts)
            .await
        {
            warn!(error = %e, "Failed to write run summary");
        }

        info!(
            updated = stats.updated,
            inserted = stats.inserted,
            stale = stats.stale,
            total = stats.total_records,
            site = self.spec.site.as_str(),
            "Master partition reconciled"
        );

        Ok(stats)
    }
}
