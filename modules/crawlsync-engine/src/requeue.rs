use tracing::{info, warn};

use crawlsync_common::{RequeueMessage, RunContext, SyncError};

use crate::diff;
use crate::spec::{ReconcileDeps, ReconcileSpec};
use crate::stats::{ItemFailure, RequeueStats};

/// Publishes each missing record to the re-fetch queue. A failed publish
/// is isolated to its record; the run summary is written regardless of
/// publish outcomes.
pub struct RequeueMissing<'a> {
    deps: &'a ReconcileDeps,
    spec: &'a ReconcileSpec,
    ctx: &'a RunContext,
}

impl<'a> RequeueMissing<'a> {
    pub fn new(deps: &'a ReconcileDeps, spec: &'a ReconcileSpec, ctx: &'a RunContext) -> Self {
        Self { deps, spec, ctx }
    }

    pub async fn run(&self) -> Result<RequeueStats, SyncError> {
        let source = self.spec.source_partition(self.ctx).name();
        let master = self.spec.master_partition().name();

        let missing =
            diff::missing_records(self.deps.records.as_ref(), &source, &master, self.spec.mode)
                .await?;
        info!(
            count = missing.len(),
            site = self.spec.site.as_str(),
            "Missing record count for queuing"
        );

        let mut stats = RequeueStats {
            missing: missing.len() as u64,
            ..RequeueStats::default()
        };
        let mut failures: Vec<ItemFailure> = Vec::new();

        for record in &missing {
            let message = RequeueMessage {
                record_url: record.record_url.clone(),
                unique_id: record.unique_id.clone(),
            };
            let result = match serde_json::to_vec(&message) {
                Ok(payload) => self.deps.queue.publish(&payload).await,
                Err(e) => Err(SyncError::Publish(e.to_string())),
            };
            match result {
                Ok(()) => stats.published += 1,
                Err(e) => {
                    warn!(
                        unique_id = record.unique_id.as_str(),
                        error = %e,
                        "Failed to queue record"
                    );
                    failures.push(ItemFailure {
                        unique_id: record.unique_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        stats.failed = failures.len() as u64;
        if !failures.is_empty() {
            warn!(
                failed = failures.len(),
                total = missing.len(),
                details = ?failures,
                "Some missing records could not be queued"
            );
        }

        if let Err(e) = self
            .deps
            .summaries
            .record_missing(&self.spec.site, stats.missing)
            .await
        {
            warn!(error = %e, "Failed to write run summary");
        }

        info!(
            missing = stats.missing,
            published = stats.published,
            failed = stats.failed,
            site = self.spec.site.as_str(),
            "Missing records queued"
        );

        Ok(stats)
    }
}
