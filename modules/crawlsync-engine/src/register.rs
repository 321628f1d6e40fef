use tracing::{info, warn};

use crawlsync_common::{RegistryEntry, RunContext, SyncError};

use crate::diff;
use crate::spec::{ReconcileDeps, ReconcileSpec};
use crate::stats::{ItemFailure, RegisterStats};

/// Inserts a registry entry for each missing record. The entry shape
/// depends on whether this run's site is the designated primary site.
/// Duplicate keys and other per-record insert failures are logged and
/// skipped; an unreachable store still aborts the pass.
pub struct RegisterMissing<'a> {
    deps: &'a ReconcileDeps,
    spec: &'a ReconcileSpec,
    ctx: &'a RunContext,
}

impl<'a> RegisterMissing<'a> {
    pub fn new(deps: &'a ReconcileDeps, spec: &'a ReconcileSpec, ctx: &'a RunContext) -> Self {
        Self { deps, spec, ctx }
    }

    pub async fn run(&self) -> Result<RegisterStats, SyncError> {
        let source = self.spec.source_partition(self.ctx).name();
        let master = self.spec.master_partition().name();

        let missing =
            diff::missing_records(self.deps.records.as_ref(), &source, &master, self.spec.mode)
                .await?;
        info!(
            count = missing.len(),
            site = self.spec.site.as_str(),
            "Missing record count"
        );

        let mut stats = RegisterStats {
            missing: missing.len() as u64,
            ..RegisterStats::default()
        };
        let mut failures: Vec<ItemFailure> = Vec::new();

        for record in &missing {
            let entry = RegistryEntry::new(
                self.spec.is_primary_site,
                record.unique_id.clone(),
                record.record_url.clone(),
            );
            match self.deps.registry.insert(&entry).await {
                Ok(()) => stats.inserted += 1,
                Err(SyncError::DuplicateKey(_)) => {
                    stats.duplicates += 1;
                    info!(
                        unique_id = record.unique_id.as_str(),
                        "URL already registered, skipping"
                    );
                }
                Err(e @ SyncError::Connection(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        unique_id = record.unique_id.as_str(),
                        error = %e,
                        "Failed to insert URL"
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
                "Some missing records could not be registered"
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
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            failed = stats.failed,
            site = self.spec.site.as_str(),
            "Missing records registered"
        );

        Ok(stats)
    }
}
