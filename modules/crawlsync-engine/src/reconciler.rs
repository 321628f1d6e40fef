use std::fmt;

use tracing::info;

use crawlsync_common::{RunContext, SyncError};

use crate::master::UpdateMaster;
use crate::register::RegisterMissing;
use crate::requeue::RequeueMissing;
use crate::spec::{ReconcileDeps, ReconcileSpec};
use crate::stats::{MasterStats, RegisterStats, RequeueStats};

/// Which reconciliation action to apply to the computed missing set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Publish missing records to the re-fetch queue.
    Requeue,
    /// Insert missing-record URLs into the registry.
    Register,
    /// Upsert master from the source partition and mark absentees stale.
    UpdateMaster,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Requeue => write!(f, "requeue"),
            Strategy::Register => write!(f, "register"),
            Strategy::UpdateMaster => write!(f, "update_master"),
        }
    }
}

/// Counters from whichever pass ran.
#[derive(Debug)]
pub enum RunOutcome {
    Requeue(RequeueStats),
    Register(RegisterStats),
    Master(MasterStats),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Requeue(stats) => fmt::Display::fmt(stats, f),
            RunOutcome::Register(stats) => fmt::Display::fmt(stats, f),
            RunOutcome::Master(stats) => fmt::Display::fmt(stats, f),
        }
    }
}

/// Drives one reconciliation pass over one site's partitions.
pub struct Reconciler {
    deps: ReconcileDeps,
    spec: ReconcileSpec,
    ctx: RunContext,
}

impl Reconciler {
    pub fn new(deps: ReconcileDeps, spec: ReconcileSpec, ctx: RunContext) -> Self {
        Self { deps, spec, ctx }
    }

    pub async fn run(&self, strategy: Strategy) -> Result<RunOutcome, SyncError> {
        info!(
            strategy = %strategy,
            site = self.spec.site.as_str(),
            run_id = %self.ctx.run_id,
            run_date = %self.ctx.run_date,
            mode = %self.spec.mode,
            "Starting reconciliation pass"
        );

        let outcome = match strategy {
            Strategy::Requeue => RunOutcome::Requeue(
                RequeueMissing::new(&self.deps, &self.spec, &self.ctx)
                    .run()
                    .await?,
            ),
            Strategy::Register => RunOutcome::Register(
                RegisterMissing::new(&self.deps, &self.spec, &self.ctx)
                    .run()
                    .await?,
            ),
            Strategy::UpdateMaster => RunOutcome::Master(
                UpdateMaster::new(&self.deps, &self.spec, &self.ctx)
                    .run()
                    .await?,
            ),
        };

        info!(strategy = %strategy, "Reconciliation pass complete");
        Ok(outcome)
    }
}
