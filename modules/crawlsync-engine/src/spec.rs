use std::sync::Arc;

use typed_builder::TypedBuilder;

use crawlsync_common::{AttributeMap, ComparisonMode, Frequency, Partition, RunContext};
use crawlsync_store::{QueuePublisher, RecordStore, SummaryStore, UrlRegistry};

/// External collaborators a reconciliation pass talks to.
#[derive(Clone)]
pub struct ReconcileDeps {
    pub records: Arc<dyn RecordStore>,
    pub queue: Arc<dyn QueuePublisher>,
    pub registry: Arc<dyn UrlRegistry>,
    pub summaries: Arc<dyn SummaryStore>,
}

/// Per-run reconciliation parameters. Everything is supplied explicitly
/// at construction; the engine never reads ambient state.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ReconcileSpec {
    #[builder(setter(into))]
    pub site: String,
    pub frequency: Frequency,
    pub mode: ComparisonMode,
    #[builder(default = false)]
    pub is_primary_site: bool,
    #[builder(default)]
    pub attributes: AttributeMap,
}

impl ReconcileSpec {
    /// The ephemeral partition produced by this run's crawl.
    pub fn source_partition(&self, ctx: &RunContext) -> Partition {
        Partition::source(self.site.clone(), self.frequency, ctx.run_date)
    }

    /// The long-lived accumulated record set for this site.
    pub fn master_partition(&self) -> Partition {
        Partition::master(self.site.clone())
    }
}
