pub mod client;
pub mod queue;
pub mod records;
pub mod registry;
pub mod summary;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::StoreClient;
pub use queue::{PgmqPublisher, QueuePublisher};
pub use records::{PgRecordStore, RecordStore};
pub use registry::{PgUrlRegistry, UrlRegistry};
pub use summary::{MasterPassCounts, PgSummaryStore, SummaryStore};
