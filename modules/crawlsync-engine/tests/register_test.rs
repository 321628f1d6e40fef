//! Registry pass against the in-memory store doubles.
//!
//! Covers the primary/other entry-shape asymmetry and duplicate-key
//! fault isolation.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use uuid::Uuid;

use crawlsync_common::{
    ComparisonMode, Frequency, Record, RecordStatus, RegistryEntry, RunContext,
};
use crawlsync_engine::{ReconcileDeps, ReconcileSpec, Reconciler, RunOutcome, Strategy};
use crawlsync_store::testing::{MemoryQueue, MemoryRecordStore, MemoryRegistry, MemorySummaries};
use crawlsync_store::UrlRegistry;

fn test_ctx() -> RunContext {
    RunContext::new(
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

fn test_spec(site: &str, is_primary_site: bool) -> ReconcileSpec {
    ReconcileSpec::builder()
        .site(site)
        .frequency(Frequency::Daily)
        .mode(ComparisonMode::Full)
        .is_primary_site(is_primary_site)
        .build()
}

fn deps(
    records: Arc<MemoryRecordStore>,
    registry: Arc<MemoryRegistry>,
    summaries: Arc<MemorySummaries>,
) -> ReconcileDeps {
    ReconcileDeps {
        records,
        queue: Arc::new(MemoryQueue::new()),
        registry,
        summaries,
    }
}

fn ok(id: &str, url: &str) -> Record {
    Record::new(id, url).with_status(RecordStatus::Ok)
}

async fn run_register(reconciler: &Reconciler) -> crawlsync_engine::stats::RegisterStats {
    match reconciler.run(Strategy::Register).await.unwrap() {
        RunOutcome::Register(stats) => stats,
        other => panic!("expected register outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn primary_site_entries_carry_the_master_category() {
    let ctx = test_ctx();
    let spec = test_spec("site1", true);
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, vec![])
            .with_records("site1_master", vec![ok("x1", "http://u/x1")]),
    );
    let registry = Arc::new(MemoryRegistry::new());
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler = Reconciler::new(deps(records, registry.clone(), summaries.clone()), spec, ctx);

    let stats = run_register(&reconciler).await;
    assert_eq!(stats.inserted, 1);

    let entry = registry.entry("x1").unwrap();
    assert!(matches!(entry, RegistryEntry::Primary { .. }));
    assert_eq!(entry.url(), "http://u/x1");
    assert_eq!(entry.category(), Some("MasterDB"));
    assert_eq!(entry.extra(), Some(serde_json::json!({})));

    assert_eq!(summaries.summary("site1").unwrap().missing_count, 1);
}

#[tokio::test]
async fn other_site_entries_use_the_bare_shape() {
    let ctx = test_ctx();
    let spec = test_spec("site7", false);
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, vec![])
            .with_records("site7_master", vec![ok("x1", "http://u/x1")]),
    );
    let registry = Arc::new(MemoryRegistry::new());
    let reconciler = Reconciler::new(
        deps(records, registry.clone(), Arc::new(MemorySummaries::new())),
        spec,
        ctx,
    );

    run_register(&reconciler).await;

    let entry = registry.entry("x1").unwrap();
    assert!(matches!(entry, RegistryEntry::Other { .. }));
    assert_eq!(entry.category(), None);
    assert_eq!(entry.extra(), None);
}

#[tokio::test]
async fn duplicate_key_is_skipped_and_the_rest_inserted() {
    let ctx = test_ctx();
    let spec = test_spec("site1", true);
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, vec![])
            .with_records(
                "site1_master",
                vec![ok("x1", "http://u/x1"), ok("x2", "http://u/x2")],
            ),
    );
    let registry = Arc::new(MemoryRegistry::new());
    // x1 was registered by an earlier run.
    registry
        .insert(&RegistryEntry::new(true, "x1", "http://u/x1"))
        .await
        .unwrap();

    let reconciler = Reconciler::new(
        deps(records, registry.clone(), Arc::new(MemorySummaries::new())),
        spec,
        ctx,
    );

    let stats = run_register(&reconciler).await;
    assert_eq!(stats.missing, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(registry.entry_count(), 2);
    assert!(registry.entry("x2").is_some());
}
