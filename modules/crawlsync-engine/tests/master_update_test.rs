//! Master-update pass against the in-memory store doubles.
//!
//! SEED → RECONCILER.RUN(UpdateMaster) → ASSERT
//! Proves upsert, stale sweep, attribute copying and summary write
//! compose correctly without a database.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use uuid::Uuid;

use crawlsync_common::{
    AttributeMap, ComparisonMode, Frequency, Record, RecordStatus, RunContext, SyncError,
};
use crawlsync_engine::{ReconcileDeps, ReconcileSpec, Reconciler, RunOutcome, Strategy};
use crawlsync_store::testing::{MemoryQueue, MemoryRecordStore, MemoryRegistry, MemorySummaries};

fn test_ctx() -> RunContext {
    RunContext::new(
        Uuid::new_v4(),
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    )
}

fn test_spec(attributes: AttributeMap) -> ReconcileSpec {
    ReconcileSpec::builder()
        .site("site1")
        .frequency(Frequency::Daily)
        .mode(ComparisonMode::Full)
        .attributes(attributes)
        .build()
}

fn deps(
    records: Arc<MemoryRecordStore>,
    summaries: Arc<MemorySummaries>,
) -> ReconcileDeps {
    ReconcileDeps {
        records,
        queue: Arc::new(MemoryQueue::new()),
        registry: Arc::new(MemoryRegistry::new()),
        summaries,
    }
}

fn ok(id: &str, url: &str) -> Record {
    Record::new(id, url).with_status(RecordStatus::Ok)
}

async fn run_master(reconciler: &Reconciler) -> crawlsync_engine::stats::MasterStats {
    match reconciler.run(Strategy::UpdateMaster).await.unwrap() {
        RunOutcome::Master(stats) => stats,
        other => panic!("expected master outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn updates_inserts_and_marks_stale() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::default());
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(
                &source,
                vec![
                    Record::new("A", "http://u/A-fresh"),
                    Record::new("B", "http://u/B"),
                ],
            )
            .with_records(
                "site1_master",
                vec![ok("A", "http://u/A"), ok("C", "http://u/C")],
            ),
    );
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler = Reconciler::new(deps(records.clone(), summaries.clone()), spec, ctx);

    let stats = run_master(&reconciler).await;
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.total_records, 3);

    let a = records.record("site1_master", "A").unwrap();
    assert_eq!(a.status, RecordStatus::Ok);
    assert_eq!(a.run_id, Some(ctx.run_id));
    assert_eq!(a.record_url, "http://u/A-fresh");

    let b = records.record("site1_master", "B").unwrap();
    assert_eq!(b.status, RecordStatus::Ok);
    assert_eq!(b.run_id, Some(ctx.run_id));

    let c = records.record("site1_master", "C").unwrap();
    assert_eq!(c.status, RecordStatus::Stale);

    let summary = summaries.summary("site1").unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.total_records, 3);
}

#[tokio::test]
async fn second_run_reproduces_master_contents() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::default());
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(
                &source,
                vec![Record::new("A", "http://u/A"), Record::new("B", "http://u/B")],
            )
            .with_records(
                "site1_master",
                vec![ok("A", "http://u/A"), ok("C", "http://u/C")],
            ),
    );
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler =
        Reconciler::new(deps(records.clone(), summaries.clone()), spec, ctx);

    run_master(&reconciler).await;
    let after_first = records.partition("site1_master");

    let stats = run_master(&reconciler).await;
    let after_second = records.partition("site1_master");

    assert_eq!(after_first, after_second);
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.total_records, 3);

    let summary = summaries.summary("site1").unwrap();
    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.not_found, 1);
}

#[tokio::test]
async fn copies_configured_attributes_with_empty_default() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::parse("author,price").unwrap());
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(
                &source,
                vec![
                    Record::new("A", "http://u/A").with_extra("author", "arb"),
                    Record::new("B", "http://u/B")
                        .with_extra("author", "zed")
                        .with_extra("price", "12.50"),
                ],
            )
            .with_records(
                "site1_master",
                vec![ok("A", "http://u/A").with_extra("legacy", "kept")],
            ),
    );
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler = Reconciler::new(deps(records.clone(), summaries), spec, ctx);

    run_master(&reconciler).await;

    let a = records.record("site1_master", "A").unwrap();
    assert_eq!(a.extras.get("author").map(String::as_str), Some("arb"));
    assert_eq!(a.extras.get("price").map(String::as_str), Some(""));
    // Untouched master fields survive the patch.
    assert_eq!(a.extras.get("legacy").map(String::as_str), Some("kept"));

    let b = records.record("site1_master", "B").unwrap();
    assert_eq!(b.extras.get("price").map(String::as_str), Some("12.50"));
}

#[tokio::test]
async fn missing_required_attribute_aborts_before_any_write() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::parse("price!").unwrap());
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, vec![Record::new("A", "http://u/A")])
            .with_records("site1_master", vec![ok("C", "http://u/C")]),
    );
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler = Reconciler::new(deps(records.clone(), summaries.clone()), spec, ctx);

    let err = reconciler.run(Strategy::UpdateMaster).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    // No upsert happened and C was not swept stale.
    assert!(records.record("site1_master", "A").is_none());
    assert_eq!(
        records.record("site1_master", "C").unwrap().status,
        RecordStatus::Ok
    );
    assert!(summaries.summary("site1").is_none());
}

#[tokio::test]
async fn summary_write_failure_does_not_fail_the_pass() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::default());
    let source = spec.source_partition(&ctx).name();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, vec![Record::new("A", "http://u/A")])
            .with_records("site1_master", vec![]),
    );
    let summaries = Arc::new(MemorySummaries::new().fail_writes());
    let reconciler = Reconciler::new(deps(records, summaries.clone()), spec, ctx);

    let stats = run_master(&reconciler).await;
    assert_eq!(stats.inserted, 1);
    assert!(summaries.summary("site1").is_none());
}

#[tokio::test]
async fn full_scan_crosses_page_boundaries() {
    let ctx = test_ctx();
    let spec = test_spec(AttributeMap::default());
    let source = spec.source_partition(&ctx).name();

    // More records than one scan page (500) to force keyset continuation.
    let source_records: Vec<Record> = (0..1203)
        .map(|i| Record::new(format!("id{i:05}"), format!("http://u/{i}")))
        .collect();

    let records = Arc::new(
        MemoryRecordStore::new()
            .with_records(&source, source_records)
            .with_records("site1_master", vec![ok("zzz", "http://u/zzz")]),
    );
    let summaries = Arc::new(MemorySummaries::new());
    let reconciler = Reconciler::new(deps(records.clone(), summaries), spec, ctx);

    let stats = run_master(&reconciler).await;
    assert_eq!(stats.inserted, 1203);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.total_records, 1204);
}
