use crawlsync_common::{ComparisonMode, MissingRecord, RecordStatus, SyncError};
use crawlsync_store::RecordStore;

/// Compute the records present in master but absent from the source
/// partition, with the url needed downstream.
///
/// Pure read: the result is a function of the two partitions' contents at
/// read time and nothing is mutated here. `StatusFiltered` restricts the
/// master side to records still marked ok, so records already flagged
/// stale are not rediscovered; `Full` lets them back in.
pub async fn missing_records(
    store: &dyn RecordStore,
    source_partition: &str,
    master_partition: &str,
    mode: ComparisonMode,
) -> Result<Vec<MissingRecord>, SyncError> {
    let source_ids = store.distinct_ids(source_partition, None).await?;
    let master_filter = match mode {
        ComparisonMode::Full => None,
        ComparisonMode::StatusFiltered => Some(RecordStatus::Ok),
    };
    let master_ids = store.distinct_ids(master_partition, master_filter).await?;

    let mut missing: Vec<String> = master_ids.difference(&source_ids).cloned().collect();
    missing.sort();

    store.find_by_ids(master_partition, &missing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlsync_common::Record;
    use crawlsync_store::testing::MemoryRecordStore;

    fn ok(id: &str) -> Record {
        Record::new(id, format!("http://u/{id}")).with_status(RecordStatus::Ok)
    }

    fn stale(id: &str) -> Record {
        Record::new(id, format!("http://u/{id}")).with_status(RecordStatus::Stale)
    }

    #[tokio::test]
    async fn missing_is_exactly_master_minus_source() {
        let store = MemoryRecordStore::new()
            .with_records("src", vec![ok("a"), ok("b")])
            .with_records("master", vec![ok("a"), ok("c"), ok("d")]);

        let missing = missing_records(&store, "src", "master", ComparisonMode::Full)
            .await
            .unwrap();

        let ids: Vec<&str> = missing.iter().map(|m| m.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(missing[0].record_url, "http://u/c");
    }

    #[tokio::test]
    async fn disjoint_sets_flag_all_of_master() {
        let store = MemoryRecordStore::new()
            .with_records("src", vec![ok("x"), ok("y")])
            .with_records("master", vec![ok("a"), ok("b")]);

        let missing = missing_records(&store, "src", "master", ComparisonMode::Full)
            .await
            .unwrap();
        assert_eq!(missing.len(), 2);
    }

    #[tokio::test]
    async fn source_superset_yields_nothing() {
        let store = MemoryRecordStore::new()
            .with_records("src", vec![ok("a"), ok("b"), ok("c")])
            .with_records("master", vec![ok("a"), ok("b")]);

        let missing = missing_records(&store, "src", "master", ComparisonMode::Full)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn status_filtered_mode_ignores_stale_master_records() {
        let store = MemoryRecordStore::new()
            .with_records("src", vec![ok("a")])
            .with_records("master", vec![ok("a"), ok("c"), stale("s")]);

        let filtered = missing_records(&store, "src", "master", ComparisonMode::StatusFiltered)
            .await
            .unwrap();
        let ids: Vec<&str> = filtered.iter().map(|m| m.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);

        let full = missing_records(&store, "src", "master", ComparisonMode::Full)
            .await
            .unwrap();
        let ids: Vec<&str> = full.iter().map(|m| m.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "s"]);
    }

    #[tokio::test]
    async fn empty_partitions_are_fine() {
        let store = MemoryRecordStore::new();
        let missing = missing_records(&store, "src", "master", ComparisonMode::Full)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }
}
