//! Incremental harvests resuming from an existing checkpoint

use crate::support::FakeSource;
use chrono::{DateTime, Duration, TimeZone, Utc};
use cnnvd_harvester::harvester::{HarvestConfig, HarvestError, HarvestExecutor, HarvestMode, PlanError};
use cnnvd_harvester::identifier::CnnvdIdentifier;
use cnnvd_harvester::resume::{CheckpointError, CheckpointStore};
use std::sync::Arc;
use tempfile::TempDir;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 6, 0, 0).unwrap()
}

fn seed(dir: &TempDir, total: u64, latest: &str, written_at: DateTime<Utc>) -> CheckpointStore {
    let store = CheckpointStore::new(dir.path());
    store
        .write(total, &CnnvdIdentifier::parse(latest).unwrap(), written_at)
        .unwrap();
    store
}

#[tokio::test]
async fn test_incremental_extends_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, 5, "CNNVD-202302-0010", at(2023, 3, 1));
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202302", &["CNNVD-202302-0010", "CNNVD-202302-0011"])
            .with_window("CNNVD-202303", &["CNNVD-202303-0001"])
            // Current month: not queried until it has closed
            .with_window("CNNVD-202304", &["CNNVD-202304-0001"]),
    );
    let config = HarvestConfig::new(dir.path()).with_expand_details(false);
    let now = at(2023, 4, 10);

    let report = HarvestExecutor::new(source.clone(), config)
        .run(HarvestMode::Incremental, now)
        .await
        .unwrap();

    assert_eq!(report.windows, 2);
    assert_eq!(report.records_saved, 3);
    assert_eq!(report.total_record_count, 8);

    let keywords: Vec<String> = source
        .pages_requested()
        .into_iter()
        .map(|(keyword, _)| keyword)
        .collect();
    assert!(keywords.contains(&"CNNVD-202302".to_string()));
    assert!(keywords.contains(&"CNNVD-202303".to_string()));
    assert!(!keywords.contains(&"CNNVD-202304".to_string()));

    let checkpoint = store.read().unwrap();
    assert_eq!(checkpoint.total_record_count(), 8);
    assert_eq!(checkpoint.latest_identifier(), "CNNVD-202303-0001");
    assert_eq!(checkpoint.next_scheduled_run(), now + Duration::hours(24));
}

#[tokio::test]
async fn test_incremental_not_due_is_noop() {
    let dir = TempDir::new().unwrap();
    let written_at = at(2023, 4, 10);
    let store = seed(&dir, 5, "CNNVD-202302-0010", written_at);
    let before = store.read().unwrap();
    let source = Arc::new(FakeSource::new());

    let report = HarvestExecutor::new(source.clone(), HarvestConfig::new(dir.path()))
        .run(HarvestMode::Incremental, written_at + Duration::hours(2))
        .await
        .unwrap();

    assert!(!report.due);
    assert_eq!(report.windows, 0);
    assert_eq!(report.total_record_count, 5);
    assert_eq!(source.list_calls(), 0);
    assert_eq!(source.lookup_calls(), 0);
    assert_eq!(store.read().unwrap(), before);
}

#[tokio::test]
async fn test_incremental_without_checkpoint_fails_before_network() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::new());

    let result = HarvestExecutor::new(source.clone(), HarvestConfig::new(dir.path()))
        .run(HarvestMode::Incremental, at(2023, 4, 10))
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Plan(PlanError::Checkpoint(
            CheckpointError::Unreadable { .. }
        )))
    ));
    assert_eq!(source.list_calls(), 0);
    assert_eq!(source.lookup_calls(), 0);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_unreadable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("metadata.json"), b"{not json").unwrap();

    let result = HarvestExecutor::new(FakeSource::new(), HarvestConfig::new(dir.path()))
        .run(HarvestMode::Incremental, at(2023, 4, 10))
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Plan(PlanError::Checkpoint(
            CheckpointError::Unreadable { .. }
        )))
    ));
}

#[tokio::test]
async fn test_expansion_failure_leaves_checkpoint_untouched() {
    let dir = TempDir::new().unwrap();
    let store = seed(&dir, 7, "CNNVD-202303-0004", at(2023, 4, 1));
    let before = store.read().unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202303", &["CNNVD-202303-0004", "CNNVD-202303-0005"])
            .fail_detail_first(10),
    );
    let config = HarvestConfig::new(dir.path()).with_retry_attempts(2);

    let result = HarvestExecutor::new(source.clone(), config)
        .run(HarvestMode::Incremental, at(2023, 5, 10))
        .await;

    assert!(matches!(result, Err(HarvestError::Fetcher(_))));
    assert_eq!(source.detail_calls(), 2);
    assert!(!dir.path().join("2023/3").exists());
    assert_eq!(store.read().unwrap(), before);
}

#[tokio::test]
async fn test_incremental_across_year_boundary() {
    let dir = TempDir::new().unwrap();
    seed(&dir, 0, "CNNVD-202211-0001", at(2022, 12, 1));
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202212", &["CNNVD-202212-0001"])
            .with_window("CNNVD-202301", &["CNNVD-202301-0003"]),
    );
    let config = HarvestConfig::new(dir.path())
        .with_expand_details(false)
        .with_snapshot_taxonomies(false);

    let report = HarvestExecutor::new(source.clone(), config)
        .run(HarvestMode::Incremental, at(2023, 2, 3))
        .await
        .unwrap();

    // 2022-11, 2022-12, 2023-01
    assert_eq!(report.windows, 3);
    assert_eq!(report.records_saved, 2);
    assert_eq!(report.latest.to_string(), "CNNVD-202301-0003");
}
