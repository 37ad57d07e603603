//! End-to-end harvest runs against the in-memory source

use crate::support::FakeSource;
use chrono::{DateTime, TimeZone, Utc};
use cnnvd_harvester::fetcher::FetcherError;
use cnnvd_harvester::harvester::{
    HarvestConfig, HarvestError, HarvestExecutor, HarvestMode, PlanError,
};
use cnnvd_harvester::resume::{CheckpointError, CheckpointStore, HarvestLock};
use std::sync::Arc;
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 9, 30, 0).unwrap()
}

fn april_2023() -> HarvestMode {
    HarvestMode::Explicit {
        year: 2023,
        month: 4,
    }
}

#[tokio::test]
async fn test_single_window_end_to_end() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(
        FakeSource::new().with_window("CNNVD-202304", &["CNNVD-202304-0001", "CNNVD-202304-0662"]),
    );
    let executor = HarvestExecutor::new(source.clone(), HarvestConfig::new(dir.path()));

    let report = executor.run(april_2023(), now()).await.unwrap();

    assert!(report.due);
    assert_eq!(report.windows, 1);
    assert_eq!(report.records_saved, 2);

    // One count request and one page request, both for page 1
    assert_eq!(
        source.pages_requested(),
        vec![
            ("CNNVD-202304".to_string(), 1),
            ("CNNVD-202304".to_string(), 1)
        ]
    );
    assert_eq!(source.detail_calls(), 2);

    for code in ["CNNVD-202304-0001", "CNNVD-202304-0662"] {
        let path = dir.path().join("2023").join("4").join(format!("{code}.json"));
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["cnnvdCode"], code);
        assert_eq!(value["vulDesc"], format!("detail of {code}"));
    }

    let checkpoint = CheckpointStore::new(dir.path()).read().unwrap();
    assert_eq!(checkpoint.total_record_count(), 2);
    assert_eq!(checkpoint.latest_identifier(), "CNNVD-202304-0662");
}

#[tokio::test]
async fn test_latest_is_maximum_across_windows() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202201", &["CNNVD-202201-0001"])
            .with_window("CNNVD-202212", &["CNNVD-202212-0099"])
            .with_window("CNNVD-202207", &["CNNVD-202207-0050"]),
    );
    let config = HarvestConfig::new(dir.path()).with_expand_details(false);
    let executor = HarvestExecutor::new(source.clone(), config);

    // The current month (July) selects the whole year
    let mode = HarvestMode::Explicit {
        year: 2022,
        month: 7,
    };
    let report = executor.run(mode, now()).await.unwrap();

    assert_eq!(report.windows, 12);
    assert_eq!(report.records_saved, 3);
    assert_eq!(report.latest.to_string(), "CNNVD-202212-0099");
    assert_eq!(source.detail_calls(), 0);

    let checkpoint = CheckpointStore::new(dir.path()).read().unwrap();
    assert_eq!(checkpoint.latest_identifier(), "CNNVD-202212-0099");
    assert_eq!(checkpoint.total_record_count(), 3);
}

#[tokio::test]
async fn test_summary_records_are_saved_verbatim() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_window("CNNVD-202304", &["CNNVD-202304-0001"]);
    let config = HarvestConfig::new(dir.path()).with_expand_details(false);
    HarvestExecutor::new(source, config)
        .run(april_2023(), now())
        .await
        .unwrap();

    let path = dir.path().join("2023/4/CNNVD-202304-0001.json");
    let value: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(value["vulName"], "Vulnerability CNNVD-202304-0001");
    assert!(value.get("vulDesc").is_none());
}

#[tokio::test]
async fn test_pagination_walks_every_page() {
    let dir = TempDir::new().unwrap();
    let codes: Vec<String> = (1..=5).map(|n| format!("CNNVD-202304-{n:04}")).collect();
    let code_refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    let source = Arc::new(FakeSource::new().with_window("CNNVD-202304", &code_refs));
    let config = HarvestConfig::new(dir.path())
        .with_page_size(2)
        .with_expand_details(false);

    let report = HarvestExecutor::new(source.clone(), config)
        .run(april_2023(), now())
        .await
        .unwrap();

    assert_eq!(report.records_saved, 5);
    let pages: Vec<u32> = source.pages_requested().iter().map(|(_, p)| *p).collect();
    assert_eq!(pages, vec![1, 1, 2, 3]);
    assert_eq!(report.latest.to_string(), "CNNVD-202304-0005");
}

#[tokio::test]
async fn test_empty_window_fetches_no_pages() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::new());
    let executor = HarvestExecutor::new(source.clone(), HarvestConfig::new(dir.path()));

    let report = executor.run(april_2023(), now()).await.unwrap();

    assert_eq!(report.records_saved, 0);
    assert_eq!(source.list_calls(), 1);
    assert!(!dir.path().join("2023").exists());

    let checkpoint = CheckpointStore::new(dir.path()).read().unwrap();
    assert_eq!(checkpoint.total_record_count(), 0);
    assert_eq!(checkpoint.latest_identifier(), "CNNVD-198801");
}

#[tokio::test]
async fn test_taxonomy_snapshots_written() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::new());
    HarvestExecutor::new(source.clone(), HarvestConfig::new(dir.path()))
        .run(april_2023(), now())
        .await
        .unwrap();

    assert_eq!(source.lookup_calls(), 4);
    for file in ["hazard_level.json", "product.json", "vendor.json", "vuln_type.json"] {
        assert!(dir.path().join(file).exists(), "missing {file}");
    }

    // Fields beyond label/value reach the snapshot untouched
    let vendors: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("vendor.json")).unwrap()).unwrap();
    assert_eq!(vendors[0]["label"], "vendor");
    assert_eq!(vendors[0]["sourceId"], "vendor-1");
}

#[tokio::test]
async fn test_snapshots_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::new());
    let config = HarvestConfig::new(dir.path()).with_snapshot_taxonomies(false);
    HarvestExecutor::new(source.clone(), config)
        .run(april_2023(), now())
        .await
        .unwrap();

    assert_eq!(source.lookup_calls(), 0);
    assert!(!dir.path().join("vendor.json").exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let codes = ["CNNVD-202304-0001", "CNNVD-202304-0662"];
    let path = dir.path().join("2023/4/CNNVD-202304-0662.json");

    let source = FakeSource::new().with_window("CNNVD-202304", &codes);
    HarvestExecutor::new(source, HarvestConfig::new(dir.path()))
        .run(april_2023(), now())
        .await
        .unwrap();
    let first = std::fs::read(&path).unwrap();

    let source = FakeSource::new().with_window("CNNVD-202304", &codes);
    HarvestExecutor::new(source, HarvestConfig::new(dir.path()))
        .run(april_2023(), now())
        .await
        .unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(dir.path().join("2023/4")).unwrap().count(), 2);
}

#[tokio::test]
async fn test_list_retries_then_succeeds() {
    let dir = TempDir::new().unwrap();
    let attempts = 3;
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202304", &["CNNVD-202304-0001"])
            .fail_list_first(attempts - 1),
    );
    let config = HarvestConfig::new(dir.path())
        .with_retry_attempts(attempts)
        .with_snapshot_taxonomies(false);

    let report = HarvestExecutor::new(source.clone(), config)
        .run(april_2023(), now())
        .await
        .unwrap();

    assert_eq!(report.records_saved, 1);
    // Two failures, then the count request and the page request
    assert_eq!(source.list_calls(), attempts - 1 + 2);
}

#[tokio::test]
async fn test_list_exhaustion_aborts_without_checkpoint_update() {
    let dir = TempDir::new().unwrap();
    let attempts = 3;
    let source = Arc::new(
        FakeSource::new()
            .with_window("CNNVD-202304", &["CNNVD-202304-0001"])
            .fail_list_first(attempts),
    );
    let config = HarvestConfig::new(dir.path())
        .with_retry_attempts(attempts)
        .with_snapshot_taxonomies(false);

    let result = HarvestExecutor::new(source.clone(), config)
        .run(april_2023(), now())
        .await;

    match result {
        Err(HarvestError::Fetcher(FetcherError::RetrievalExhausted {
            operation,
            attempts: made,
            ..
        })) => {
            assert_eq!(made, attempts);
            assert!(operation.contains("CNNVD-202304"));
        }
        other => panic!("expected RetrievalExhausted, got {other:?}"),
    }
    assert_eq!(source.list_calls(), attempts);

    // Only the fresh checkpoint from planning exists
    let checkpoint = CheckpointStore::new(dir.path()).read().unwrap();
    assert_eq!(checkpoint.total_record_count(), 0);
}

#[tokio::test]
async fn test_invalid_window_leaves_target_untouched() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("data");
    let source = Arc::new(FakeSource::new());
    let mode = HarvestMode::Explicit {
        year: 2023,
        month: 13,
    };

    let result = HarvestExecutor::new(source.clone(), HarvestConfig::new(&target))
        .run(mode, now())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Plan(PlanError::InvalidWindow(_)))
    ));
    assert!(!target.exists());
    assert_eq!(source.list_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut lock = HarvestLock::open(dir.path()).unwrap();
    let _guard = lock.try_exclusive().unwrap();

    let result = HarvestExecutor::new(FakeSource::new(), HarvestConfig::new(dir.path()))
        .run(april_2023(), now())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Checkpoint(CheckpointError::LockError(_)))
    ));
    assert!(!CheckpointStore::new(dir.path()).exists());
}
