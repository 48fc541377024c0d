//! Experiment Schema Tests
//!
//! On-disk layout and field names of persisted result records.

use std::collections::BTreeMap;
use std::fs;

use wq_bench::experiment::{
    normalize_importance, read_record, BatchReport, Destination, ExperimentRecord, ResultStore,
    RunReport, RunStatus, BEST_DIR, RESULTS_DIR,
};
use wq_bench::trainer::RawImportance;
use wq_bench::Error;

fn sample_record(run: u32, model: &str) -> ExperimentRecord {
    let raw: BTreeMap<String, RawImportance> = [("EC", 0.6), ("SS", 0.2), ("WT", 0.1), ("pH", 0.1)]
        .into_iter()
        .map(|(name, importance)| {
            (
                name.to_string(),
                RawImportance {
                    importance,
                    stddev: 0.01,
                },
            )
        })
        .collect();

    ExperimentRecord::builder(run, 654, model)
        .metrics(Some(0.75), Some(0.4), Some(0.12))
        .best_config(serde_json::json!({"alpha": 1.0}))
        .feature_importance(normalize_importance(&raw))
        .held_out(
            vec![vec![250.0, 12.0, 21.5, 7.4], vec![310.0, 40.0, 24.0, 7.9]],
            vec![2.0, 3.5],
            vec![2.2, 3.1],
        )
        .build()
        .expect("valid record")
}

// =============================================================================
// ExperimentRecord Tests
// =============================================================================

#[test]
fn test_experiment_record_accessors() {
    let record = sample_record(4, "RidgeRegression");

    assert_eq!(record.run(), 4);
    assert_eq!(record.seed(), 654);
    assert_eq!(record.model(), "RidgeRegression");
    assert_eq!(record.r2(), Some(0.75));
    assert_eq!(record.best_config()["alpha"], 1.0);
    assert_eq!(record.x_test().len(), record.y_test().len());
    assert_eq!(record.y_test().len(), record.y_pred().len());
}

#[test]
fn test_experiment_record_serialization() {
    let record = sample_record(1, "A");

    let json = serde_json::to_string(&record).expect("serialization failed");
    let deserialized: ExperimentRecord =
        serde_json::from_str(&json).expect("deserialization failed");

    assert_eq!(record, deserialized);
}

#[test]
fn test_experiment_record_field_names() {
    let value = serde_json::to_value(sample_record(1, "A")).unwrap();
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();

    assert_eq!(
        keys,
        [
            "run",
            "seed",
            "Model",
            "R2",
            "RMSE",
            "MAPE",
            "Best Config",
            "Feature importance",
            "X_test",
            "y_test",
            "y_pred"
        ]
    );

    let ec = &value["Feature importance"]["EC"];
    assert!(ec.get("importance").is_some());
    assert!(ec.get("stddev").is_some());
    assert!(ec.get("normalized_importance").is_some());
}

#[test]
fn test_undefined_mape_serializes_as_null() {
    let record = ExperimentRecord::builder(1, 1, "A")
        .metrics(Some(0.1), Some(0.2), None)
        .held_out(vec![vec![1.0]], vec![0.0], vec![0.5])
        .build()
        .unwrap();

    let value = serde_json::to_value(&record).unwrap();
    assert!(value["MAPE"].is_null());

    let back: ExperimentRecord = serde_json::from_value(value).unwrap();
    assert_eq!(back.mape(), None);
}

#[test]
fn test_normalized_importance_sums_to_one() {
    let record = sample_record(1, "A");
    let sum: f64 = record
        .feature_importance()
        .values()
        .map(|f| f.normalized_importance)
        .sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn test_record_rejects_misaligned_arrays() {
    let result = ExperimentRecord::builder(1, 1, "A")
        .held_out(vec![vec![1.0], vec![2.0]], vec![1.0, 2.0], vec![1.0])
        .build();
    assert!(matches!(result, Err(Error::EvaluationFailure(_))));
}

// =============================================================================
// ResultStore Tests
// =============================================================================

#[test]
fn test_store_layout() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path());
    let record = sample_record(7, "KNeighborsRegressor");

    let model_path = store.persist(&record, Destination::Model).unwrap();
    let best_path = store.persist(&record, Destination::Best).unwrap();

    assert_eq!(
        model_path,
        dir.path()
            .join(RESULTS_DIR)
            .join("KNeighborsRegressor")
            .join("result_run_7.json")
    );
    assert_eq!(best_path, dir.path().join(BEST_DIR).join("result_run_7.json"));
    assert_eq!(
        fs::read(&model_path).unwrap(),
        fs::read(&best_path).unwrap()
    );
}

#[test]
fn test_store_round_trip_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path());
    let record = sample_record(2, "A");

    let path = store.persist(&record, Destination::Model).unwrap();
    assert_eq!(read_record(&path).unwrap(), record);
}

#[test]
fn test_store_overwrites_same_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path());

    store.persist(&sample_record(1, "A"), Destination::Model).unwrap();
    let replacement = ExperimentRecord::builder(1, 99, "A")
        .held_out(vec![vec![0.0]], vec![1.0], vec![1.0])
        .build()
        .unwrap();
    let path = store.persist(&replacement, Destination::Model).unwrap();

    assert_eq!(read_record(&path).unwrap().seed(), 99);
    assert_eq!(store.record_files().unwrap().len(), 1);
}

#[test]
fn test_store_unwritable_root_is_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "file").unwrap();

    let store = ResultStore::new(&blocker);
    let result = store.persist(&sample_record(1, "A"), Destination::Model);
    assert!(matches!(result, Err(Error::PersistenceFailure(_))));
}

// =============================================================================
// RunReport Tests
// =============================================================================

#[test]
fn test_run_report_failure() {
    let mut report = RunReport::new(3, 17);
    report.start();
    report.fail("Training failed: budget exhausted");

    assert_eq!(report.status(), RunStatus::Failed);
    assert_eq!(report.error(), Some("Training failed: budget exhausted"));
    assert!(report.ended_at().is_some());
}

#[test]
fn test_batch_report_display_lists_failures() {
    let mut ok = RunReport::new(1, 5);
    ok.start();
    ok.record_written();
    ok.succeed();

    let mut bad = RunReport::new(2, 6);
    bad.start();
    bad.fail("boom");

    let mut batch = BatchReport::new();
    batch.push(ok);
    batch.push(bad);

    let text = batch.to_string();
    assert!(text.contains("2 runs: 1 succeeded, 1 failed"));
    assert!(text.contains("run 2 (seed 6): boom"));
}
