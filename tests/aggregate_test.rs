//! Results aggregation tests
//!
//! Records are written through the real store, then summarized from disk.

use std::fs;
use std::path::Path;

use wq_bench::aggregate::{aggregate, SUMMARY_COLUMNS};
use wq_bench::experiment::{Destination, ExperimentRecord, ResultStore};

/// Record whose predictions give the requested R² on `y_test = [1, -1]`.
///
/// SS_tot is 2, so shifting both predictions toward zero by `d` leaves
/// SS_res = 2d² and R² = 1 - d².
fn record_with_r2(run: u32, model: &str, r2: f64) -> ExperimentRecord {
    let d = (1.0 - r2).sqrt();
    ExperimentRecord::builder(run, u64::from(run) * 11, model)
        .metrics(Some(r2), None, None)
        .held_out(
            vec![vec![0.0], vec![1.0]],
            vec![1.0, -1.0],
            vec![1.0 - d, -1.0 + d],
        )
        .build()
        .unwrap()
}

fn persist_all(root: &Path, records: &[ExperimentRecord]) -> ResultStore {
    let store = ResultStore::new(root);
    for record in records {
        store.persist(record, Destination::Model).unwrap();
    }
    store
}

// =============================================================================
// Summary Statistics
// =============================================================================

#[test]
fn test_mean_and_sample_std_per_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(
        dir.path(),
        &[record_with_r2(1, "X", 0.8), record_with_r2(2, "X", 0.6)],
    );

    let aggregation = aggregate(store.results_dir()).unwrap();
    let x = aggregation.summary_for("X").unwrap();

    assert_eq!(x.stats.r2.count, 2);
    assert!((x.stats.r2.mean - 0.7).abs() < 1e-9);
    assert!((x.stats.r2.std - 0.141_421_356_237_309_5).abs() < 1e-9);
}

#[test]
fn test_metrics_are_recomputed_not_read_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    // Cached R2 deliberately wrong: predictions give R² = 0.8.
    let record = ExperimentRecord::builder(1, 3, "X")
        .metrics(Some(0.1), None, None)
        .held_out(
            vec![vec![0.0], vec![1.0]],
            vec![1.0, -1.0],
            vec![1.0 - 0.2_f64.sqrt(), -1.0 + 0.2_f64.sqrt()],
        )
        .build()
        .unwrap();
    let store = persist_all(dir.path(), &[record]);

    let aggregation = aggregate(store.results_dir()).unwrap();
    let r2 = aggregation.runs[0].metrics.r2.unwrap();
    assert!((r2 - 0.8).abs() < 1e-9);
}

#[test]
fn test_summary_sorted_by_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(
        dir.path(),
        &[
            record_with_r2(1, "Zeta", 0.5),
            record_with_r2(1, "Alpha", 0.9),
            record_with_r2(1, "Mid", 0.7),
        ],
    );

    let aggregation = aggregate(store.results_dir()).unwrap();
    let models: Vec<&str> = aggregation
        .summary
        .iter()
        .map(|s| s.model.as_str())
        .collect();
    assert_eq!(models, ["Alpha", "Mid", "Zeta"]);
}

#[test]
fn test_single_run_std_is_nan() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(dir.path(), &[record_with_r2(1, "Solo", 0.5)]);

    let aggregation = aggregate(store.results_dir()).unwrap();
    let solo = aggregation.summary_for("Solo").unwrap();
    assert!((solo.stats.r2.mean - 0.5).abs() < 1e-9);
    assert!(solo.stats.r2.std.is_nan());
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn test_zero_in_truth_excludes_mape_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let with_zero = ExperimentRecord::builder(1, 1, "Z")
        .held_out(vec![vec![0.0], vec![1.0]], vec![0.0, 2.0], vec![0.5, 1.5])
        .build()
        .unwrap();
    let without_zero = ExperimentRecord::builder(2, 2, "Z")
        .held_out(vec![vec![0.0], vec![1.0]], vec![1.0, 2.0], vec![1.5, 1.5])
        .build()
        .unwrap();
    let store = persist_all(dir.path(), &[with_zero, without_zero]);

    let aggregation = aggregate(store.results_dir()).unwrap();
    let z = aggregation.summary_for("Z").unwrap();

    assert!(aggregation.runs[0].metrics.mape_percent.is_none());
    assert_eq!(z.stats.mape.count, 1);
    // |1-1.5|/1 and |2-1.5|/2 -> mean 0.375 -> 37.5%
    assert!((z.stats.mape.mean - 37.5).abs() < 1e-9);
    assert_eq!(z.stats.rmse.count, 2);
}

#[test]
fn test_unreadable_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(dir.path(), &[record_with_r2(1, "A", 0.8)]);
    fs::write(store.results_dir().join("A").join("broken.json"), "{ not json").unwrap();
    fs::write(
        store.results_dir().join("A").join("misaligned.json"),
        r#"{"run":9,"seed":1,"Model":"A","R2":null,"RMSE":null,"MAPE":null,
           "Best Config":null,"Feature importance":{},"X_test":[[1.0]],
           "y_test":[1.0,2.0],"y_pred":[1.0]}"#,
    )
    .unwrap();

    let aggregation = aggregate(store.results_dir()).unwrap();
    assert_eq!(aggregation.runs.len(), 1);
    assert_eq!(aggregation.skipped_files, 2);
}

#[test]
fn test_models_grouped_by_record_field() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(dir.path(), &[record_with_r2(1, "A", 0.8)]);
    // A record for model "B" that ended up in A's directory still counts as B.
    let stray = record_with_r2(2, "B", 0.6);
    fs::write(
        store.results_dir().join("A").join("result_run_2.json"),
        serde_json::to_string(&stray).unwrap(),
    )
    .unwrap();

    let aggregation = aggregate(store.results_dir()).unwrap();
    assert!(aggregation.summary_for("A").is_some());
    assert!(aggregation.summary_for("B").is_some());
}

#[test]
fn test_empty_results_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("results")).unwrap();

    let aggregation = aggregate(dir.path().join("results")).unwrap();
    assert!(aggregation.summary.is_empty());
    assert_eq!(aggregation.skipped_files, 0);
}

// =============================================================================
// Output Tables
// =============================================================================

#[test]
fn test_summary_csv_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(
        dir.path(),
        &[record_with_r2(1, "X", 0.8), record_with_r2(2, "X", 0.6)],
    );
    let out = dir.path().join("analysis").join("metrics_summary.csv");

    aggregate(store.results_dir())
        .unwrap()
        .write_summary_csv(&out)
        .unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, SUMMARY_COLUMNS);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "X");
    let r2_mean: f64 = rows[0][3].parse().unwrap();
    assert!((r2_mean - 0.7).abs() < 1e-9);
}

#[test]
fn test_per_run_csv_has_one_row_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(
        dir.path(),
        &[
            record_with_r2(1, "X", 0.8),
            record_with_r2(2, "X", 0.6),
            record_with_r2(1, "Y", 0.5),
        ],
    );
    let out = dir.path().join("runs.csv");

    aggregate(store.results_dir())
        .unwrap()
        .write_runs_csv(&out)
        .unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    assert_eq!(reader.records().count(), 3);
}

#[test]
fn test_aggregation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(
        dir.path(),
        &[
            record_with_r2(1, "X", 0.8),
            record_with_r2(2, "X", 0.6),
            record_with_r2(1, "Y", 0.3),
        ],
    );
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    aggregate(store.results_dir())
        .unwrap()
        .write_summary_csv(&first)
        .unwrap();
    aggregate(store.results_dir())
        .unwrap()
        .write_summary_csv(&second)
        .unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

#[test]
fn test_display_table_lists_models() {
    let dir = tempfile::tempdir().unwrap();
    let store = persist_all(dir.path(), &[record_with_r2(1, "Ridge", 0.8)]);

    let text = aggregate(store.results_dir()).unwrap().to_string();
    assert!(text.starts_with("Model"));
    assert!(text.contains("R2_std"));
    assert!(text.contains("Ridge"));
}
