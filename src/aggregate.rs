//! Results aggregation across runs
//!
//! Walks `results/<model>/*.json`, recomputes every metric from the stored
//! `y_test`/`y_pred` arrays (cached metrics in the files are only compared,
//! never trusted), and reduces them to a mean and sample standard deviation
//! per model.
//!
//! ```rust,no_run
//! use wq_bench::aggregate::aggregate;
//!
//! let aggregation = aggregate("results")?;
//! aggregation.write_summary_csv("analysis/metrics_summary.csv")?;
//! # Ok::<(), wq_bench::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::experiment::{read_record, record_files, ExperimentRecord};
use crate::metrics::{mean, sample_std, RegressionMetrics};
use crate::Result;

/// Relative tolerance when comparing cached and recomputed metrics.
const CACHE_TOLERANCE: f64 = 1e-9;

/// Header of the summary table.
pub const SUMMARY_COLUMNS: [&str; 11] = [
    "Model", "R", "R_std", "R2", "R2_std", "RMSE", "RMSE_std", "MAE", "MAE_std", "MAPE",
    "MAPE_std",
];

/// Header of the per-record table.
pub const RUN_COLUMNS: [&str; 8] = ["Model", "Run", "Seed", "R", "R2", "RMSE", "MAE", "MAPE"];

/// Metrics recomputed for one persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Model identifier
    pub model: String,
    /// Run number
    pub run: u32,
    /// Split seed
    pub seed: u64,
    /// Recomputed metrics
    pub metrics: RegressionMetrics,
}

/// Mean and sample standard deviation of one metric.
///
/// Either value is `NaN` when it cannot be computed (no defined
/// observations, or fewer than two for the deviation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (ddof = 1)
    pub std: f64,
    /// Observations that contributed
    pub count: usize,
}

impl MeanStd {
    /// Reduce the defined values, ignoring `None`s.
    #[must_use]
    pub fn from_defined(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let defined: Vec<f64> = values.into_iter().flatten().collect();
        Self {
            mean: mean(&defined).unwrap_or(f64::NAN),
            std: sample_std(&defined).unwrap_or(f64::NAN),
            count: defined.len(),
        }
    }
}

/// Cross-run statistics for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Pearson correlation
    pub r: MeanStd,
    /// Coefficient of determination
    pub r2: MeanStd,
    /// Root mean squared error
    pub rmse: MeanStd,
    /// Mean absolute error
    pub mae: MeanStd,
    /// Mean absolute percentage error, in percent
    pub mape: MeanStd,
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Model identifier
    pub model: String,
    /// Per-metric statistics
    pub stats: SummaryStats,
}

impl SummaryRecord {
    fn from_runs(model: String, runs: &[&RunMetrics]) -> Self {
        let pick = |f: fn(&RegressionMetrics) -> Option<f64>| {
            MeanStd::from_defined(runs.iter().map(|r| f(&r.metrics)))
        };
        Self {
            model,
            stats: SummaryStats {
                r: pick(|m| m.r),
                r2: pick(|m| m.r2),
                rmse: pick(|m| Some(m.rmse)),
                mae: pick(|m| Some(m.mae)),
                mape: pick(|m| m.mape_percent),
            },
        }
    }

    /// Mean/std pairs in summary column order.
    #[must_use]
    pub fn values(&self) -> [f64; 10] {
        let s = &self.stats;
        [
            s.r.mean, s.r.std, s.r2.mean, s.r2.std, s.rmse.mean, s.rmse.std, s.mae.mean,
            s.mae.std, s.mape.mean, s.mape.std,
        ]
    }

    fn csv_row(&self) -> Vec<String> {
        std::iter::once(self.model.clone())
            .chain(self.values().iter().map(f64::to_string))
            .collect()
    }
}

/// Everything recovered from one walk of the results tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Per-record metrics, sorted by model then run
    pub runs: Vec<RunMetrics>,
    /// Per-model summary, sorted by model
    pub summary: Vec<SummaryRecord>,
    /// Files that could not be read as records
    pub skipped_files: usize,
}

impl Aggregation {
    /// Summary row for `model`, if any record carried it.
    #[must_use]
    pub fn summary_for(&self, model: &str) -> Option<&SummaryRecord> {
        self.summary.iter().find(|s| s.model == model)
    }

    /// Write the summary table, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `Io`/`Csv` on write failure.
    pub fn write_summary_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv_writer(path.as_ref())?;
        writer.write_record(SUMMARY_COLUMNS)?;
        for record in &self.summary {
            writer.write_record(record.csv_row())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the per-record metric table, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `Io`/`Csv` on write failure.
    pub fn write_runs_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let fmt_opt = |v: Option<f64>| v.unwrap_or(f64::NAN).to_string();
        let mut writer = csv_writer(path.as_ref())?;
        writer.write_record(RUN_COLUMNS)?;
        for row in &self.runs {
            let m = &row.metrics;
            writer.write_record([
                row.model.clone(),
                row.run.to_string(),
                row.seed.to_string(),
                fmt_opt(m.r),
                fmt_opt(m.r2),
                m.rmse.to_string(),
                m.mae.to_string(),
                fmt_opt(m.mape_percent),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .summary
            .iter()
            .map(|s| s.model.len())
            .max()
            .unwrap_or(5)
            .max(5);
        write!(f, "{:<width$}", "Model")?;
        for column in &SUMMARY_COLUMNS[1..] {
            write!(f, " {column:>10}")?;
        }
        for record in &self.summary {
            write!(f, "\n{:<width$}", record.model)?;
            for value in record.values() {
                write!(f, " {value:>10.4}")?;
            }
        }
        Ok(())
    }
}

/// Recompute metrics for every record under `results_dir` and summarize
/// them per model.
///
/// Files that are not valid records are logged and skipped. A missing
/// `results_dir` yields an empty aggregation.
///
/// # Errors
///
/// Returns `Io` if a directory exists but cannot be listed.
pub fn aggregate<P: AsRef<Path>>(results_dir: P) -> Result<Aggregation> {
    let results_dir = results_dir.as_ref();
    if !results_dir.exists() {
        tracing::warn!(dir = %results_dir.display(), "results directory not found");
        return Ok(Aggregation::default());
    }

    let mut runs = Vec::new();
    let mut skipped_files = 0;
    for path in record_files(results_dir)? {
        let recomputed = read_record(&path).and_then(|record| {
            let metrics = RegressionMetrics::compute(record.y_test(), record.y_pred())?;
            warn_on_cache_drift(&record, &metrics);
            Ok(RunMetrics {
                model: record.model().to_string(),
                run: record.run(),
                seed: record.seed(),
                metrics,
            })
        });
        match recomputed {
            Ok(row) => runs.push(row),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                skipped_files += 1;
            }
        }
    }

    runs.sort_by(|a, b| a.model.cmp(&b.model).then(a.run.cmp(&b.run)));

    let mut grouped: BTreeMap<&str, Vec<&RunMetrics>> = BTreeMap::new();
    for row in &runs {
        grouped.entry(row.model.as_str()).or_default().push(row);
    }
    let summary = grouped
        .into_iter()
        .map(|(model, rows)| SummaryRecord::from_runs(model.to_string(), &rows))
        .collect();

    tracing::info!(
        records = runs.len(),
        skipped = skipped_files,
        "aggregated results"
    );
    Ok(Aggregation {
        runs,
        summary,
        skipped_files,
    })
}

fn warn_on_cache_drift(record: &ExperimentRecord, metrics: &RegressionMetrics) {
    let checks = [
        ("R2", record.r2(), metrics.r2),
        ("RMSE", record.rmse(), Some(metrics.rmse)),
        ("MAPE", record.mape().map(|m| m * 100.0), metrics.mape_percent),
    ];
    for (name, cached, fresh) in checks {
        if let (Some(cached), Some(fresh)) = (cached, fresh) {
            if (cached - fresh).abs() > CACHE_TOLERANCE * fresh.abs().max(1.0) {
                tracing::warn!(
                    model = record.model(),
                    run = record.run(),
                    metric = name,
                    cached,
                    recomputed = fresh,
                    "cached metric disagrees with recomputed value"
                );
            }
        }
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(csv::Writer::from_path(path)?)
}
