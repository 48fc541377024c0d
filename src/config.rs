//! Benchmark configuration
//!
//! Every knob that drives a batch lives in [`BenchConfig`]. Values come from a
//! JSON file (missing keys fall back to the defaults below) and can be
//! overridden with the `with_*` setters before the batch starts.
//!
//! ```rust
//! use wq_bench::config::BenchConfig;
//!
//! let config = BenchConfig::default().with_run_count(3).with_master_seed(7);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.run_count, 3);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::DataSource;
use crate::{Error, Result};

/// Default number of independent experiments
pub const DEFAULT_RUN_COUNT: usize = 100;

/// Default per-run training wall-clock cap (20 minutes)
pub const DEFAULT_TIME_BUDGET_SECONDS: u64 = 20 * 60;

/// Default parallelism hint passed to the trainer
pub const DEFAULT_CPU_BUDGET: usize = 8;

/// Default held-out fraction
pub const DEFAULT_SPLIT_RATIO: f64 = 0.2;

/// Default master seed for the seed sequence
pub const DEFAULT_MASTER_SEED: u64 = 42;

/// Default summary table location, relative to the working directory
pub const DEFAULT_SUMMARY_PATH: &str = "analysis/metrics_summary.csv";

/// Configuration for one benchmark batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of independent experiments
    pub run_count: usize,
    /// Per-run training wall-clock cap in seconds
    pub time_budget_seconds: u64,
    /// Parallelism hint passed to the trainer
    pub cpu_budget: usize,
    /// Held-out fraction, strictly between 0 and 1
    pub split_ratio: f64,
    /// Controls the reproducible seed sequence
    pub master_seed: u64,
    /// Output directory for result records
    pub storage_root: PathBuf,
    /// Where the water-quality measurements come from
    pub source: DataSource,
    /// Summary table written by the aggregator
    pub summary_path: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            run_count: DEFAULT_RUN_COUNT,
            time_budget_seconds: DEFAULT_TIME_BUDGET_SECONDS,
            cpu_budget: DEFAULT_CPU_BUDGET,
            split_ratio: DEFAULT_SPLIT_RATIO,
            master_seed: DEFAULT_MASTER_SEED,
            storage_root: PathBuf::from("."),
            source: DataSource::default(),
            summary_path: PathBuf::from(DEFAULT_SUMMARY_PATH),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::InvalidConfig(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.run_count == 0 {
            return Err(Error::InvalidConfig("run_count must be at least 1".into()));
        }
        if self.cpu_budget == 0 {
            return Err(Error::InvalidConfig("cpu_budget must be at least 1".into()));
        }
        if self.time_budget_seconds == 0 {
            return Err(Error::InvalidConfig(
                "time_budget_seconds must be at least 1".into(),
            ));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "split_ratio must be in (0, 1), got {}",
                self.split_ratio
            )));
        }
        Ok(())
    }

    /// Set the number of runs.
    #[must_use]
    pub const fn with_run_count(mut self, run_count: usize) -> Self {
        self.run_count = run_count;
        self
    }

    /// Set the per-run time budget in seconds.
    #[must_use]
    pub const fn with_time_budget_seconds(mut self, seconds: u64) -> Self {
        self.time_budget_seconds = seconds;
        self
    }

    /// Set the CPU budget.
    #[must_use]
    pub const fn with_cpu_budget(mut self, cpu_budget: usize) -> Self {
        self.cpu_budget = cpu_budget;
        self
    }

    /// Set the held-out fraction.
    #[must_use]
    pub const fn with_split_ratio(mut self, split_ratio: f64) -> Self {
        self.split_ratio = split_ratio;
        self
    }

    /// Set the master seed.
    #[must_use]
    pub const fn with_master_seed(mut self, master_seed: u64) -> Self {
        self.master_seed = master_seed;
        self
    }

    /// Set the storage root.
    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Set the dataset source.
    #[must_use]
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Set the summary output path.
    #[must_use]
    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = path.into();
        self
    }
}
