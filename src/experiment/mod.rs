//! Experiment orchestration and persisted results
//!
//! ## Schema Overview
//!
//! ```text
//! BatchReport (1) ──< RunReport (N)            in memory, printed at the end
//!                         │
//!                         └──< ExperimentRecord (one per leaderboard model)
//!                                 ├── results/<model>/result_run_<n>.json
//!                                 └── results_model_best/result_run_<n>.json (best only)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wq_bench::config::BenchConfig;
//! use wq_bench::dataset::TableProvider;
//! use wq_bench::experiment::ExperimentRunner;
//! use wq_bench::trainer::BaselineTrainer;
//!
//! let config = BenchConfig::default().with_run_count(3);
//! let provider = TableProvider::from_source(&config.source)?;
//! let runner = ExperimentRunner::new(config, provider, BaselineTrainer::new())?;
//! let report = runner.run_batch()?;
//! println!("{report}");
//! # Ok::<(), wq_bench::Error>(())
//! ```

mod record;
mod run_report;
mod runner;
mod store;

pub use record::{
    normalize_importance, ExperimentRecord, ExperimentRecordBuilder, FeatureImportance,
};
pub use run_report::{BatchReport, RunReport, RunStatus};
pub use runner::{evaluate, ExperimentRunner};
pub use store::{
    model_dirs, read_record, record_file_name, record_files, Destination, ResultStore, BEST_DIR,
    RESULTS_DIR,
};
