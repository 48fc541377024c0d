//! # wq-bench: Repeated-Seed AutoML Benchmark for Water-Quality Regression
//!
//! wq-bench repeatedly splits a river water-quality dataset with
//! reproducible seeds, fits a leaderboard of regressors on each split,
//! persists one JSON record per (run, model), and later recomputes metrics
//! from those records into a per-model mean/std summary.
//!
//! ## Pipeline
//!
//! ```text
//! DatasetProvider ──> ExperimentRunner ──> Trainer (fit / predict / importance)
//!                            │
//!                            └──> results/<model>/result_run_<n>.json
//!                                        │
//!                     aggregate() <──────┘ ──> analysis/metrics_summary.csv
//! ```
//!
//! ## Design Principles
//!
//! - **Reproducibility**: every split seed derives from one master seed
//! - **Failure isolation**: a run that cannot train is reported, not fatal
//! - **Recompute, don't trust**: summaries come from stored predictions
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use wq_bench::aggregate::aggregate;
//! use wq_bench::config::BenchConfig;
//! use wq_bench::dataset::TableProvider;
//! use wq_bench::experiment::ExperimentRunner;
//! use wq_bench::trainer::BaselineTrainer;
//!
//! let config = BenchConfig::default().with_run_count(10);
//! let provider = TableProvider::from_source(&config.source)?;
//! let runner = ExperimentRunner::new(config.clone(), provider, BaselineTrainer::new())?;
//! println!("{}", runner.run_batch()?);
//!
//! let aggregation = aggregate(runner.store().results_dir())?;
//! aggregation.write_summary_csv(&config.summary_path)?;
//! # Ok::<(), wq_bench::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod seeds;
pub mod trainer;

pub use error::{Error, Result};
