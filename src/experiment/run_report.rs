//! Run Report - lifecycle and outcome of one benchmark run

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is created but not yet started.
    Pending,
    /// Run is currently executing.
    Running,
    /// Run completed and every record was written.
    Success,
    /// Run was abandoned; see the report's error.
    Failed,
}

/// Outcome of a single run within a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    run: u32,
    seed: u64,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    records_written: usize,
    best_model: Option<String>,
    models_skipped: usize,
    error: Option<String>,
}

impl RunReport {
    /// Create a new run report in Pending status.
    ///
    /// # Arguments
    ///
    /// * `run` - 1-indexed run number
    /// * `seed` - Split seed for the run
    #[must_use]
    pub const fn new(run: u32, seed: u64) -> Self {
        Self {
            run,
            seed,
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            records_written: 0,
            best_model: None,
            models_skipped: 0,
            error: None,
        }
    }

    /// Get the run number.
    #[must_use]
    pub const fn run(&self) -> u32 {
        self.run
    }

    /// Get the split seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the end timestamp, if the run has finished.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Number of per-model records written (best-model copies excluded).
    #[must_use]
    pub const fn records_written(&self) -> usize {
        self.records_written
    }

    /// Best model of the run, once its copy has been written.
    #[must_use]
    pub fn best_model(&self) -> Option<&str> {
        self.best_model.as_deref()
    }

    /// Leaderboard models that could not be evaluated.
    #[must_use]
    pub const fn models_skipped(&self) -> usize {
        self.models_skipped
    }

    /// Failure message, if the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Transition from Pending to Running.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Count one persisted model record.
    pub fn record_written(&mut self) {
        self.records_written += 1;
    }

    /// Note the best model's copy was written.
    pub fn best_written(&mut self, model: impl Into<String>) {
        self.best_model = Some(model.into());
    }

    /// Count one model that could not be evaluated.
    pub fn model_skipped(&mut self) {
        self.models_skipped += 1;
    }

    /// Finish successfully.
    pub fn succeed(&mut self) {
        self.status = RunStatus::Success;
        self.ended_at = Some(Utc::now());
    }

    /// Finish with a failure message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.ended_at = Some(Utc::now());
    }
}

/// All run reports of one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    runs: Vec<RunReport>,
}

impl BatchReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished run.
    pub fn push(&mut self, report: RunReport) {
        self.runs.push(report);
    }

    /// Every run, in execution order.
    #[must_use]
    pub fn runs(&self) -> &[RunReport] {
        &self.runs
    }

    /// Runs that finished successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(RunStatus::Success)
    }

    /// Runs that were skipped after a failure.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(RunStatus::Failed)
    }

    /// Per-model records written across all runs.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.runs.iter().map(RunReport::records_written).sum()
    }

    /// Models skipped across all runs.
    #[must_use]
    pub fn models_skipped(&self) -> usize {
        self.runs.iter().map(RunReport::models_skipped).sum()
    }

    fn count(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|r| r.status() == status).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} runs: {} succeeded, {} failed",
            self.runs.len(),
            self.succeeded(),
            self.failed()
        )?;
        write!(
            f,
            "{} model records written, {} models skipped",
            self.records_written(),
            self.models_skipped()
        )?;
        for run in self.runs.iter().filter(|r| r.status() == RunStatus::Failed) {
            write!(
                f,
                "\n  run {} (seed {}): {}",
                run.run(),
                run.seed(),
                run.error().unwrap_or("unknown error")
            )?;
        }
        Ok(())
    }
}
