//! Error types for wq-bench
//!
//! Each variant carries enough context to tell the operator which run, file or
//! column needs attention.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// wq-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream dataset could not be fetched or parsed
    #[error("Dataset unavailable: {0}")]
    DataUnavailable(String),

    /// Expected columns missing or not numeric after coercion
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Split ratio would leave the train or test side empty
    #[error("Invalid split: {0}\nChoose a split ratio strictly between 0 and 1 that leaves rows on both sides")]
    InvalidSplit(String),

    /// Trainer produced no model within its budget
    #[error("Training failed: {0}")]
    TrainingFailure(String),

    /// A metric or importance score could not be computed
    #[error("Evaluation failed: {0}")]
    EvaluationFailure(String),

    /// A result file could not be written
    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited text error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error stops the whole batch rather than a single run.
    ///
    /// Data and configuration problems affect every run equally, so there is
    /// no point continuing with the next seed.
    #[must_use]
    pub const fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable(_)
                | Self::SchemaMismatch(_)
                | Self::InvalidSplit(_)
                | Self::InvalidConfig(_)
        )
    }
}
