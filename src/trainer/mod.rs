//! Trainer capability interface
//!
//! The AutoML engine is an external collaborator. Anything that can fit a
//! leaderboard of regressors within a time/CPU budget and then answer
//! predictions, feature importances and hyperparameters per model can drive
//! the benchmark:
//!
//! ```text
//! Trainer::fit(train, options) ──> FittedModels
//!                                     ├── leaderboard() / best_model()
//!                                     ├── predict(model, X)
//!                                     ├── feature_importance(model, reference)
//!                                     └── hyperparameters(model)
//! ```
//!
//! [`BaselineTrainer`] is the in-tree implementation.

mod baseline;
mod importance;
mod models;

pub use baseline::{BaselineTrainer, FittedBaseline};
pub use importance::{permutation_importance, DEFAULT_REPEATS};
pub use models::{Candidate, FittedRegressor, Standardizer};

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, TaskKind};
use crate::Result;

/// Borrowed view of a feature matrix with its target.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Feature names, in column order
    pub feature_names: &'a [String],
    /// Row-major features
    pub x: &'a [Vec<f64>],
    /// Target values
    pub y: &'a [f64],
}

impl<'a> Frame<'a> {
    /// Training side of a dataset split.
    #[must_use]
    pub fn train(dataset: &'a Dataset) -> Self {
        Self {
            feature_names: &dataset.feature_names,
            x: &dataset.x_train,
            y: &dataset.y_train,
        }
    }

    /// Held-out side of a dataset split.
    #[must_use]
    pub fn test(dataset: &'a Dataset) -> Self {
        Self {
            feature_names: &dataset.feature_names,
            x: &dataset.x_test,
            y: &dataset.y_test,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Score the trainer optimizes when ranking its leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvalMetric {
    /// Coefficient of determination
    #[default]
    R2,
}

/// Everything a fit call needs besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Target column name
    pub label: String,
    /// Task kind
    pub task: TaskKind,
    /// Leaderboard ranking metric
    pub eval_metric: EvalMetric,
    /// Wall-clock cap for the whole fit
    pub time_budget: Duration,
    /// Parallelism hint
    pub cpu_budget: usize,
    /// Seed the trainer may honour for its own randomness
    pub seed: u64,
}

/// Raw importance score reported by a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawImportance {
    /// Score drop when the feature is destroyed
    pub importance: f64,
    /// Spread of that drop across repeats
    pub stddev: f64,
}

/// A trainer that fits a leaderboard of models.
pub trait Trainer {
    /// Fitted state answering per-model queries
    type Fitted: FittedModels;

    /// Fit candidate models on `train` within the budget in `options`.
    ///
    /// # Errors
    ///
    /// Returns `TrainingFailure` if no model could be produced.
    fn fit(&self, train: Frame<'_>, options: &FitOptions) -> Result<Self::Fitted>;
}

/// Queries against a finished fit.
pub trait FittedModels {
    /// Model identifiers, best first.
    fn leaderboard(&self) -> Vec<String>;

    /// Identifier of the top model.
    fn best_model(&self) -> &str;

    /// Predict `x` with one model.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` for an unknown model.
    fn predict(&self, model: &str, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Raw importance per feature name for one model.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` for an unknown model or unscorable data.
    fn feature_importance(
        &self,
        model: &str,
        reference: Frame<'_>,
    ) -> Result<BTreeMap<String, RawImportance>>;

    /// Opaque hyperparameter mapping for one model.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` for an unknown model.
    fn hyperparameters(&self, model: &str) -> Result<serde_json::Value>;
}
