//! Experiment Record - one persisted result per (run, model)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trainer::RawImportance;
use crate::{Error, Result};

/// Importance of one feature for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Raw score reported by the trainer
    pub importance: f64,
    /// Spread of the raw score across repeats
    pub stddev: f64,
    /// `importance / Σ importance` over all features
    pub normalized_importance: f64,
}

/// Normalize raw importances so the normalized values sum to 1.
///
/// Non-finite raw scores or spreads are stored as `0.0`. When the scores sum
/// to zero (or to a non-finite value) there is no meaningful ratio, and every
/// feature gets an equal `1/n` share instead.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize_importance(
    raw: &BTreeMap<String, RawImportance>,
) -> BTreeMap<String, FeatureImportance> {
    let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
    let raw: BTreeMap<&String, RawImportance> = raw
        .iter()
        .map(|(name, r)| {
            if !(r.importance.is_finite() && r.stddev.is_finite()) {
                tracing::warn!(
                    feature = %name,
                    importance = r.importance,
                    stddev = r.stddev,
                    "non-finite importance replaced by 0"
                );
            }
            let clean = RawImportance {
                importance: finite_or_zero(r.importance),
                stddev: finite_or_zero(r.stddev),
            };
            (name, clean)
        })
        .collect();
    let total: f64 = raw.values().map(|r| r.importance).sum();
    let usable = total.is_finite() && total.abs() > f64::EPSILON;
    if !usable && !raw.is_empty() {
        tracing::debug!(total, "raw importances sum to zero, using uniform shares");
    }
    let uniform = 1.0 / raw.len().max(1) as f64;

    raw.iter()
        .map(|(name, r)| {
            let normalized_importance = if usable { r.importance / total } else { uniform };
            (
                (*name).clone(),
                FeatureImportance {
                    importance: r.importance,
                    stddev: r.stddev,
                    normalized_importance,
                },
            )
        })
        .collect()
}

/// Result of evaluating one leaderboard model in one run.
///
/// Created once at evaluation time and never mutated. The held-out inputs,
/// truth and predictions are stored verbatim so metrics can be recomputed
/// without retraining. Field names on disk follow the established result
/// file layout (`Model`, `R2`, `Best Config`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    run: u32,
    seed: u64,
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "R2")]
    r2: Option<f64>,
    #[serde(rename = "RMSE")]
    rmse: Option<f64>,
    #[serde(rename = "MAPE")]
    mape: Option<f64>,
    #[serde(rename = "Best Config")]
    best_config: serde_json::Value,
    #[serde(rename = "Feature importance")]
    feature_importance: BTreeMap<String, FeatureImportance>,
    #[serde(rename = "X_test")]
    x_test: Vec<Vec<f64>>,
    y_test: Vec<f64>,
    y_pred: Vec<f64>,
}

impl ExperimentRecord {
    /// Create a builder with the identifying fields.
    ///
    /// # Arguments
    ///
    /// * `run` - 1-indexed run number
    /// * `seed` - Split seed used by that run
    /// * `model` - Leaderboard model identifier
    #[must_use]
    pub fn builder(run: u32, seed: u64, model: impl Into<String>) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(run, seed, model)
    }

    /// Get the 1-indexed run number.
    #[must_use]
    pub const fn run(&self) -> u32 {
        self.run
    }

    /// Get the split seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Cached R² at evaluation time.
    #[must_use]
    pub const fn r2(&self) -> Option<f64> {
        self.r2
    }

    /// Cached RMSE at evaluation time.
    #[must_use]
    pub const fn rmse(&self) -> Option<f64> {
        self.rmse
    }

    /// Cached MAPE (fraction) at evaluation time.
    #[must_use]
    pub const fn mape(&self) -> Option<f64> {
        self.mape
    }

    /// Hyperparameters as reported by the trainer.
    #[must_use]
    pub const fn best_config(&self) -> &serde_json::Value {
        &self.best_config
    }

    /// Feature importances keyed by feature name.
    #[must_use]
    pub const fn feature_importance(&self) -> &BTreeMap<String, FeatureImportance> {
        &self.feature_importance
    }

    /// Held-out feature rows.
    #[must_use]
    pub fn x_test(&self) -> &[Vec<f64>] {
        &self.x_test
    }

    /// Held-out ground truth.
    #[must_use]
    pub fn y_test(&self) -> &[f64] {
        &self.y_test
    }

    /// Predictions for the held-out rows.
    #[must_use]
    pub fn y_pred(&self) -> &[f64] {
        &self.y_pred
    }

    /// Check the held-out arrays line up.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` if `X_test`, `y_test` and `y_pred` differ
    /// in length or hold a non-finite value.
    pub fn validate(&self) -> Result<()> {
        if self.x_test.len() != self.y_test.len() || self.y_test.len() != self.y_pred.len() {
            return Err(Error::EvaluationFailure(format!(
                "run {} model {}: X_test={}, y_test={}, y_pred={}",
                self.run,
                self.model,
                self.x_test.len(),
                self.y_test.len(),
                self.y_pred.len()
            )));
        }
        let finite = |v: &f64| v.is_finite();
        if !(self.y_test.iter().all(finite)
            && self.y_pred.iter().all(finite)
            && self.x_test.iter().flatten().all(finite))
        {
            return Err(Error::EvaluationFailure(format!(
                "run {} model {}: held-out arrays contain non-finite values",
                self.run, self.model
            )));
        }
        Ok(())
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    run: u32,
    seed: u64,
    model: String,
    r2: Option<f64>,
    rmse: Option<f64>,
    mape: Option<f64>,
    best_config: serde_json::Value,
    feature_importance: BTreeMap<String, FeatureImportance>,
    x_test: Vec<Vec<f64>>,
    y_test: Vec<f64>,
    y_pred: Vec<f64>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run: u32, seed: u64, model: impl Into<String>) -> Self {
        Self {
            run,
            seed,
            model: model.into(),
            r2: None,
            rmse: None,
            mape: None,
            best_config: serde_json::Value::Null,
            feature_importance: BTreeMap::new(),
            x_test: Vec::new(),
            y_test: Vec::new(),
            y_pred: Vec::new(),
        }
    }

    /// Set the cached metrics. Undefined metrics stay `None`.
    #[must_use]
    pub const fn metrics(mut self, r2: Option<f64>, rmse: Option<f64>, mape: Option<f64>) -> Self {
        self.r2 = r2;
        self.rmse = rmse;
        self.mape = mape;
        self
    }

    /// Set the hyperparameter mapping.
    #[must_use]
    pub fn best_config(mut self, config: serde_json::Value) -> Self {
        self.best_config = config;
        self
    }

    /// Set already-normalized feature importances.
    #[must_use]
    pub fn feature_importance(mut self, importance: BTreeMap<String, FeatureImportance>) -> Self {
        self.feature_importance = importance;
        self
    }

    /// Set the held-out inputs, truth and predictions.
    #[must_use]
    pub fn held_out(mut self, x_test: Vec<Vec<f64>>, y_test: Vec<f64>, y_pred: Vec<f64>) -> Self {
        self.x_test = x_test;
        self.y_test = y_test;
        self.y_pred = y_pred;
        self
    }

    /// Build the `ExperimentRecord`.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` if the held-out arrays differ in length.
    pub fn build(self) -> Result<ExperimentRecord> {
        let record = ExperimentRecord {
            run: self.run,
            seed: self.seed,
            model: self.model,
            r2: self.r2,
            rmse: self.rmse,
            mape: self.mape,
            best_config: self.best_config,
            feature_importance: self.feature_importance,
            x_test: self.x_test,
            y_test: self.y_test,
            y_pred: self.y_pred,
        };
        record.validate()?;
        Ok(record)
    }
}
