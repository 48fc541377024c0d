//! In-tree trainer over a fixed candidate portfolio

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;

use super::importance::{permutation_importance, DEFAULT_REPEATS};
use super::models::{Candidate, FittedRegressor};
use super::{FitOptions, FittedModels, Frame, RawImportance, Trainer};
use crate::dataset::split_indices;
use crate::metrics::r2;
use crate::{Error, Result};

/// Fraction of training rows held back to rank candidates.
const HOLDOUT_RATIO: f64 = 0.2;

/// Fits every [`Candidate`] in parallel and ranks them by holdout R².
///
/// Candidates are scored on an internal holdout carved from the training
/// rows, then refit on all training rows. Candidates that have not started
/// when the time budget runs out are skipped.
#[derive(Debug, Clone)]
pub struct BaselineTrainer {
    candidates: Vec<Candidate>,
    importance_repeats: usize,
}

impl Default for BaselineTrainer {
    fn default() -> Self {
        Self {
            candidates: Candidate::portfolio(),
            importance_repeats: DEFAULT_REPEATS,
        }
    }
}

impl BaselineTrainer {
    /// Trainer over the default portfolio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidate portfolio.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Set the number of shuffles per feature for importance.
    #[must_use]
    pub const fn with_importance_repeats(mut self, repeats: usize) -> Self {
        self.importance_repeats = repeats;
        self
    }
}

#[derive(Debug, Clone)]
struct Entry {
    candidate: Candidate,
    holdout_score: f64,
    model: FittedRegressor,
}

/// Leaderboard produced by [`BaselineTrainer`].
#[derive(Debug, Clone)]
pub struct FittedBaseline {
    entries: Vec<Entry>,
    importance_repeats: usize,
    seed: u64,
}

impl FittedBaseline {
    /// Holdout R² of a model, if it is on the leaderboard.
    #[must_use]
    pub fn holdout_score(&self, model: &str) -> Option<f64> {
        self.entry(model).map(|e| e.holdout_score)
    }

    fn entry(&self, model: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.candidate.name() == model)
    }

    fn require(&self, model: &str) -> Result<&Entry> {
        self.entry(model)
            .ok_or_else(|| Error::EvaluationFailure(format!("model '{model}' is not on the leaderboard")))
    }
}

impl Trainer for BaselineTrainer {
    type Fitted = FittedBaseline;

    fn fit(&self, train: Frame<'_>, options: &FitOptions) -> Result<FittedBaseline> {
        if train.is_empty() {
            return Err(Error::TrainingFailure("no training rows".into()));
        }
        // A budget too large to represent as an instant never expires.
        let deadline = Instant::now().checked_add(options.time_budget);

        // Too few rows for a holdout: rank on the training rows themselves.
        let (fit_idx, val_idx) = split_indices(train.len(), HOLDOUT_RATIO, options.seed)
            .unwrap_or_else(|_| ((0..train.len()).collect(), (0..train.len()).collect()));
        let gather_x = |idx: &[usize]| -> Vec<Vec<f64>> { idx.iter().map(|&i| train.x[i].clone()).collect() };
        let gather_y = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| train.y[i]).collect() };
        let (fit_x, fit_y) = (gather_x(&fit_idx), gather_y(&fit_idx));
        let (val_x, val_y) = (gather_x(&val_idx), gather_y(&val_idx));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.cpu_budget.max(1))
            .build()
            .map_err(|e| Error::TrainingFailure(format!("cannot build thread pool: {e}")))?;

        let mut entries: Vec<Entry> = pool.install(|| {
            self.candidates
                .par_iter()
                .filter_map(|candidate| {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        tracing::debug!(model = candidate.name(), "skipped: time budget exhausted");
                        return None;
                    }
                    let scored = candidate.fit(&fit_x, &fit_y).and_then(|fitted| {
                        let score = r2(&val_y, &fitted.predict(&val_x)).unwrap_or(f64::NEG_INFINITY);
                        Ok((score, candidate.fit(train.x, train.y)?))
                    });
                    match scored {
                        Ok((holdout_score, model)) => Some(Entry {
                            candidate: *candidate,
                            holdout_score,
                            model,
                        }),
                        Err(e) => {
                            tracing::warn!(model = candidate.name(), error = %e, "candidate failed");
                            None
                        }
                    }
                })
                .collect()
        });

        if entries.is_empty() {
            return Err(Error::TrainingFailure(format!(
                "no candidate finished within {:?} for label '{}'",
                options.time_budget, options.label
            )));
        }

        entries.sort_by(|a, b| {
            b.holdout_score
                .total_cmp(&a.holdout_score)
                .then_with(|| a.candidate.name().cmp(b.candidate.name()))
        });

        tracing::debug!(
            models = entries.len(),
            best = entries[0].candidate.name(),
            score = entries[0].holdout_score,
            "leaderboard ready"
        );

        Ok(FittedBaseline {
            entries,
            importance_repeats: self.importance_repeats,
            seed: options.seed,
        })
    }
}

impl FittedModels for FittedBaseline {
    fn leaderboard(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.candidate.name().to_string())
            .collect()
    }

    fn best_model(&self) -> &str {
        // fit() never returns an empty leaderboard
        self.entries.first().map_or("", |e| e.candidate.name())
    }

    fn predict(&self, model: &str, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self.require(model)?.model.predict(x))
    }

    fn feature_importance(
        &self,
        model: &str,
        reference: Frame<'_>,
    ) -> Result<BTreeMap<String, RawImportance>> {
        let fitted = &self.require(model)?.model;
        permutation_importance(reference, self.importance_repeats, self.seed, |x| {
            fitted.predict(x)
        })
    }

    fn hyperparameters(&self, model: &str) -> Result<serde_json::Value> {
        Ok(self.require(model)?.candidate.hyperparameters())
    }
}
