//! Permutation feature importance

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{Frame, RawImportance};
use crate::metrics::{mean, r2, sample_std};
use crate::{Error, Result};

/// Shuffles per feature.
pub const DEFAULT_REPEATS: usize = 5;

/// Importance of each feature as the mean drop in R² when its column is
/// shuffled, over `repeats` independent shuffles.
///
/// `predict` maps a feature matrix to predictions. Shuffles are driven by
/// `seed`, so the same inputs give the same scores.
///
/// # Errors
///
/// Returns `EvaluationFailure` if the reference data cannot be scored
/// (empty, or a constant target).
pub fn permutation_importance<F>(
    reference: Frame<'_>,
    repeats: usize,
    seed: u64,
    predict: F,
) -> Result<BTreeMap<String, RawImportance>>
where
    F: Fn(&[Vec<f64>]) -> Vec<f64>,
{
    let baseline = r2(reference.y, &predict(reference.x)).ok_or_else(|| {
        Error::EvaluationFailure("reference data cannot be scored by R2".into())
    })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut scores = BTreeMap::new();
    let mut column: Vec<f64> = Vec::with_capacity(reference.len());

    for (j, name) in reference.feature_names.iter().enumerate() {
        let mut drops = Vec::with_capacity(repeats);
        for _ in 0..repeats.max(1) {
            column.clear();
            column.extend(reference.x.iter().map(|row| row[j]));
            column.shuffle(&mut rng);

            let permuted: Vec<Vec<f64>> = reference
                .x
                .iter()
                .zip(&column)
                .map(|(row, v)| {
                    let mut row = row.clone();
                    row[j] = *v;
                    row
                })
                .collect();
            // A permuted score can only be undefined if the target is
            // constant, which the baseline check already ruled out.
            let score = r2(reference.y, &predict(&permuted)).unwrap_or(baseline);
            drops.push(baseline - score);
        }

        scores.insert(
            name.clone(),
            RawImportance {
                importance: mean(&drops).unwrap_or(0.0),
                stddev: sample_std(&drops).unwrap_or(0.0),
            },
        );
    }

    Ok(scores)
}
