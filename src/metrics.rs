//! Regression metrics and summary statistics
//!
//! Every metric returns `None` when it is mathematically undefined for the
//! input (empty or mismatched slices, zero variance, zero ground truth for
//! MAPE) so callers decide how an undefined value is reported instead of
//! receiving an infinity or a division panic.
//!
//! ```rust
//! use wq_bench::metrics::{r2, rmse, mape};
//!
//! let y_true = [3.0, -0.5, 2.0, 7.0];
//! let y_pred = [2.5, 0.0, 2.0, 8.0];
//! assert!(r2(&y_true, &y_pred).unwrap() > 0.9);
//! assert!(rmse(&y_true, &y_pred).unwrap() < 1.0);
//! assert!(mape(&[0.0, 1.0], &[0.1, 1.0]).is_none());
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[allow(clippy::cast_precision_loss)]
fn len_f64(values: &[f64]) -> f64 {
    values.len() as f64
}

fn paired(y_true: &[f64], y_pred: &[f64]) -> bool {
    !y_true.is_empty() && y_true.len() == y_pred.len()
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / len_f64(values))
}

/// Sample standard deviation (ddof = 1), `None` with fewer than two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (len_f64(values) - 1.0)).sqrt())
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Undefined when the ground truth has zero variance.
#[must_use]
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if !paired(y_true, y_pred) {
        return None;
    }
    let y_mean = mean(y_true)?;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return None;
    }
    Some(1.0 - ss_res / ss_tot)
}

/// Mean squared error.
#[must_use]
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if !paired(y_true, y_pred) {
        return None;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Some(sum / len_f64(y_true))
}

/// Root mean squared error.
#[must_use]
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    mse(y_true, y_pred).map(f64::sqrt)
}

/// Mean absolute error.
#[must_use]
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if !paired(y_true, y_pred) {
        return None;
    }
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Some(sum / len_f64(y_true))
}

/// Mean absolute percentage error as a fraction (0.05 = 5%).
///
/// Undefined as soon as any ground-truth value is exactly zero.
#[must_use]
pub fn mape(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if !paired(y_true, y_pred) || y_true.iter().any(|t| *t == 0.0) {
        return None;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| ((t - p) / t).abs())
        .sum();
    Some(sum / len_f64(y_true))
}

/// Pearson correlation coefficient between truth and prediction.
///
/// Undefined when either side has zero variance.
#[must_use]
pub fn pearson_r(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if !paired(y_true, y_pred) {
        return None;
    }
    let mt = mean(y_true)?;
    let mp = mean(y_pred)?;
    let (mut cov, mut vt, mut vp) = (0.0, 0.0, 0.0);
    for (t, p) in y_true.iter().zip(y_pred) {
        let (dt, dp) = (t - mt, p - mp);
        cov += dt * dp;
        vt += dt * dt;
        vp += dp * dp;
    }
    if vt == 0.0 || vp == 0.0 {
        return None;
    }
    Some(cov / (vt.sqrt() * vp.sqrt()))
}

/// Metric set recomputed from stored truth and predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Pearson correlation
    pub r: Option<f64>,
    /// Coefficient of determination
    pub r2: Option<f64>,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean absolute percentage error, in percent
    pub mape_percent: Option<f64>,
}

impl RegressionMetrics {
    /// Compute every metric for one prediction vector.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationFailure` if the slices are empty or differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if !paired(y_true, y_pred) {
            return Err(Error::EvaluationFailure(format!(
                "cannot score {} predictions against {} targets",
                y_pred.len(),
                y_true.len()
            )));
        }
        Ok(Self {
            r: pearson_r(y_true, y_pred),
            r2: r2(y_true, y_pred),
            rmse: rmse(y_true, y_pred).unwrap_or(f64::NAN),
            mae: mae(y_true, y_pred).unwrap_or(f64::NAN),
            mape_percent: mape(y_true, y_pred).map(|m| m * 100.0),
        })
    }
}
