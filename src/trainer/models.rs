//! Candidate regressors for the built-in trainer

use serde_json::json;

use crate::{Error, Result};

/// Column-wise z-score scaling learned from training rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    /// Learn per-column mean and population standard deviation.
    ///
    /// Constant columns get a scale of 1 so they map to zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>]) -> Self {
        let width = x.first().map_or(0, Vec::len);
        let n = x.len().max(1) as f64;
        let mut means = vec![0.0; width];
        for row in x {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut scales = vec![0.0; width];
        for row in x {
            for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut scales {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Self { means, scales }
    }

    /// Scale one row.
    #[must_use]
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Model family and its fixed hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Candidate {
    /// Predicts the training mean
    Mean,
    /// Ordinary least squares
    Linear,
    /// L2-penalized least squares on standardized features
    Ridge {
        /// Penalty strength
        alpha: f64,
    },
    /// k-nearest-neighbour average
    KNeighbors {
        /// Neighbourhood size
        k: usize,
    },
}

impl Candidate {
    /// The fixed portfolio tried on every fit.
    #[must_use]
    pub fn portfolio() -> Vec<Self> {
        vec![
            Self::Mean,
            Self::Linear,
            Self::Ridge { alpha: 1.0 },
            Self::KNeighbors { k: 5 },
        ]
    }

    /// Leaderboard identifier.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mean => "MeanBaseline",
            Self::Linear => "LinearRegression",
            Self::Ridge { .. } => "RidgeRegression",
            Self::KNeighbors { .. } => "KNeighborsRegressor",
        }
    }

    /// Hyperparameters as reported in result records.
    #[must_use]
    pub fn hyperparameters(&self) -> serde_json::Value {
        match self {
            Self::Mean => json!({}),
            Self::Linear => json!({ "fit_intercept": true }),
            Self::Ridge { alpha } => json!({ "alpha": alpha, "fit_intercept": true }),
            Self::KNeighbors { k } => json!({ "n_neighbors": k, "weights": "uniform" }),
        }
    }

    /// Fit this candidate.
    ///
    /// # Errors
    ///
    /// Returns `TrainingFailure` on empty input or a singular system.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<FittedRegressor> {
        if y.is_empty() || x.len() != y.len() {
            return Err(Error::TrainingFailure(format!(
                "{}: {} rows, {} targets",
                self.name(),
                x.len(),
                y.len()
            )));
        }
        #[allow(clippy::cast_precision_loss)]
        let y_mean = y.iter().sum::<f64>() / y.len() as f64;

        match *self {
            Self::Mean => Ok(FittedRegressor::Mean { value: y_mean }),
            // Tiny ridge keeps collinear columns solvable without visibly
            // changing the least-squares solution.
            Self::Linear => fit_least_squares(x, y, y_mean, 1e-10, self.name()),
            Self::Ridge { alpha } => fit_least_squares(x, y, y_mean, alpha, self.name()),
            Self::KNeighbors { k } => {
                let scaler = Standardizer::fit(x);
                let points = x.iter().map(|r| scaler.transform(r)).collect();
                Ok(FittedRegressor::KNeighbors {
                    scaler,
                    points,
                    targets: y.to_vec(),
                    k: k.clamp(1, y.len()),
                })
            }
        }
    }
}

/// Trained model ready for prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedRegressor {
    /// Constant prediction
    Mean {
        /// Training mean
        value: f64,
    },
    /// Linear model in standardized feature space
    Linear {
        /// Feature scaling
        scaler: Standardizer,
        /// Coefficients per standardized feature
        coef: Vec<f64>,
        /// Intercept (training target mean)
        intercept: f64,
    },
    /// Stored training points
    KNeighbors {
        /// Feature scaling
        scaler: Standardizer,
        /// Standardized training rows
        points: Vec<Vec<f64>>,
        /// Training targets
        targets: Vec<f64>,
        /// Neighbourhood size
        k: usize,
    },
}

impl FittedRegressor {
    /// Predict one row.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::Mean { value } => *value,
            Self::Linear {
                scaler,
                coef,
                intercept,
            } => {
                let z = scaler.transform(row);
                intercept + z.iter().zip(coef).map(|(a, b)| a * b).sum::<f64>()
            }
            Self::KNeighbors {
                scaler,
                points,
                targets,
                k,
            } => {
                let z = scaler.transform(row);
                let mut dist: Vec<(f64, f64)> = points
                    .iter()
                    .zip(targets)
                    .map(|(p, t)| {
                        let d: f64 = p.iter().zip(&z).map(|(a, b)| (a - b).powi(2)).sum();
                        (d, *t)
                    })
                    .collect();
                dist.sort_by(|a, b| a.0.total_cmp(&b.0));
                #[allow(clippy::cast_precision_loss)]
                let avg = dist.iter().take(*k).map(|(_, t)| t).sum::<f64>() / *k as f64;
                avg
            }
        }
    }

    /// Predict every row.
    #[must_use]
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }
}

fn fit_least_squares(
    x: &[Vec<f64>],
    y: &[f64],
    y_mean: f64,
    alpha: f64,
    name: &str,
) -> Result<FittedRegressor> {
    let scaler = Standardizer::fit(x);
    let z: Vec<Vec<f64>> = x.iter().map(|r| scaler.transform(r)).collect();
    let width = z.first().map_or(0, Vec::len);

    // Normal equations on centered data: (ZᵀZ + αI) β = Zᵀ(y - ȳ)
    let mut a = vec![vec![0.0; width]; width];
    let mut b = vec![0.0; width];
    for (row, target) in z.iter().zip(y) {
        let centered = target - y_mean;
        for i in 0..width {
            b[i] += row[i] * centered;
            for j in 0..width {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, a_row) in a.iter_mut().enumerate() {
        a_row[i] += alpha;
    }

    let coef = solve(a, b)
        .ok_or_else(|| Error::TrainingFailure(format!("{name}: singular normal equations")))?;
    Ok(FittedRegressor::Linear {
        scaler,
        coef,
        intercept: y_mean,
    })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
