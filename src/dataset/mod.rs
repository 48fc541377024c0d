//! Dataset loading and deterministic train/test splitting
//!
//! ## Pipeline
//!
//! ```text
//! DataSource (HTTP / file) ──> long-format CSV ──> pivot per (site, date)
//!                                                      │
//!                     Table (features + target) <──────┘
//!                          │
//!                          └──> TableProvider::load(split_ratio, seed) ──> Dataset
//! ```
//!
//! The upstream source is read once; each run only re-splits the cached
//! [`Table`] with its own seed.
//!
//! ```rust
//! use wq_bench::dataset::{DatasetProvider, Table, TableProvider};
//!
//! let table = Table::new(
//!     vec!["x".into()],
//!     "y",
//!     (0..10).map(|i| vec![f64::from(i)]).collect(),
//!     (0..10).map(f64::from).collect(),
//! )?;
//! let provider = TableProvider::new("toy", table);
//! let dataset = provider.load(0.2, 7)?;
//! assert_eq!(dataset.x_test.len(), 2);
//! assert_eq!(dataset.x_train.len(), 8);
//! # Ok::<(), wq_bench::Error>(())
//! ```

mod pivot;
mod source;

pub use pivot::{pivot_measurements, select_columns, Measurement, WideTable};
pub use source::{
    parse_measurements, DataSource, DEFAULT_SOURCE_URL, FEATURE_COLUMNS, SITE_ID_LIMIT,
    TARGET_COLUMN,
};

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Kind of learning task. This domain only ever regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Continuous target
    #[default]
    Regression,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regression => f.write_str("regression"),
        }
    }
}

/// Numeric feature matrix plus target, after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    feature_names: Vec<String>,
    target_name: String,
    features: Vec<Vec<f64>>,
    target: Vec<f64>,
}

impl Table {
    /// Create a table from row-major features and a target vector.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` if row widths or lengths disagree.
    pub fn new(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Vec<Vec<f64>>,
        target: Vec<f64>,
    ) -> Result<Self> {
        if features.len() != target.len() {
            return Err(Error::SchemaMismatch(format!(
                "{} feature rows but {} target values",
                features.len(),
                target.len()
            )));
        }
        if let Some(row) = features.iter().find(|r| r.len() != feature_names.len()) {
            return Err(Error::SchemaMismatch(format!(
                "row has {} values, expected {}",
                row.len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            target,
        })
    }

    /// Feature column names, in matrix order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Target column name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Target values.
    #[must_use]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// One seeded train/test split of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Human-readable dataset name
    pub name: String,
    /// Task kind (always regression here)
    pub task: TaskKind,
    /// Feature names, in column order of the matrices
    pub feature_names: Vec<String>,
    /// Target column name
    pub target_name: String,
    /// Training features (row-major)
    pub x_train: Vec<Vec<f64>>,
    /// Training target
    pub y_train: Vec<f64>,
    /// Held-out features (row-major)
    pub x_test: Vec<Vec<f64>>,
    /// Held-out target
    pub y_test: Vec<f64>,
}

/// Source of seeded dataset splits.
pub trait DatasetProvider {
    /// Split the dataset, holding out `split_ratio` of the rows.
    ///
    /// The same `(split_ratio, seed)` must always produce the same split.
    ///
    /// # Errors
    ///
    /// `DataUnavailable`/`SchemaMismatch` when the data cannot be produced,
    /// `InvalidSplit` when either side of the split would be empty.
    fn load(&self, split_ratio: f64, seed: u64) -> Result<Dataset>;
}

/// [`DatasetProvider`] over an in-memory table.
#[derive(Debug, Clone)]
pub struct TableProvider {
    name: String,
    table: Table,
}

impl TableProvider {
    /// Wrap an already-cleaned table.
    #[must_use]
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// Read the water-quality measurements once and keep the cleaned table.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` if the source cannot be read, or
    /// `SchemaMismatch` if the expected columns are missing.
    pub fn from_source(source: &DataSource) -> Result<Self> {
        let table = source.load_table()?;
        tracing::info!(rows = table.len(), source = %source, "dataset loaded");
        Ok(Self::new("WQ Taiwan", table))
    }

    /// The wrapped table.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }
}

impl DatasetProvider for TableProvider {
    fn load(&self, split_ratio: f64, seed: u64) -> Result<Dataset> {
        let (train_idx, test_idx) = split_indices(self.table.len(), split_ratio, seed)?;

        let gather_x = |idx: &[usize]| -> Vec<Vec<f64>> {
            idx.iter().map(|&i| self.table.features[i].clone()).collect()
        };
        let gather_y = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| self.table.target[i]).collect() };

        Ok(Dataset {
            name: self.name.clone(),
            task: TaskKind::Regression,
            feature_names: self.table.feature_names.clone(),
            target_name: self.table.target_name.clone(),
            x_train: gather_x(&train_idx),
            y_train: gather_y(&train_idx),
            x_test: gather_x(&test_idx),
            y_test: gather_y(&test_idx),
        })
    }
}

/// Shuffle `0..n` with `seed` and cut it into (train, test) index sets.
///
/// The test side gets `ceil(n * split_ratio)` rows.
///
/// # Errors
///
/// Returns `InvalidSplit` if the ratio is outside (0, 1) or either side
/// would be empty.
pub fn split_indices(n: usize, split_ratio: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(split_ratio > 0.0 && split_ratio < 1.0) {
        return Err(Error::InvalidSplit(format!(
            "split ratio {split_ratio} is outside (0, 1)"
        )));
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n_test = (n as f64 * split_ratio).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::InvalidSplit(format!(
            "{n} rows with ratio {split_ratio} leaves {n_test} test and {} train rows",
            n.saturating_sub(n_test)
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}
