//! Long-to-wide reshaping of station measurements

use std::collections::{BTreeMap, HashMap};

use super::Table;
use crate::{Error, Result};

/// One row of the long-format upstream table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    /// Monitoring station identifier
    pub site_id: String,
    /// Sampling date as published
    pub sample_date: String,
    /// Measurement-type label (e.g. `EC`, `pH`)
    pub item: String,
    /// Raw measured value, not yet coerced
    pub value: String,
}

/// One row per (site, date), one cell per measurement type.
///
/// Rows are ordered by numeric site id, then by date string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    rows: BTreeMap<(i64, String), HashMap<String, String>>,
}

impl WideTable {
    /// Number of (site, date) rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries a cell for `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.values().any(|cells| cells.contains_key(column))
    }

    /// Raw cell value for a (site, date, column) triple.
    #[must_use]
    pub fn cell(&self, site: i64, date: &str, column: &str) -> Option<&str> {
        self.rows
            .get(&(site, date.to_string()))
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }
}

/// Pivot measurements into a [`WideTable`], keeping sites below `site_limit`.
///
/// Site ids that are not integral numbers cannot be compared against the
/// limit and are dropped. A repeated (site, date, item) keeps the last value.
#[must_use]
pub fn pivot_measurements(measurements: &[Measurement], site_limit: i64) -> WideTable {
    let mut rows: BTreeMap<(i64, String), HashMap<String, String>> = BTreeMap::new();
    let mut dropped = 0_usize;

    for m in measurements {
        let Some(site) = parse_site_id(&m.site_id) else {
            dropped += 1;
            continue;
        };
        if site >= site_limit {
            continue;
        }
        rows.entry((site, m.sample_date.trim().to_string()))
            .or_default()
            .insert(m.item.trim().to_string(), m.value.clone());
    }

    if dropped > 0 {
        tracing::debug!(dropped, "measurements with non-numeric site ids skipped");
    }

    WideTable { rows }
}

/// Site ids may be published as integers or as integral floats (`1001.0`).
#[allow(clippy::cast_possible_truncation)]
fn parse_site_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15).then(|| value as i64)
}

/// Select `features` and `target` from the wide table as numbers.
///
/// Rows where any selected cell is missing or fails numeric coercion are
/// dropped.
///
/// # Errors
///
/// Returns `SchemaMismatch` if a column never appears, or if no row survives
/// coercion.
pub fn select_columns(wide: &WideTable, features: &[&str], target: &str) -> Result<Table> {
    for &column in features.iter().chain(std::iter::once(&target)) {
        if !wide.has_column(column) {
            return Err(Error::SchemaMismatch(format!(
                "column '{column}' not present in pivoted data"
            )));
        }
    }

    let mut x = Vec::new();
    let mut y = Vec::new();
    for cells in wide.rows.values() {
        let coerce = |column: &str| cells.get(column).and_then(|v| coerce_numeric(v));

        let Some(target_value) = coerce(target) else {
            continue;
        };
        let row: Option<Vec<f64>> = features.iter().map(|c| coerce(*c)).collect();
        if let Some(row) = row {
            x.push(row);
            y.push(target_value);
        }
    }

    if y.is_empty() {
        return Err(Error::SchemaMismatch(
            "no rows with numeric values in every selected column".into(),
        ));
    }

    tracing::debug!(kept = y.len(), total = wide.len(), "rows after numeric coercion");
    Table::new(features.iter().map(|s| (*s).to_string()).collect(), target, x, y)
}

fn coerce_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
