//! Upstream water-quality source (HTTP spreadsheet export or local CSV)

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::pivot::{pivot_measurements, select_columns, Measurement};
use super::Table;
use crate::{Error, Result};

/// Published CSV export of the monitoring spreadsheet.
pub const DEFAULT_SOURCE_URL: &str =
    "https://docs.google.com/spreadsheet/ccc?key=1a5DReajqstsnUSUdTcRm8pZqeIP9ZmOct834UcOLmjg&output=csv";

/// Stations with ids at or above this value are excluded.
pub const SITE_ID_LIMIT: i64 = 1008;

/// Input variables, in matrix column order.
pub const FEATURE_COLUMNS: [&str; 4] = ["EC", "SS", "WT", "pH"];

/// Regression target (River Pollution Index).
pub const TARGET_COLUMN: &str = "RPI";

const SITE_COLUMN: &str = "siteid";
const DATE_COLUMN: &str = "sampledate";
const ITEM_COLUMN: &str = "itemengabbreviation";
const VALUE_COLUMN: &str = "itemvalue";

/// Where to read the long-format measurement table from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// HTTP GET returning CSV
    Url(String),
    /// CSV file on disk
    File(PathBuf),
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Url(DEFAULT_SOURCE_URL.to_string())
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl DataSource {
    /// Read the raw CSV text.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` on any transport or file error.
    pub fn fetch_text(&self) -> Result<String> {
        match self {
            Self::File(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::DataUnavailable(format!("cannot read {}: {e}", path.display()))
            }),
            Self::Url(url) => fetch_url(url),
        }
    }

    /// Fetch, pivot and clean the water-quality table.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` if the source cannot be read or parsed, and
    /// `SchemaMismatch` if the expected columns are absent.
    pub fn load_table(&self) -> Result<Table> {
        let text = self.fetch_text()?;
        let measurements = parse_measurements(&text)?;
        let wide = pivot_measurements(&measurements, SITE_ID_LIMIT);
        select_columns(&wide, &FEATURE_COLUMNS, TARGET_COLUMN)
    }
}

#[cfg(feature = "http")]
fn fetch_url(url: &str) -> Result<String> {
    let response = reqwest::blocking::get(url)
        .map_err(|e| Error::DataUnavailable(format!("GET {url} failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::DataUnavailable(format!("GET {url} returned {status}")));
    }
    response
        .text()
        .map_err(|e| Error::DataUnavailable(format!("cannot read body of {url}: {e}")))
}

#[cfg(not(feature = "http"))]
fn fetch_url(url: &str) -> Result<String> {
    Err(Error::DataUnavailable(format!(
        "cannot fetch {url}: built without the `http` feature"
    )))
}

/// Parse long-format CSV into measurements.
///
/// Only the four identifying columns are read; any others are ignored.
///
/// # Errors
///
/// Returns `SchemaMismatch` if a required header is missing, and
/// `DataUnavailable` if the text is not parseable CSV.
pub fn parse_measurements(text: &str) -> Result<Vec<Measurement>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::DataUnavailable(format!("unreadable CSV header: {e}")))?
        .clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::SchemaMismatch(format!("missing column '{name}'")))
    };
    let site = position(SITE_COLUMN)?;
    let date = position(DATE_COLUMN)?;
    let item = position(ITEM_COLUMN)?;
    let value = position(VALUE_COLUMN)?;

    let mut measurements = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| Error::DataUnavailable(format!("malformed CSV row: {e}")))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        measurements.push(Measurement {
            site_id: field(site),
            sample_date: field(date),
            item: field(item),
            value: field(value),
        });
    }
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "siteid,sitename,sampledate,itemengabbreviation,itemvalue\n\
        1001,A,2021/01/05,EC,310\n\
        1001,A,2021/01/05,SS,12\n\
        1001,A,2021/01/05,WT,18.5\n\
        1001,A,2021/01/05,pH,7.4\n\
        1001,A,2021/01/05,RPI,2.25\n\
        1009,B,2021/01/05,EC,280\n";

    #[test]
    fn test_parse_reads_required_columns() {
        let rows = parse_measurements(SAMPLE).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].site_id, "1001");
        assert_eq!(rows[0].item, "EC");
        assert_eq!(rows[4].value, "2.25");
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse_measurements("siteid,itemvalue\n1,2\n").unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_load_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wq.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let table = DataSource::File(path).load_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.feature_names(), ["EC", "SS", "WT", "pH"]);
        assert_eq!(table.target_name(), "RPI");
        assert_eq!(table.features()[0], vec![310.0, 12.0, 18.5, 7.4]);
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let err = DataSource::File(PathBuf::from("/nonexistent/wq.csv"))
            .load_table()
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
        assert!(err.is_batch_fatal());
    }

    #[test]
    fn test_source_serde_shape() {
        let json = serde_json::to_string(&DataSource::File(PathBuf::from("a.csv"))).unwrap();
        assert_eq!(json, r#"{"file":"a.csv"}"#);
    }
}
