//! Result Store - durable JSON files for experiment records
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── results/
//! │   ├── <model>/result_run_<n>.json     one per (run, model)
//! │   └── ...
//! └── results_model_best/
//!     └── result_run_<n>.json             copy of run n's best model
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ExperimentRecord;
use crate::{Error, Result};

/// Directory holding one subdirectory per model.
pub const RESULTS_DIR: &str = "results";

/// Directory holding the best model's record of each run.
pub const BEST_DIR: &str = "results_model_best";

/// Where a record is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Model-scoped location, `results/<model>/`
    Model,
    /// Best-model index, `results_model_best/`
    Best,
}

/// Filesystem store for experiment records.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory scanned by the aggregator.
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    /// Directory of best-model copies.
    #[must_use]
    pub fn best_dir(&self) -> PathBuf {
        self.root.join(BEST_DIR)
    }

    /// File a record would be written to.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the model identifier cannot be used as
    /// a directory name.
    pub fn path_for(&self, record: &ExperimentRecord, destination: Destination) -> Result<PathBuf> {
        let dir = match destination {
            Destination::Model => {
                validate_model_id(record.model())?;
                self.results_dir().join(record.model())
            }
            Destination::Best => self.best_dir(),
        };
        Ok(dir.join(record_file_name(record.run())))
    }

    /// Write `record` to `destination`, creating directories as needed.
    ///
    /// An existing file for the same run is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the directory or file cannot be written.
    pub fn persist(&self, record: &ExperimentRecord, destination: Destination) -> Result<PathBuf> {
        let path = self.path_for(record, destination)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::PersistenceFailure(format!("cannot create {}: {e}", dir.display()))
            })?;
        }

        let bytes = to_pretty_json(record)?;
        let mut file = fs::File::create(&path).map_err(|e| {
            Error::PersistenceFailure(format!("cannot create {}: {e}", path.display()))
        })?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| Error::PersistenceFailure(format!("cannot write {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "record persisted");
        Ok(path)
    }

    /// Every record file under `results/`, see [`record_files`].
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be listed.
    pub fn record_files(&self) -> Result<Vec<PathBuf>> {
        record_files(self.results_dir())
    }

    /// Record files of one model, sorted by path. Empty if the model has
    /// never been persisted.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` for an unusable model identifier and `Io`
    /// if the directory exists but cannot be listed.
    pub fn records_for_model(&self, model: &str) -> Result<Vec<PathBuf>> {
        validate_model_id(model)?;
        let dir = self.results_dir().join(model);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        json_files_in(&dir)
    }
}

/// File name for a run's record.
#[must_use]
pub fn record_file_name(run: u32) -> String {
    format!("result_run_{run}.json")
}

/// Read one persisted record.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `Json` if it is not a record, and
/// `EvaluationFailure` if its held-out arrays differ in length.
pub fn read_record<P: AsRef<Path>>(path: P) -> Result<ExperimentRecord> {
    let text = fs::read_to_string(path.as_ref())?;
    let record: ExperimentRecord = serde_json::from_str(&text)?;
    record.validate()?;
    Ok(record)
}

/// Model subdirectories of `results_dir`, sorted by path.
///
/// # Errors
///
/// Returns `Io` if the directory cannot be listed.
pub fn model_dirs<P: AsRef<Path>>(results_dir: P) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(results_dir.as_ref())? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// List `*.json` files one level below each model subdirectory of
/// `results_dir`, sorted by path. Loose files directly in `results_dir` are
/// ignored.
///
/// # Errors
///
/// Returns `Io` if a directory cannot be listed.
pub fn record_files<P: AsRef<Path>>(results_dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in model_dirs(results_dir)? {
        files.extend(json_files_in(&dir)?);
    }
    Ok(files)
}

fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Serialize with four-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

fn validate_model_id(model: &str) -> Result<()> {
    let bad = model.is_empty()
        || model == "."
        || model == ".."
        || model.contains(['/', '\\'])
        || model.contains('\0');
    if bad {
        return Err(Error::PersistenceFailure(format!(
            "model identifier '{model}' cannot be used as a directory name"
        )));
    }
    Ok(())
}
