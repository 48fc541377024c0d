//! Experiment Runner - repeated seeded fits with per-model persistence
//!
//! Each run moves through `SPLIT → FIT → (PREDICT → EVALUATE → PERSIST
//! [→ PERSIST_BEST]) per model → DONE`. Runs execute strictly one after
//! another; only the pre-generated seed list is shared between them.

use std::time::Duration;

use super::record::normalize_importance;
use super::store::{Destination, ResultStore};
use super::{BatchReport, ExperimentRecord, RunReport};
use crate::config::BenchConfig;
use crate::dataset::{Dataset, DatasetProvider};
use crate::metrics;
use crate::seeds::generate_seeds;
use crate::trainer::{EvalMetric, FitOptions, FittedModels, Frame, Trainer};
use crate::{Error, Result};

/// Drives a batch of runs over a dataset provider and a trainer.
#[derive(Debug)]
pub struct ExperimentRunner<P, T> {
    config: BenchConfig,
    provider: P,
    trainer: T,
    store: ResultStore,
}

impl<P, T> ExperimentRunner<P, T>
where
    P: DatasetProvider,
    T: Trainer,
{
    /// Create a runner writing under `config.storage_root`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(config: BenchConfig, provider: P, trainer: T) -> Result<Self> {
        config.validate()?;
        let store = ResultStore::new(config.storage_root.clone());
        Ok(Self {
            config,
            provider,
            trainer,
            store,
        })
    }

    /// The store records are written to.
    #[must_use]
    pub const fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Seeds for every run, derived from the master seed.
    #[must_use]
    pub fn seeds(&self) -> Vec<u64> {
        generate_seeds(self.config.master_seed, self.config.run_count)
    }

    /// Execute every run.
    ///
    /// A run that fails to train, evaluate or persist is reported and the
    /// batch moves on to the next seed.
    ///
    /// # Errors
    ///
    /// Stops early only on batch-fatal errors (data unavailable, schema
    /// mismatch, unusable split), which would fail every remaining run too.
    pub fn run_batch(&self) -> Result<BatchReport> {
        let seeds = self.seeds();
        let mut batch = BatchReport::new();

        tracing::info!(
            runs = seeds.len(),
            master_seed = self.config.master_seed,
            root = %self.store.root().display(),
            "starting batch"
        );

        for (index, &seed) in seeds.iter().enumerate() {
            let run = u32::try_from(index + 1)
                .map_err(|_| Error::InvalidConfig("run_count exceeds u32::MAX".into()))?;
            let report = self.run_one(run, seed)?;
            batch.push(report);
        }

        tracing::info!(
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            records = batch.records_written(),
            "batch finished"
        );
        Ok(batch)
    }

    /// Execute a single run.
    ///
    /// # Errors
    ///
    /// Returns only batch-fatal errors; everything else is folded into the
    /// returned report.
    pub fn run_one(&self, run: u32, seed: u64) -> Result<RunReport> {
        let mut report = RunReport::new(run, seed);
        report.start();

        match self.execute(&mut report) {
            Ok(()) => {
                tracing::info!(
                    run,
                    seed,
                    records = report.records_written(),
                    best = report.best_model().unwrap_or("-"),
                    "run complete"
                );
                report.succeed();
            }
            Err(e) if e.is_batch_fatal() => {
                tracing::error!(run, seed, error = %e, "aborting batch");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(run, seed, error = %e, "run skipped");
                report.fail(e.to_string());
            }
        }
        Ok(report)
    }

    fn execute(&self, report: &mut RunReport) -> Result<()> {
        let (run, seed) = (report.run(), report.seed());
        let dataset = self.provider.load(self.config.split_ratio, seed)?;

        let options = FitOptions {
            label: dataset.target_name.clone(),
            task: dataset.task,
            eval_metric: EvalMetric::R2,
            time_budget: Duration::from_secs(self.config.time_budget_seconds),
            cpu_budget: self.config.cpu_budget,
            seed,
        };
        let fitted = self.trainer.fit(Frame::train(&dataset), &options)?;
        let best = fitted.best_model().to_string();

        for model in fitted.leaderboard() {
            let record = match evaluate(&fitted, &dataset, &model, run, seed) {
                Ok(record) => record,
                Err(e @ Error::EvaluationFailure(_)) => {
                    tracing::warn!(run, seed, model = %model, error = %e, "model skipped");
                    report.model_skipped();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let is_best = model == best;
            let destinations: &[Destination] = if is_best {
                &[Destination::Model, Destination::Best]
            } else {
                &[Destination::Model]
            };
            for &destination in destinations {
                self.store.persist(&record, destination)?;
            }

            report.record_written();
            if is_best {
                report.best_written(model.as_str());
            }
        }
        Ok(())
    }
}

/// Predict, score and package one leaderboard model.
///
/// Metrics that are undefined for this split are stored as `None`. An
/// importance or hyperparameter query that fails leaves that field empty
/// rather than dropping the record.
///
/// # Errors
///
/// Returns `EvaluationFailure` if the model cannot predict the held-out rows
/// or predicts a non-finite value, since JSON has no representation for it.
pub fn evaluate<F: FittedModels>(
    fitted: &F,
    dataset: &Dataset,
    model: &str,
    run: u32,
    seed: u64,
) -> Result<ExperimentRecord> {
    let y_pred = fitted.predict(model, &dataset.x_test)?;
    if y_pred.len() != dataset.y_test.len() {
        return Err(Error::EvaluationFailure(format!(
            "model '{model}' returned {} predictions for {} rows",
            y_pred.len(),
            dataset.y_test.len()
        )));
    }
    if let Some(row) = y_pred.iter().position(|p| !p.is_finite()) {
        return Err(Error::EvaluationFailure(format!(
            "model '{model}' predicted {} for held-out row {row}",
            y_pred[row]
        )));
    }

    let r2 = metrics::r2(&dataset.y_test, &y_pred);
    let rmse = metrics::rmse(&dataset.y_test, &y_pred);
    let mape = metrics::mape(&dataset.y_test, &y_pred);
    if mape.is_none() {
        tracing::debug!(run, model, "MAPE undefined: zero in held-out target");
    }

    let feature_importance = match fitted.feature_importance(model, Frame::train(dataset)) {
        Ok(raw) => normalize_importance(&raw),
        Err(e) => {
            tracing::warn!(run, model, error = %e, "feature importance unavailable");
            Default::default()
        }
    };
    let best_config = fitted.hyperparameters(model).unwrap_or_else(|e| {
        tracing::warn!(run, model, error = %e, "hyperparameters unavailable");
        serde_json::Value::Null
    });

    ExperimentRecord::builder(run, seed, model)
        .metrics(r2, rmse, mape)
        .best_config(best_config)
        .feature_importance(feature_importance)
        .held_out(dataset.x_test.clone(), dataset.y_test.clone(), y_pred)
        .build()
}
