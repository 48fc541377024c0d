//! wq-bench - command line entry point
//!
//! `wq-bench run` executes the benchmark batch, `wq-bench summarize`
//! aggregates the stored results into the summary table.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use wq_bench::aggregate::aggregate;
use wq_bench::config::BenchConfig;
use wq_bench::dataset::{DataSource, TableProvider};
use wq_bench::experiment::{ExperimentRunner, ResultStore};
use wq_bench::trainer::BaselineTrainer;

#[derive(Parser)]
#[command(name = "wq-bench", version, about = "Water-quality AutoML benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the seeded experiment batch
    Run {
        /// JSON configuration file (defaults apply to missing keys)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the number of runs
        #[arg(long)]
        runs: Option<usize>,
        /// Override the storage root
        #[arg(long)]
        storage_root: Option<PathBuf>,
        /// Read the long-format CSV from a file instead of the configured source
        #[arg(long)]
        source_file: Option<PathBuf>,
    },
    /// Aggregate stored results into the summary table
    Summarize {
        /// JSON configuration file supplying `storage_root` and `summary_path`
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Storage root holding `results/` (overrides the configuration)
        #[arg(long)]
        storage_root: Option<PathBuf>,
        /// Summary CSV path (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the per-record metric table here
        #[arg(long)]
        per_run: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wq_bench=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            runs,
            storage_root,
            source_file,
        } => {
            let mut config = load_config(config)?;
            if let Some(runs) = runs {
                config = config.with_run_count(runs);
            }
            if let Some(root) = storage_root {
                config = config.with_storage_root(root);
            }
            if let Some(file) = source_file {
                config = config.with_source(DataSource::File(file));
            }
            cmd_run(config)
        }
        Commands::Summarize {
            config,
            storage_root,
            output,
            per_run,
        } => {
            let config = load_config(config)?;
            let (storage_root, output) = summary_paths(&config, storage_root, output);
            cmd_summarize(storage_root, &output, per_run)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<BenchConfig> {
    match path {
        Some(path) => BenchConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(BenchConfig::default()),
    }
}

/// Storage root and summary file, command-line flags taking precedence.
fn summary_paths(
    config: &BenchConfig,
    storage_root: Option<PathBuf>,
    output: Option<PathBuf>,
) -> (PathBuf, PathBuf) {
    (
        storage_root.unwrap_or_else(|| config.storage_root.clone()),
        output.unwrap_or_else(|| config.summary_path.clone()),
    )
}

fn cmd_run(config: BenchConfig) -> anyhow::Result<()> {
    config.validate()?;
    let provider = TableProvider::from_source(&config.source).context("loading dataset")?;
    let runner = ExperimentRunner::new(config, provider, BaselineTrainer::new())?;
    let report = runner.run_batch()?;
    println!("{report}");
    Ok(())
}

fn cmd_summarize(
    storage_root: PathBuf,
    output: &std::path::Path,
    per_run: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = ResultStore::new(storage_root);
    let aggregation = aggregate(store.results_dir())?;
    aggregation
        .write_summary_csv(output)
        .with_context(|| format!("writing {}", output.display()))?;
    if let Some(path) = per_run {
        aggregation
            .write_runs_csv(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    println!("{aggregation}");
    if aggregation.skipped_files > 0 {
        println!("({} unreadable files skipped)", aggregation.skipped_files);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_paths_fall_back_to_config() {
        let config = BenchConfig::default()
            .with_storage_root("/data/bench")
            .with_summary_path("reports/summary.csv");
        let (root, output) = summary_paths(&config, None, None);
        assert_eq!(root, PathBuf::from("/data/bench"));
        assert_eq!(output, PathBuf::from("reports/summary.csv"));
    }

    #[test]
    fn test_summary_flags_override_config() {
        let config = BenchConfig::default();
        let (root, output) = summary_paths(
            &config,
            Some(PathBuf::from("elsewhere")),
            Some(PathBuf::from("out.csv")),
        );
        assert_eq!(root, PathBuf::from("elsewhere"));
        assert_eq!(output, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_summarize_command_parses_config_flag() {
        let cli = Cli::try_parse_from(["wq-bench", "summarize", "--config", "bench.json"]).unwrap();
        match cli.command {
            Commands::Summarize { config, output, .. } => {
                assert_eq!(config, Some(PathBuf::from("bench.json")));
                assert!(output.is_none());
            }
            Commands::Run { .. } => panic!("expected summarize"),
        }
    }
}
