//! Checkout Simulator CLI
//!
//! Runs single store scenarios or full parameter sweeps and writes the
//! per-customer results as CSV.

use checkout_sim_core::{
    run_store, run_sweep, write_records, write_records_to_path, ScenarioConfig, SweepConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkout-sim")]
#[command(about = "Discrete-event simulation of supermarket checkout counters")]
#[command(version)]
struct Cli {
    /// Log every customer activity (DEBUG level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every combination of shopping time, packing time and capacity
    Sweep {
        /// JSON sweep configuration; defaults apply to missing fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the CSV files are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Base seed; each point derives its own seed from it
        #[arg(long)]
        seed: Option<u64>,

        /// Print the sweep report as JSON to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Run a single store scenario over one opening day
    Run {
        /// Upper bound of the shopping duration draw
        #[arg(long, default_value = "20")]
        shopping_items_time: u32,

        /// Upper bound of the packing duration draw
        #[arg(long, default_value = "3")]
        packing_items_time: u32,

        /// Regular counters (self-checkout gets twice as many)
        #[arg(long, default_value = "1")]
        capacity: usize,

        /// RNG seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// CSV file to write; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "checkout_sim_core=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so CSV on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sweep {
            config,
            output_dir,
            seed,
            summary,
        } => {
            let mut sweep = match config {
                Some(path) => SweepConfig::from_json_file(&path)?,
                None => SweepConfig::default(),
            };
            if let Some(dir) = output_dir {
                sweep.output_dir = dir;
            }
            if let Some(seed) = seed {
                sweep.seed = seed;
            }
            std::fs::create_dir_all(&sweep.output_dir)?;

            let report = run_sweep(&sweep)?;
            if summary {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            let failed = report.failed().count();
            tracing::info!(
                succeeded = report.succeeded(),
                failed,
                "sweep complete"
            );
            if failed > 0 {
                return Err(format!("{} sweep point(s) failed", failed).into());
            }
        }

        Commands::Run {
            shopping_items_time,
            packing_items_time,
            capacity,
            seed,
            output,
        } => {
            let defaults = SweepConfig::default();
            let config = ScenarioConfig {
                shopping_items_time,
                packing_items_time,
                capacity,
                horizon: defaults.horizon(),
                seed,
            };
            let run = run_store(&config)?;

            match output {
                Some(path) => write_records_to_path(&path, &run.records, &defaults.clock())?,
                None => write_records(std::io::stdout().lock(), &run.records, &defaults.clock())?,
            }
            for failure in &run.failures {
                tracing::warn!(process = %failure.name, error = %failure.error, "process failed");
            }
        }
    }

    Ok(())
}
