//! reltab CLI
//!
//! Entry point for the demo binary: runs the seeded library workload against
//! the engine and prints the final snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use reltab::config::Config;
use reltab::simulation::LibrarySimulation;

#[derive(Parser, Debug)]
#[command(name = "reltab")]
#[command(about = "In-memory relational table engine demo", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "reltab.toml")]
    config: PathBuf,

    /// Number of workload steps (overrides the config)
    #[arg(long)]
    steps: Option<usize>,

    /// Seed for the random event stream (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final snapshot and history as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if args.config.exists() {
        Config::from_file(&args.config).context("Failed to load configuration")?
    } else {
        eprintln!(
            "Warning: Config file {} not found, using defaults",
            args.config.display()
        );
        Config::default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let steps = args.steps.unwrap_or(config.simulation.steps);
    let seed = args.seed.or(config.simulation.seed);

    let mut simulation =
        LibrarySimulation::new(config.library.clone()).context("Failed to set up the workload")?;
    let report = simulation.run(steps, seed).context("Workload run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} books in the library after {} steps:", report.books.len(), steps);
        for book in &report.books {
            println!("  {book}");
        }
        let failed = report.history.iter().filter(|e| !e.ok).count();
        println!("{} events, {} failed", report.history.len(), failed);
    }

    Ok(())
}
