//! Loan EDA - loan disbursement analysis by ethnicity
//!
//! Segments a cleaned loan table by race/ethnicity, aggregates loan amounts
//! by category and geography, and renders a fixed set of report charts.

mod charts;
mod config;
mod data;
mod report;
mod stats;

use anyhow::{Context, Result};
use clap::Parser;
use config::ReportConfig;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Loan amount analysis by ethnicity with static chart output",
    long_about = "Loads a cleaned loan table and a county demographic table, computes \
                  per-ethnicity averages, totals and top geography breakdowns, and writes \
                  PNG charts plus a summary.json to the output directory.\n\n\
                  Running without flags uses the built-in defaults."
)]
struct Args {
    /// Loan table CSV
    #[arg(long)]
    loans: Option<PathBuf>,

    /// Demographic table CSV
    #[arg(long)]
    demographics: Option<PathBuf>,

    /// Directory for chart images and the summary
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON config file overriding the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!("Arguments: {:?}", args);

    let mut config = match &args.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(loans) = args.loans {
        config.loans_path = loans;
    }
    if let Some(demographics) = args.demographics {
        config.demographics_path = demographics;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }

    let summary = report::run(&config).context("Report generation failed")?;

    info!(
        records = summary.record_count,
        categories = summary.categories.len(),
        output_dir = %config.output_dir.display(),
        "report complete"
    );
    Ok(())
}
