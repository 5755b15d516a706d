//! Scratchpad-Harvest main entry point
//!
//! This is the command-line interface for the resumable scratchpad harvester.

use anyhow::Context;
use clap::Parser;
use scratchpad_harvest::config::{resolve_config, ConfigOverrides};
use scratchpad_harvest::harvest;
use scratchpad_harvest::listing::SortOrder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scratchpad-Harvest: a resumable scratchpad listing harvester
///
/// Pages through the scratchpad listing, writes every program to a JSON store,
/// and picks up from the last saved cursor when run again. Press Ctrl-C to
/// stop; pages already received are saved, and a page still downloading is
/// fetched again on the next run.
#[derive(Parser, Debug)]
#[command(name = "scratchpad-harvest")]
#[command(version)]
#[command(about = "A resumable scratchpad listing harvester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of programs to scrape
    #[arg(short, long, value_name = "ITEMS")]
    max: Option<u64>,

    /// Number of programs requested per page
    #[arg(short, long, value_name = "ITEMS")]
    limit: Option<u32>,

    /// Listing order
    #[arg(short, long, value_enum)]
    sort: Option<SortOrder>,

    /// API cursor to start from instead of the saved one
    #[arg(short, long)]
    cursor: Option<String>,

    /// Output file; `.json` is appended to a bare name
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Discard any existing output and start from the beginning
    #[arg(long)]
    overwrite: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let overrides = ConfigOverrides {
        max_items: cli.max,
        page_size: cli.limit,
        cursor: cli.cursor,
        sort: cli.sort,
        output: cli.output,
        overwrite: cli.overwrite,
    };

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config =
        resolve_config(cli.config.as_deref(), overrides).context("Invalid configuration")?;

    tracing::info!(
        "Harvesting '{}' listing into {}",
        config.listing.sort,
        config.output.path
    );

    let summary = harvest(config).await.context("Harvest failed")?;

    println!("{}", summary);
    if let Some(token) = &summary.final_token {
        println!("Last API cursor: {}", token);
    }

    if !summary.stop_reason.is_success() {
        tracing::error!(
            "Harvest ended early ({}); run again to resume from the saved cursor",
            summary.stop_reason
        );
        std::process::exit(1);
    }

    Ok(())
}

/// Sets up logging based on verbosity flags
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scratchpad_harvest=info,warn"),
            1 => EnvFilter::new("scratchpad_harvest=debug,info"),
            2 => EnvFilter::new("scratchpad_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
