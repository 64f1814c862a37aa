//! Morpho Reallocation CLI - plan vault liquidity moves from a snapshot.

mod cli;
mod commands;
mod output;
mod snapshot;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{run_borrow, run_candidates, run_market, run_seek, run_series};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let path = cli
        .snapshot
        .as_deref()
        .context("No snapshot given: pass --snapshot or set MORPHO_SNAPSHOT")?;
    let vault = snapshot::load_vault(path)?;
    let config = cli.reallocation_config();

    match &cli.command {
        Commands::Market(args) => run_market(&vault, args, &config, cli.format)?,
        Commands::Candidates(args) => run_candidates(&vault, args, &config, cli.format)?,
        Commands::Seek(args) => run_seek(&vault, args, &config, cli.format)?,
        Commands::Series(args) => run_series(&vault, args, &config, cli.format)?,
        Commands::Borrow(args) => run_borrow(&vault, args, &config, cli.format)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
