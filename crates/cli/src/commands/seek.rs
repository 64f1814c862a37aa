//! Seek command implementation.

use anyhow::{Context, Result};
use morpho_realloc_sim::reallocation::seek_reallocation_with_config;
use morpho_realloc_sim::{MetaMorphoVault, Reallocation, ReallocationConfig};
use tracing::debug;

use crate::cli::{OutputFormat, SeekArgs};
use crate::output::format_plans;

/// Plans for the requested market, or for every market out of range.
///
/// Each plan is replayed against the vault before it is reported.
fn find_plans(
    vault: &MetaMorphoVault,
    args: &SeekArgs,
    config: &ReallocationConfig,
) -> Result<Vec<Reallocation>> {
    let market_ids = match args.market_id {
        Some(market_id) => {
            vault.position(market_id)?;
            vec![market_id]
        }
        None => vault.positions.keys().copied().collect(),
    };

    let mut plans = Vec::new();
    for market_id in market_ids {
        let Some(plan) = seek_reallocation_with_config(market_id, vault, args.filter_idle, config)
        else {
            debug!(%market_id, "no reallocation");
            continue;
        };

        vault
            .apply_reallocation(&plan)
            .with_context(|| format!("Plan for market {} does not apply", market_id))?;
        plans.push(plan);
    }

    Ok(plans)
}

pub fn run_seek(
    vault: &MetaMorphoVault,
    args: &SeekArgs,
    config: &ReallocationConfig,
    format: OutputFormat,
) -> Result<()> {
    let plans = find_plans(vault, args, config)?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_plans(vault, &plans));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }

    Ok(())
}
