//! Series command implementation.

use anyhow::Result;
use morpho_realloc_sim::series::reallocatable_liquidity;
use morpho_realloc_sim::{liquidity_series, MetaMorphoVault, ReallocationConfig};

use crate::cli::{OutputFormat, SeriesArgs};
use crate::output::format_series_table;

pub fn run_series(
    vault: &MetaMorphoVault,
    args: &SeriesArgs,
    config: &ReallocationConfig,
    format: OutputFormat,
) -> Result<()> {
    let position = vault.position(args.market_id)?;
    let config = config.clone().with_series_anchor_step_percent(args.step);

    let reallocatable = reallocatable_liquidity(vault, args.market_id, &config)?;
    let points = liquidity_series(
        &position.market.chain_data,
        reallocatable,
        vault.asset.decimals,
        &config,
    );

    match format {
        OutputFormat::Table => {
            println!("{}", format_series_table(&points, vault.asset.decimals, args.every));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
    }

    Ok(())
}
