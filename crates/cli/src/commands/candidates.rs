//! Candidates command implementation.

use anyhow::{Context, Result};
use morpho_realloc_sim::math::min;
use morpho_realloc_sim::target::{classify_market_with_config, get_reallocation_data_with_config};
use morpho_realloc_sim::reallocation::get_market_reallocation_data_with_config;
use morpho_realloc_sim::{MarketReallocationData, MetaMorphoVault, RangePosition, ReallocationConfig};

use crate::cli::{CandidatesArgs, OutputFormat};
use crate::output::format_candidates_table;

/// Markets able to act as counterparties for the focus market.
///
/// A market below its band needs destinations; any other market needs sources.
fn find_candidates(
    vault: &MetaMorphoVault,
    args: &CandidatesArgs,
    config: &ReallocationConfig,
) -> Result<Vec<MarketReallocationData>> {
    let position = vault.position(args.market_id)?;
    let market = &position.market;
    let data = get_reallocation_data_with_config(&market.chain_data, market.strategy.as_ref(), config)
        .with_context(|| format!("Market {} has no reallocation target", args.market_id))?;
    let status = classify_market_with_config(&market.chain_data, market.strategy.as_ref(), config);

    let (amount, supply_reallocation) = if status == Some(RangePosition::Below) {
        (min(data.to_withdraw, position.withdrawable()), false)
    } else {
        let to_supply = position
            .cap_headroom()
            .min(data.to_supply)
            .cap(position.flow_caps.max_in);
        (to_supply, true)
    };

    Ok(get_market_reallocation_data_with_config(vault, amount, supply_reallocation, vault.chain, config)
        .into_iter()
        .filter(|candidate| candidate.market_id != args.market_id)
        .collect())
}

pub fn run_candidates(
    vault: &MetaMorphoVault,
    args: &CandidatesArgs,
    config: &ReallocationConfig,
    format: OutputFormat,
) -> Result<()> {
    let candidates = find_candidates(vault, args, config)?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_candidates_table(&candidates, vault.asset.decimals));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
    }

    Ok(())
}
