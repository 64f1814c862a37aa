//! Market command implementation.

use alloy_primitives::U256;
use anyhow::Result;
use morpho_realloc_sim::target::{classify_market_with_config, get_reallocation_data_with_config};
use morpho_realloc_sim::{
    Limit, MarketId, MarketSnapshot, MetaMorphoVault, RangePosition, ReallocationConfig,
    ReallocationData, VaultPosition,
};
use serde::Serialize;

use crate::cli::{MarketArgs, OutputFormat};
use crate::output::{format_market_detail, format_markets_table};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarketView {
    market_id: MarketId,
    snapshot: MarketSnapshot,
    supply_assets: U256,
    supply_cap: Limit,
    max_in: U256,
    max_out: U256,
    status: Option<RangePosition>,
    reallocation_data: Option<ReallocationData>,
}

impl MarketView {
    fn new(position: &VaultPosition, config: &ReallocationConfig) -> Self {
        let market = &position.market;
        Self {
            market_id: position.market_id(),
            snapshot: market.chain_data.snapshot(),
            supply_assets: position.supply_assets,
            supply_cap: position.supply_cap,
            max_in: position.flow_caps.max_in,
            max_out: position.flow_caps.max_out,
            status: classify_market_with_config(&market.chain_data, market.strategy.as_ref(), config),
            reallocation_data: get_reallocation_data_with_config(
                &market.chain_data,
                market.strategy.as_ref(),
                config,
            ),
        }
    }
}

pub fn run_market(
    vault: &MetaMorphoVault,
    args: &MarketArgs,
    config: &ReallocationConfig,
    format: OutputFormat,
) -> Result<()> {
    match args.market_id {
        Some(market_id) => {
            let position = vault.position(market_id)?;
            let view = MarketView::new(position, config);
            match format {
                OutputFormat::Table => {
                    println!(
                        "{}",
                        format_market_detail(vault, position, view.status, view.reallocation_data)
                    );
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
            }
        }
        None => match format {
            OutputFormat::Table => {
                println!("{}", format_markets_table(vault, config));
            }
            OutputFormat::Json => {
                let views: Vec<MarketView> = vault
                    .positions
                    .values()
                    .map(|position| MarketView::new(position, config))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            }
        },
    }

    Ok(())
}
