//! Table formatting for market, candidate and series lists.

use morpho_realloc_sim::target::classify_market_with_config;
use morpho_realloc_sim::{MarketReallocationData, MetaMorphoVault, ReallocationConfig, SeriesPoint, Warnings};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use super::{format_amount, format_limit, format_rate, format_status, format_strategy, format_usd, truncate_id};

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Supply")]
    supply: String,
    #[tabled(rename = "Borrow")]
    borrow: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
    #[tabled(rename = "Borrow APY")]
    borrow_apy: String,
    #[tabled(rename = "Supply APY")]
    supply_apy: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Strategy Amount")]
    strategy_amount: String,
    #[tabled(rename = "Flow Cap")]
    flow_cap: String,
    #[tabled(rename = "Position Limit")]
    position_limit: String,
    #[tabled(rename = "Max Amount")]
    max_amount: String,
    #[tabled(rename = "Max (USD)")]
    max_usd: String,
    #[tabled(rename = "Warnings")]
    warnings: String,
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Borrowed")]
    percentage: String,
    #[tabled(rename = "Borrow Amount")]
    borrow_amount: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
    #[tabled(rename = "Borrow APY")]
    borrow_apy: String,
    #[tabled(rename = "Supply APY")]
    supply_apy: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));

    table.to_string()
}

fn format_warnings(warnings: Option<Warnings>) -> String {
    let Some(warnings) = warnings else {
        return "-".to_string();
    };

    let mut reasons = Vec::new();
    if warnings.target_too_close_or_already_crossed {
        reasons.push("target too close");
    }
    if warnings.flow_cap_too_low {
        reasons.push("flow cap too low");
    }
    if warnings.allocation_or_cap_insufficient {
        reasons.push("allocation or cap insufficient");
    }
    if reasons.is_empty() {
        return "under usd floor".to_string();
    }
    reasons.join(", ")
}

pub fn format_markets_table(vault: &MetaMorphoVault, config: &ReallocationConfig) -> String {
    if vault.positions.is_empty() {
        return "No markets found.".to_string();
    }

    let decimals = vault.asset.decimals;
    let rows: Vec<MarketRow> = vault
        .positions
        .values()
        .map(|position| {
            let market = &position.market;
            let snapshot = market.chain_data.snapshot();
            let status = classify_market_with_config(&market.chain_data, market.strategy.as_ref(), config);

            MarketRow {
                market: truncate_id(&position.market_id()),
                supply: format_amount(snapshot.total_supply_assets, decimals),
                borrow: format_amount(snapshot.total_borrow_assets, decimals),
                utilization: format_rate(snapshot.utilization),
                borrow_apy: format_rate(snapshot.borrow_apy),
                supply_apy: format_rate(snapshot.supply_apy),
                position: format_amount(position.supply_assets, decimals),
                strategy: format_strategy(market.strategy.as_ref()),
                status: format_status(status),
            }
        })
        .collect();

    render(rows)
}

pub fn format_candidates_table(candidates: &[MarketReallocationData], decimals: u8) -> String {
    if candidates.is_empty() {
        return "No candidate markets found.".to_string();
    }

    let rows: Vec<CandidateRow> = candidates
        .iter()
        .map(|candidate| CandidateRow {
            market: truncate_id(&candidate.market_id),
            strategy_amount: format_limit(candidate.strategy_amount, decimals),
            flow_cap: format_amount(candidate.flow_cap, decimals),
            position_limit: format_limit(candidate.position_limit, decimals),
            max_amount: format_amount(candidate.max_reallocation_amount, decimals),
            max_usd: format_usd(candidate.max_reallocation_amount_usd),
            warnings: format_warnings(candidate.warnings),
        })
        .collect();

    render(rows)
}

/// Shows the points whose percentage is a multiple of `every`.
pub fn format_series_table(points: &[SeriesPoint], decimals: u8, every: u8) -> String {
    let every = every.max(1);
    let rows: Vec<SeriesRow> = points
        .iter()
        .filter(|point| point.percentage % every == 0)
        .map(|point| SeriesRow {
            percentage: format!("{}%", point.percentage),
            borrow_amount: format_amount(point.borrow_amount, decimals),
            utilization: format_rate(point.utilization),
            borrow_apy: format_rate(point.borrow_apy),
            supply_apy: format_rate(point.supply_apy),
        })
        .collect();

    if rows.is_empty() {
        return "No series points.".to_string();
    }
    render(rows)
}
