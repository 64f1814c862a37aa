//! Liquidity sweeps and borrow simulation.
//!
//! [`liquidity_series`] projects a market across 0 to 100% of its available
//! liquidity (idle liquidity plus whatever other markets could reallocate into
//! it). Every `series_anchor_step_percent` the point is evaluated exactly on
//! the IRM curve; points in between are linearly interpolated.
//!
//! [`simulate_borrow`] answers "what happens if someone borrows this much":
//! when the post-borrow utilization would exceed the supply target it builds
//! a reallocation plan bringing it back under.

use alloy_primitives::U256;
use serde::Serialize;
use tracing::debug;

use crate::config::ReallocationConfig;
use crate::error::{MarketId, SimError};
use crate::market::{MarketChainData, MarketSnapshot};
use crate::math::{format_units, mul_div_down, parse_units};
use crate::reallocation::{
    get_market_reallocation_data_with_config, match_supply, Reallocation,
};
use crate::vault::MetaMorphoVault;

/// Decimals of WAD-scaled rates.
const WAD_DECIMALS: u8 = 18;

/// One step of a liquidity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Share of the available liquidity borrowed, 0 to 100
    pub percentage: u8,
    pub borrow_amount: U256,
    pub utilization: U256,
    pub borrow_apy: U256,
    pub supply_apy: U256,
}

/// Liquidity a borrower could reach in `market_id`: the market's own idle
/// liquidity plus what other vault markets can reallocate into it.
///
/// # Errors
///
/// - [`SimError::MarketNotFound`] if the vault has no position in `market_id`
pub fn max_available_liquidity(
    vault: &MetaMorphoVault,
    market_id: MarketId,
    config: &ReallocationConfig,
) -> Result<U256, SimError> {
    let position = vault.position(market_id)?;
    let liquidity = position.market.chain_data.state.liquidity();
    Ok(liquidity.saturating_add(reallocatable_liquidity(vault, market_id, config)?))
}

/// What other vault markets can move into `market_id`, bounded by the
/// market's inflow cap and supply-cap headroom.
///
/// # Errors
///
/// - [`SimError::MarketNotFound`] if the vault has no position in `market_id`
pub fn reallocatable_liquidity(
    vault: &MetaMorphoVault,
    market_id: MarketId,
    config: &ReallocationConfig,
) -> Result<U256, SimError> {
    let position = vault.position(market_id)?;

    let sources = get_market_reallocation_data_with_config(vault, U256::ZERO, true, vault.chain, config)
        .into_iter()
        .filter(|candidate| candidate.market_id != market_id)
        .fold(U256::ZERO, |total, candidate| {
            total.saturating_add(candidate.max_reallocation_amount)
        });

    Ok(position
        .cap_headroom()
        .cap(sources)
        .min(position.flow_caps.max_in))
}

/// Sweeps borrowing from 0 to 100% of `market`'s liquidity plus
/// `reallocatable`, one point per percent.
///
/// Reallocated liquidity is assumed supplied up front. `decimals` are the
/// loan asset's, used when interpolating borrow amounts.
pub fn liquidity_series(
    market: &MarketChainData,
    reallocatable: U256,
    decimals: u8,
    config: &ReallocationConfig,
) -> Vec<SeriesPoint> {
    let step = config.series_anchor_step_percent.clamp(1, 100);
    let available = market.state.liquidity().saturating_add(reallocatable);
    let supply = market.state.total_supply_assets.saturating_add(reallocatable);

    let anchor = |percentage: u64| {
        let borrow_amount = mul_div_down(available, U256::from(percentage), U256::from(100));
        let projected = market.project(
            supply,
            market.state.total_borrow_assets.saturating_add(borrow_amount),
        );
        SeriesPoint {
            percentage: percentage as u8,
            borrow_amount,
            utilization: projected.utilization,
            borrow_apy: projected.borrow_apy,
            supply_apy: projected.supply_apy,
        }
    };

    (0..=100u64)
        .map(|percentage| {
            let lower = percentage - percentage % step;
            if lower == percentage {
                return anchor(percentage);
            }

            let upper = (lower + step).min(100);
            let weight = (percentage - lower) as f64 / (upper - lower) as f64;
            interpolate(&anchor(lower), &anchor(upper), percentage as u8, weight, decimals)
        })
        .collect()
}

fn interpolate(
    lower: &SeriesPoint,
    upper: &SeriesPoint,
    percentage: u8,
    weight: f64,
    decimals: u8,
) -> SeriesPoint {
    let lerp = |from: U256, to: U256, decimals: u8| {
        let from = format_units(from, decimals);
        let to = format_units(to, decimals);
        parse_units(from + (to - from) * weight, decimals)
    };

    SeriesPoint {
        percentage,
        borrow_amount: lerp(lower.borrow_amount, upper.borrow_amount, decimals),
        utilization: lerp(lower.utilization, upper.utilization, WAD_DECIMALS),
        borrow_apy: lerp(lower.borrow_apy, upper.borrow_apy, WAD_DECIMALS),
        supply_apy: lerp(lower.supply_apy, upper.supply_apy, WAD_DECIMALS),
    }
}

/// Outcome of a hypothetical borrow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BorrowSimulation {
    /// The borrow fits under the supply target, or nothing could improve it.
    #[serde(rename_all = "camelCase")]
    NotNeeded {
        before: MarketSnapshot,
        after_borrow: MarketSnapshot,
    },
    /// A plan brings the market back under the supply target.
    #[serde(rename_all = "camelCase")]
    Reallocated {
        plan: Reallocation,
        before: MarketSnapshot,
        after_reallocation: MarketSnapshot,
        after_borrow: MarketSnapshot,
    },
    /// The borrow exceeds what the market can provide, even after reallocation.
    #[serde(rename_all = "camelCase")]
    Unavailable {
        before: MarketSnapshot,
        available_liquidity: U256,
    },
}

/// Simulates borrowing `amount` from `market_id`, reallocating into it first
/// when the borrow would push utilization above
/// `config.supply_target_utilization`.
///
/// # Errors
///
/// - [`SimError::MarketNotFound`] if the vault has no position in `market_id`
pub fn simulate_borrow(
    vault: &MetaMorphoVault,
    market_id: MarketId,
    amount: U256,
    config: &ReallocationConfig,
) -> Result<BorrowSimulation, SimError> {
    let position = vault.position(market_id)?;
    let market = &position.market.chain_data;
    let state = &market.state;

    let before = market.snapshot();
    let liquidity = state.liquidity();
    let borrowed = state.total_borrow_assets.saturating_add(amount);
    let after_borrow = market.project(state.total_supply_assets, borrowed);

    if amount <= liquidity && after_borrow.utilization <= config.supply_target_utilization {
        debug!(%market_id, %amount, "borrow stays under supply target");
        return Ok(BorrowSimulation::NotNeeded { before, after_borrow });
    }

    let mut post_borrow = state.clone();
    post_borrow.total_borrow_assets = borrowed;
    let to_supply = position
        .cap_headroom()
        .min(post_borrow.supply_to_utilization(config.supply_target_utilization))
        .cap(position.flow_caps.max_in);

    let plan = if to_supply.is_zero() {
        None
    } else {
        match_supply(vault, position, to_supply, false, config)
    };

    let Some(plan) = plan else {
        if amount <= liquidity {
            debug!(%market_id, "no reallocation available, borrow proceeds above target");
            return Ok(BorrowSimulation::NotNeeded { before, after_borrow });
        }
        return Ok(BorrowSimulation::Unavailable {
            before,
            available_liquidity: liquidity,
        });
    };

    let supplied = state.total_supply_assets.saturating_add(plan.amount_reallocated);
    let available_liquidity = liquidity.saturating_add(plan.amount_reallocated);
    if amount > available_liquidity {
        return Ok(BorrowSimulation::Unavailable {
            before,
            available_liquidity,
        });
    }

    Ok(BorrowSimulation::Reallocated {
        before,
        after_reallocation: market.project(supplied, state.total_borrow_assets),
        after_borrow: market.project(supplied, borrowed),
        plan,
    })
}
