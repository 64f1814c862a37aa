//! Target resolution: how far a market sits from its strategy target and
//! what it would take to bring it back.
//!
//! # Overview
//!
//! A [`Strategy`] steers a market either by utilization or by borrow APY.
//! [`get_reallocation_data`] turns the market's current state into three
//! amounts:
//!
//! - `to_supply`: liquidity the market can absorb before reaching its target
//! - `to_withdraw`: liquidity that can leave before reaching its target
//! - `to_borrow`: extra borrowing that would bring it to target (informational)
//!
//! Markets inside their tolerance band resolve to all zeros. Markets without a
//! strategy, without a target, or on the blacklist resolve to `None`.
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::market::{MarketChainData, MarketState};
//! use morpho_realloc_sim::target::get_reallocation_data;
//! use morpho_realloc_sim::{irm::INITIAL_RATE_AT_TARGET, Limit, WAD};
//! use morpho_realloc_strategy::Strategy;
//! use alloy_primitives::{FixedBytes, U256};
//!
//! // Fully utilized market steered towards 50%
//! let state = MarketState::new(U256::from(1_000) * WAD, U256::from(1_000) * WAD, 0, U256::ZERO);
//! let market = MarketChainData::new(FixedBytes::ZERO, state, INITIAL_RATE_AT_TARGET);
//! let strategy = Strategy::utilization(WAD / U256::from(2));
//!
//! let data = get_reallocation_data(&market, Some(&strategy)).unwrap();
//! assert_eq!(data.to_supply, Limit::Finite(U256::from(1_000) * WAD));
//! assert_eq!(data.to_withdraw, U256::ZERO);
//! ```

use alloy_primitives::U256;
use morpho_realloc_strategy::{Strategy, TargetMode, TargetRange};
use serde::Serialize;
use tracing::debug;

use crate::config::ReallocationConfig;
use crate::irm::utilization_for_borrow_apy;
use crate::limit::Limit;
use crate::market::MarketChainData;
use crate::math::{min, mul_div_down};

/// Amounts that would bring a market back to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationData {
    pub to_supply: Limit,
    pub to_withdraw: U256,
    pub to_borrow: U256,
}

impl ReallocationData {
    /// Nothing to move.
    pub const NONE: ReallocationData = ReallocationData {
        to_supply: Limit::ZERO,
        to_withdraw: U256::ZERO,
        to_borrow: U256::ZERO,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Where a market's tracked metric sits relative to its tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RangePosition {
    /// Metric under the band: the market holds excess liquidity.
    Below,
    Within,
    /// Metric over the band: the market needs liquidity.
    Above,
}

/// Supply that would bring the market's borrow APY down to `wanted_apy`.
pub fn compute_supply_value(market: &MarketChainData, wanted_apy: U256) -> Limit {
    let utilization = utilization_for_borrow_apy(wanted_apy, market.rate_at_target);
    market.state.supply_to_utilization(utilization)
}

/// Withdrawal that would bring the market's borrow APY up to `wanted_apy`.
pub fn compute_withdraw_value(market: &MarketChainData, wanted_apy: U256) -> U256 {
    let utilization = utilization_for_borrow_apy(wanted_apy, market.rate_at_target);
    market.state.withdraw_to_utilization(utilization)
}

/// Borrow that would bring the market's borrow APY up to `wanted_apy`.
pub fn compute_borrow_value(market: &MarketChainData, wanted_apy: U256) -> U256 {
    let utilization = utilization_for_borrow_apy(wanted_apy, market.rate_at_target);
    market.state.borrow_to_utilization(utilization)
}

/// Reallocation amounts for `market` under `strategy`, with default thresholds.
pub fn get_reallocation_data(
    market: &MarketChainData,
    strategy: Option<&Strategy>,
) -> Option<ReallocationData> {
    get_reallocation_data_with_config(market, strategy, &ReallocationConfig::default())
}

/// Reallocation amounts for `market` under `strategy`.
///
/// Idle markets always offer their whole supply and accept anything.
pub fn get_reallocation_data_with_config(
    market: &MarketChainData,
    strategy: Option<&Strategy>,
    config: &ReallocationConfig,
) -> Option<ReallocationData> {
    let strategy = strategy.filter(|strategy| strategy.is_actionable())?;

    if strategy.idle_market {
        return Some(ReallocationData {
            to_supply: Limit::Unlimited,
            to_withdraw: market.state.total_supply_assets,
            to_borrow: U256::ZERO,
        });
    }

    match strategy.target? {
        TargetMode::Utilization { target, .. } => {
            Some(compute_utilization_reallocation_data(market, target, config))
        }
        TargetMode::BorrowApy { target, .. } => {
            Some(compute_reallocation_data(market, target, config))
        }
    }
}

/// APY targeting with a dead-band of `apy_dist_threshold_percent` around the target.
///
/// Withdraw and borrow amounts never consume more than
/// `max_liquidity_usage_percent` of the market's liquidity.
pub fn compute_reallocation_data(
    market: &MarketChainData,
    target_apy: U256,
    config: &ReallocationConfig,
) -> ReallocationData {
    let band = apy_band(target_apy, config);
    let current = market.apys.borrow_apy;

    if current <= band.lower {
        let usable = percent_of(market.state.liquidity(), config.max_liquidity_usage_percent);
        ReallocationData {
            to_supply: Limit::ZERO,
            to_withdraw: min(compute_withdraw_value(market, target_apy), usable),
            to_borrow: min(compute_borrow_value(market, target_apy), usable),
        }
    } else if current > band.upper {
        ReallocationData {
            to_supply: compute_supply_value(market, target_apy),
            ..ReallocationData::NONE
        }
    } else {
        debug!(market_id = %market.id, "borrow apy within dead-band of target");
        ReallocationData::NONE
    }
}

/// Utilization targeting; acts once the distance exceeds
/// `utilization_threshold_percent` of the target.
pub fn compute_utilization_reallocation_data(
    market: &MarketChainData,
    target: U256,
    config: &ReallocationConfig,
) -> ReallocationData {
    let current = market.state.utilization();
    let distance = if current > target { current - target } else { target - current };

    let threshold = target.saturating_mul(U256::from(config.utilization_threshold_percent));
    if distance.saturating_mul(U256::from(100)) <= threshold {
        debug!(market_id = %market.id, "utilization within dead-band of target");
        return ReallocationData::NONE;
    }

    if current > target {
        ReallocationData {
            to_supply: market.state.supply_to_utilization(target),
            ..ReallocationData::NONE
        }
    } else {
        ReallocationData {
            to_supply: Limit::ZERO,
            to_withdraw: market.state.withdraw_to_utilization(target),
            to_borrow: market.state.borrow_to_utilization(target),
        }
    }
}

/// Position of the market's tracked metric against its band, with default thresholds.
pub fn classify_market(market: &MarketChainData, strategy: Option<&Strategy>) -> Option<RangePosition> {
    classify_market_with_config(market, strategy, &ReallocationConfig::default())
}

/// Position of the market's tracked metric against its band.
///
/// The strategy's explicit range wins over the configured dead-band. An idle
/// market with any supply is always below its band.
pub fn classify_market_with_config(
    market: &MarketChainData,
    strategy: Option<&Strategy>,
    config: &ReallocationConfig,
) -> Option<RangePosition> {
    let strategy = strategy.filter(|strategy| strategy.is_actionable())?;

    if strategy.idle_market {
        if market.state.total_supply_assets.is_zero() {
            return Some(RangePosition::Within);
        }
        return Some(RangePosition::Below);
    }

    let mode = strategy.target?;
    let (value, band) = match mode {
        TargetMode::Utilization { target, range } => (
            market.state.utilization(),
            range.unwrap_or_else(|| utilization_band(target, config)),
        ),
        TargetMode::BorrowApy { target, range } => (
            market.apys.borrow_apy,
            range.unwrap_or_else(|| apy_band(target, config)),
        ),
    };

    let position = if band.contains(value) {
        RangePosition::Within
    } else if value < band.lower {
        RangePosition::Below
    } else {
        RangePosition::Above
    };
    Some(position)
}

fn apy_band(target: U256, config: &ReallocationConfig) -> TargetRange {
    let dist = config.apy_dist_threshold_percent;
    TargetRange {
        lower: percent_of(target, 100u64.saturating_sub(dist)),
        upper: percent_of(target, 100 + dist),
    }
}

fn utilization_band(target: U256, config: &ReallocationConfig) -> TargetRange {
    let slack = percent_of(target, config.utilization_threshold_percent);
    TargetRange {
        lower: target.saturating_sub(slack),
        upper: target.saturating_add(slack),
    }
}

fn percent_of(value: U256, percent: u64) -> U256 {
    mul_div_down(value, U256::from(percent), U256::from(100))
}
