//! Greedy multi-market reallocation matcher.
//!
//! Given one out-of-range "focus" market of a vault, the matcher builds a
//! concrete public-allocator plan:
//!
//! - **Supply case** ([`seek_for_supply_reallocation`]): the focus market needs
//!   liquidity. Every other eligible market is visited in ascending market id
//!   order and drained up to its own capacity until the focus market's gap is
//!   closed.
//! - **Withdraw case** ([`seek_for_withdraw_reallocation`]): the focus market
//!   holds excess liquidity. The single destination able to absorb the most is
//!   chosen and receives everything that can move.
//!
//! A candidate's capacity is the smallest of its strategy-implied amount, its
//! flow cap, and its position (sources) or supply-cap headroom (destinations).
//! Capacities worth less than the configured USD floor count as zero.
//!
//! # Example
//!
//! ```rust,ignore
//! use morpho_realloc_sim::seek_reallocation;
//!
//! if let Some(plan) = seek_reallocation(market_id, &vault, true) {
//!     let next = vault.apply_reallocation(&plan)?;
//!     assert_eq!(next.total_assets(), vault.total_assets());
//! }
//! ```

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReallocationConfig;
use crate::error::MarketId;
use crate::limit::Limit;
use crate::market::{MarketParams, MarketSnapshot};
use crate::math::{min, mul_div_down};
use crate::target::{
    classify_market_with_config, get_reallocation_data_with_config, RangePosition,
    ReallocationData,
};
use crate::vault::{MetaMorphoVault, VaultPosition, Withdrawal};

/// Direction of a plan leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReallocationKind {
    Withdraw,
    Supply,
}

/// Before/after view of one market touched by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationLogData {
    pub market_id: MarketId,
    pub market_params: MarketParams,
    pub kind: ReallocationKind,
    pub amount: U256,
    pub before: MarketSnapshot,
    pub after: MarketSnapshot,
}

/// A concrete reallocation plan.
///
/// `amount_reallocated` always equals the sum of `withdrawals`, and is the
/// amount credited to the supply market.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reallocation {
    pub vault: Address,
    pub chain: NamedChain,
    /// Sorted by market id
    pub withdrawals: Vec<Withdrawal>,
    pub supply_market_id: MarketId,
    pub supply_market_params: MarketParams,
    /// Withdraw legs in plan order, then the supply leg
    pub logs: Vec<ReallocationLogData>,
    pub amount_reallocated: U256,
    /// USD value at the asset's current price, if known
    pub total_usd: Option<f64>,
}

/// Why a candidate's capacity falls short of what is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warnings {
    pub target_too_close_or_already_crossed: bool,
    pub flow_cap_too_low: bool,
    pub allocation_or_cap_insufficient: bool,
}

/// Capacity of one vault market to take part in a reallocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReallocationData {
    pub market_id: MarketId,
    pub market_params: MarketParams,
    pub chain: NamedChain,
    pub reallocation_data: ReallocationData,
    /// `to_withdraw` for sources, `to_supply` for destinations
    pub strategy_amount: Limit,
    /// `max_out` for sources, `max_in` for destinations
    pub flow_cap: U256,
    /// Withdrawable position for sources, supply-cap headroom for destinations
    pub position_limit: Limit,
    /// Smallest of the three above, zeroed under the USD floor
    pub max_reallocation_amount: U256,
    pub max_reallocation_amount_usd: Option<f64>,
    /// Set when the capacity is below the warning ratio of the amount needed
    pub warnings: Option<Warnings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Market gives liquidity away
    Source,
    /// Market takes liquidity in
    Destination,
}

fn evaluate_candidate(
    vault: &MetaMorphoVault,
    position: &VaultPosition,
    side: Side,
    amount_needed: U256,
    chain: NamedChain,
    config: &ReallocationConfig,
) -> Option<MarketReallocationData> {
    let market_id = position.market_id();
    let market = &position.market;

    let Some(reallocation_data) =
        get_reallocation_data_with_config(&market.chain_data, market.strategy.as_ref(), config)
    else {
        debug!(%market_id, "no reallocation data, skipping");
        return None;
    };

    let (strategy_amount, flow_cap, position_limit) = match side {
        Side::Source => (
            Limit::Finite(reallocation_data.to_withdraw),
            position.flow_caps.max_out,
            Limit::Finite(position.withdrawable()),
        ),
        Side::Destination => (
            reallocation_data.to_supply,
            position.flow_caps.max_in,
            position.cap_headroom(),
        ),
    };

    let uncapped = strategy_amount.min(position_limit);
    if uncapped > Limit::Finite(flow_cap) {
        debug!(%market_id, %flow_cap, "capped by flow cap");
    }
    let mut amount = uncapped.cap(flow_cap);

    match vault.asset.usd_value(amount) {
        Some(usd) if usd < config.usd_threshold => {
            debug!(%market_id, usd, threshold = config.usd_threshold, "under usd floor");
            amount = U256::ZERO;
        }
        Some(_) => {}
        None => {
            warn!(%market_id, asset = %vault.asset.symbol, "missing asset price, usd floor not applied");
        }
    }

    Some(MarketReallocationData {
        market_id,
        market_params: market.params,
        chain,
        reallocation_data,
        strategy_amount,
        flow_cap,
        position_limit,
        max_reallocation_amount: amount,
        max_reallocation_amount_usd: vault.asset.usd_value(amount),
        warnings: warnings_for(amount_needed, amount, strategy_amount, flow_cap, position_limit, config),
    })
}

fn warnings_for(
    amount_needed: U256,
    amount: U256,
    strategy_amount: Limit,
    flow_cap: U256,
    position_limit: Limit,
    config: &ReallocationConfig,
) -> Option<Warnings> {
    let threshold = mul_div_down(
        amount_needed,
        U256::from(config.warning_ratio_percent),
        U256::from(100),
    );
    if amount_needed.is_zero() || amount >= threshold {
        return None;
    }

    Some(Warnings {
        target_too_close_or_already_crossed: strategy_amount < Limit::Finite(threshold),
        flow_cap_too_low: flow_cap < threshold,
        allocation_or_cap_insufficient: position_limit < Limit::Finite(threshold),
    })
}

/// Capacity of every vault market with reallocation data, with default thresholds.
///
/// With `supply_reallocation` the markets are evaluated as sources for a
/// market that needs liquidity, otherwise as destinations for one that has
/// excess.
pub fn get_market_reallocation_data(
    vault: &MetaMorphoVault,
    amount_to_reach_target: U256,
    supply_reallocation: bool,
    chain: NamedChain,
) -> Vec<MarketReallocationData> {
    get_market_reallocation_data_with_config(
        vault,
        amount_to_reach_target,
        supply_reallocation,
        chain,
        &ReallocationConfig::default(),
    )
}

/// Capacity of every vault market with reallocation data.
///
/// Returns nothing when `chain` is not the vault's chain.
pub fn get_market_reallocation_data_with_config(
    vault: &MetaMorphoVault,
    amount_to_reach_target: U256,
    supply_reallocation: bool,
    chain: NamedChain,
    config: &ReallocationConfig,
) -> Vec<MarketReallocationData> {
    if chain != vault.chain {
        warn!(vault = %vault.address, %chain, vault_chain = %vault.chain, "chain mismatch");
        return Vec::new();
    }

    let side = if supply_reallocation {
        Side::Source
    } else {
        Side::Destination
    };

    vault
        .positions
        .values()
        .filter_map(|position| {
            evaluate_candidate(vault, position, side, amount_to_reach_target, chain, config)
        })
        .collect()
}

/// Plan moving liquidity into `market_id`, with default thresholds.
pub fn seek_for_supply_reallocation(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
) -> Option<Reallocation> {
    seek_for_supply_reallocation_with_config(
        market_id,
        vault,
        filter_idle_markets,
        &ReallocationConfig::default(),
    )
}

/// Plan moving liquidity into `market_id`.
///
/// The amount sought is the market's `to_supply`, bounded by its `max_in` and
/// supply-cap headroom. Returns `None` when nothing can move.
pub fn seek_for_supply_reallocation_with_config(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
    config: &ReallocationConfig,
) -> Option<Reallocation> {
    let target = vault.positions.get(&market_id)?;
    let market = &target.market;
    let data =
        get_reallocation_data_with_config(&market.chain_data, market.strategy.as_ref(), config)?;

    let to_supply = target
        .cap_headroom()
        .min(data.to_supply)
        .cap(target.flow_caps.max_in);
    if to_supply.is_zero() {
        debug!(%market_id, "nothing to supply");
        return None;
    }

    match_supply(vault, target, to_supply, filter_idle_markets, config)
}

/// Drains other markets, in ascending id order, into `target` until
/// `to_supply` is reached or candidates run out.
pub(crate) fn match_supply(
    vault: &MetaMorphoVault,
    target: &VaultPosition,
    to_supply: U256,
    filter_idle_markets: bool,
    config: &ReallocationConfig,
) -> Option<Reallocation> {
    let target_id = target.market_id();
    let mut remaining = to_supply;
    let mut withdrawals = Vec::new();
    let mut logs = Vec::new();

    for (market_id, position) in &vault.positions {
        if remaining.is_zero() {
            break;
        }
        if *market_id == target_id {
            continue;
        }
        if filter_idle_markets && position.is_idle() {
            debug!(%market_id, "idle market filtered");
            continue;
        }

        let Some(candidate) =
            evaluate_candidate(vault, position, Side::Source, remaining, vault.chain, config)
        else {
            continue;
        };

        let amount = min(candidate.max_reallocation_amount, remaining);
        if amount.is_zero() {
            continue;
        }
        remaining -= amount;

        let chain_data = &position.market.chain_data;
        logs.push(ReallocationLogData {
            market_id: *market_id,
            market_params: position.market.params,
            kind: ReallocationKind::Withdraw,
            amount,
            before: chain_data.snapshot(),
            after: chain_data.project(
                chain_data.state.total_supply_assets.saturating_sub(amount),
                chain_data.state.total_borrow_assets,
            ),
        });
        withdrawals.push(Withdrawal {
            market_id: *market_id,
            market_params: position.market.params,
            amount,
        });
    }

    let total = to_supply - remaining;
    if total.is_zero() {
        debug!(market_id = %target_id, "no source can supply");
        return None;
    }

    withdrawals.sort_by_key(|withdrawal| withdrawal.market_id);
    logs.push(supply_log(target, total));

    Some(build_plan(vault, withdrawals, target, logs, total))
}

/// Plan moving liquidity out of `market_id`, with default thresholds.
pub fn seek_for_withdraw_reallocation(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
) -> Option<Reallocation> {
    seek_for_withdraw_reallocation_with_config(
        market_id,
        vault,
        filter_idle_markets,
        &ReallocationConfig::default(),
    )
}

/// Plan moving liquidity out of `market_id` into the single destination
/// able to absorb the most. Ties go to the lower market id.
pub fn seek_for_withdraw_reallocation_with_config(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
    config: &ReallocationConfig,
) -> Option<Reallocation> {
    let source = vault.positions.get(&market_id)?;
    let market = &source.market;
    let data =
        get_reallocation_data_with_config(&market.chain_data, market.strategy.as_ref(), config)?;

    let to_withdraw = min(
        min(data.to_withdraw, source.withdrawable()),
        source.flow_caps.max_out,
    );
    if to_withdraw.is_zero() {
        debug!(%market_id, "nothing to withdraw");
        return None;
    }

    let mut best: Option<(&VaultPosition, U256)> = None;
    for (candidate_id, position) in &vault.positions {
        if *candidate_id == market_id {
            continue;
        }
        if filter_idle_markets && position.is_idle() {
            debug!(market_id = %candidate_id, "idle market filtered");
            continue;
        }

        let Some(candidate) = evaluate_candidate(
            vault,
            position,
            Side::Destination,
            to_withdraw,
            vault.chain,
            config,
        ) else {
            continue;
        };

        let capacity = candidate.max_reallocation_amount;
        if !capacity.is_zero() && best.is_none_or(|(_, current)| capacity > current) {
            best = Some((position, capacity));
        }
    }

    let Some((destination, capacity)) = best else {
        debug!(%market_id, "no destination can absorb");
        return None;
    };
    let amount = min(to_withdraw, capacity);

    let chain_data = &market.chain_data;
    let logs = vec![
        ReallocationLogData {
            market_id,
            market_params: market.params,
            kind: ReallocationKind::Withdraw,
            amount,
            before: chain_data.snapshot(),
            after: chain_data.project(
                chain_data.state.total_supply_assets.saturating_sub(amount),
                chain_data.state.total_borrow_assets,
            ),
        },
        supply_log(destination, amount),
    ];
    let withdrawals = vec![Withdrawal {
        market_id,
        market_params: market.params,
        amount,
    }];

    Some(build_plan(vault, withdrawals, destination, logs, amount))
}

/// Plan for a market outside its band, with default thresholds.
pub fn seek_reallocation(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
) -> Option<Reallocation> {
    seek_reallocation_with_config(
        market_id,
        vault,
        filter_idle_markets,
        &ReallocationConfig::default(),
    )
}

/// Plan for a market outside its band: markets above it receive liquidity,
/// markets below it give liquidity away.
pub fn seek_reallocation_with_config(
    market_id: MarketId,
    vault: &MetaMorphoVault,
    filter_idle_markets: bool,
    config: &ReallocationConfig,
) -> Option<Reallocation> {
    let position = vault.positions.get(&market_id)?;
    let market = &position.market;

    match classify_market_with_config(&market.chain_data, market.strategy.as_ref(), config)? {
        RangePosition::Above => {
            seek_for_supply_reallocation_with_config(market_id, vault, filter_idle_markets, config)
        }
        RangePosition::Below => {
            seek_for_withdraw_reallocation_with_config(market_id, vault, filter_idle_markets, config)
        }
        RangePosition::Within => {
            debug!(%market_id, "market within range");
            None
        }
    }
}

fn supply_log(destination: &VaultPosition, amount: U256) -> ReallocationLogData {
    let chain_data = &destination.market.chain_data;
    ReallocationLogData {
        market_id: destination.market_id(),
        market_params: destination.market.params,
        kind: ReallocationKind::Supply,
        amount,
        before: chain_data.snapshot(),
        after: chain_data.project(
            chain_data.state.total_supply_assets.saturating_add(amount),
            chain_data.state.total_borrow_assets,
        ),
    }
}

fn build_plan(
    vault: &MetaMorphoVault,
    withdrawals: Vec<Withdrawal>,
    destination: &VaultPosition,
    logs: Vec<ReallocationLogData>,
    amount_reallocated: U256,
) -> Reallocation {
    let total_usd = vault.asset.usd_value(amount_reallocated);
    info!(
        vault = %vault.address,
        supply_market = %destination.market_id(),
        amount = %amount_reallocated,
        legs = withdrawals.len(),
        "reallocation planned"
    );

    Reallocation {
        vault: vault.address,
        chain: vault.chain,
        withdrawals,
        supply_market_id: destination.market_id(),
        supply_market_params: destination.market.params,
        logs,
        amount_reallocated,
        total_usd,
    }
}
