//! Market state and pure state transitions for Morpho Blue markets.
//!
//! # Overview
//!
//! A market is described by three layers:
//! - [`MarketParams`]: the immutable parameters, whose hash is the market id
//! - [`MarketState`]: the on-chain balance sheet (assets, shares, last update, fee)
//! - [`MarketChainData`]: the state plus the IRM's rate at target and the
//!   derived supply/borrow APYs
//!
//! Every transition returns a new value. Inputs are never mutated.
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::market::{MarketChainData, MarketState};
//! use morpho_realloc_sim::irm::INITIAL_RATE_AT_TARGET;
//! use morpho_realloc_sim::math::WAD;
//! use alloy_primitives::{FixedBytes, U256};
//!
//! let state = MarketState::new(U256::from(1_000) * WAD, U256::from(800) * WAD, 1_000, U256::ZERO);
//! let market = MarketChainData::new(FixedBytes::ZERO, state, INITIAL_RATE_AT_TARGET);
//!
//! let accrued = market.accrue_interest(1_000 + 86_400).unwrap();
//! assert!(accrued.state.total_borrow_assets > market.state.total_borrow_assets);
//! assert_eq!(market.state.last_update, 1_000);
//! ```

use alloy_primitives::{keccak256, Address, U256};
use serde::Serialize;

use crate::error::{MarketId, SimError};
use crate::irm::{
    compute_new_borrow_apy, compute_new_supply_apy, compute_utilization, effective_rate_at_target,
    get_borrow_rate,
};
use crate::limit::Limit;
use crate::math::{
    assets_to_shares, shares_to_assets, w_div_up, w_mul_down, w_taylor_compounded, zero_floor_sub,
    RoundingDirection,
};

/// Immutable parameters identifying a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketParams {
    pub loan_token: Address,
    pub collateral_token: Address,
    pub oracle: Address,
    pub irm: Address,
    pub lltv: U256,
}

impl MarketParams {
    /// Market id: keccak256 of the ABI-encoded params (five 32-byte words).
    pub fn id(&self) -> MarketId {
        let mut encoded = [0u8; 160];
        for (word, address) in [self.loan_token, self.collateral_token, self.oracle, self.irm]
            .iter()
            .enumerate()
        {
            let start = word * 32 + 12;
            encoded[start..start + 20].copy_from_slice(address.as_slice());
        }
        encoded[128..].copy_from_slice(&self.lltv.to_be_bytes::<32>());

        keccak256(encoded)
    }
}

/// On-chain balance sheet of a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    /// The amount of loan assets supplied in total on the market
    pub total_supply_assets: U256,

    /// The amount of loan assets borrowed in total from the market
    pub total_borrow_assets: U256,

    /// The total supply shares representing lender positions
    pub total_supply_shares: U256,

    /// The total borrow shares representing borrower debt
    pub total_borrow_shares: U256,

    /// The block timestamp (in seconds) when interest was last accrued
    pub last_update: u64,

    /// The protocol fee (WAD-scaled, e.g., 0.1 WAD = 10%)
    pub fee: U256,
}

impl MarketState {
    /// State whose share totals mirror its asset totals at the initial
    /// `VIRTUAL_SHARES` exchange rate.
    pub fn new(total_supply_assets: U256, total_borrow_assets: U256, last_update: u64, fee: U256) -> Self {
        let initial = |assets: U256| assets_to_shares(assets, U256::ZERO, U256::ZERO, RoundingDirection::Down);
        Self {
            total_supply_assets,
            total_borrow_assets,
            total_supply_shares: initial(total_supply_assets),
            total_borrow_shares: initial(total_borrow_assets),
            last_update,
            fee,
        }
    }

    /// Returns the market's current liquidity (supply - borrow)
    pub fn liquidity(&self) -> U256 {
        zero_floor_sub(self.total_supply_assets, self.total_borrow_assets)
    }

    /// Returns the market's utilization (WAD-scaled)
    pub fn utilization(&self) -> U256 {
        compute_utilization(self.total_borrow_assets, self.total_supply_assets)
    }

    /// Accrues interest at `borrow_rate` (per second) from `last_update` to `timestamp`.
    ///
    /// Interest is added to both sides of the balance sheet. The protocol fee
    /// is minted as supply shares valued against the post-interest supply.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidInterestAccrual`] if `timestamp < last_update`
    pub fn accrue_interest(&self, timestamp: u64, borrow_rate: U256) -> Result<MarketState, SimError> {
        if timestamp < self.last_update {
            return Err(SimError::InvalidInterestAccrual {
                timestamp,
                last_update: self.last_update,
            });
        }

        let elapsed = timestamp - self.last_update;
        if elapsed == 0 {
            return Ok(self.clone());
        }

        let interest = w_mul_down(
            self.total_borrow_assets,
            w_taylor_compounded(borrow_rate, U256::from(elapsed)),
        );
        let total_supply_assets = self.total_supply_assets.saturating_add(interest);

        let fee_shares = if self.fee.is_zero() {
            U256::ZERO
        } else {
            let fee_amount = w_mul_down(interest, self.fee);
            assets_to_shares(
                fee_amount,
                total_supply_assets - fee_amount,
                self.total_supply_shares,
                RoundingDirection::Down,
            )
        };

        Ok(MarketState {
            total_supply_assets,
            total_borrow_assets: self.total_borrow_assets.saturating_add(interest),
            total_supply_shares: self.total_supply_shares.saturating_add(fee_shares),
            total_borrow_shares: self.total_borrow_shares,
            last_update: timestamp,
            fee: self.fee,
        })
    }

    /// Supplies assets. Returns the new state and the shares minted.
    pub fn supply(&self, assets: U256) -> (MarketState, U256) {
        let shares = self.to_supply_shares(assets, RoundingDirection::Down);

        let mut market = self.clone();
        market.total_supply_assets = market.total_supply_assets.saturating_add(assets);
        market.total_supply_shares = market.total_supply_shares.saturating_add(shares);

        (market, shares)
    }

    /// Withdraws assets. Returns the new state and the shares burned.
    ///
    /// # Errors
    ///
    /// - [`SimError::InsufficientMarketLiquidity`] if `assets > liquidity()`
    pub fn withdraw(&self, assets: U256) -> Result<(MarketState, U256), SimError> {
        self.ensure_liquidity(assets)?;

        let shares = self.to_supply_shares(assets, RoundingDirection::Up);

        let mut market = self.clone();
        market.total_supply_assets -= assets;
        market.total_supply_shares = zero_floor_sub(market.total_supply_shares, shares);

        Ok((market, shares))
    }

    /// Borrows assets. Returns the new state and the borrow shares minted.
    ///
    /// # Errors
    ///
    /// - [`SimError::InsufficientMarketLiquidity`] if `assets > liquidity()`
    pub fn borrow(&self, assets: U256) -> Result<(MarketState, U256), SimError> {
        self.ensure_liquidity(assets)?;

        let shares = self.to_borrow_shares(assets, RoundingDirection::Up);

        let mut market = self.clone();
        market.total_borrow_assets += assets;
        market.total_borrow_shares = market.total_borrow_shares.saturating_add(shares);

        Ok((market, shares))
    }

    /// Repays borrowed assets, at most the outstanding debt. Returns the new
    /// state and the borrow shares burned.
    pub fn repay(&self, assets: U256) -> (MarketState, U256) {
        let assets = assets.min(self.total_borrow_assets);
        let shares = self.to_borrow_shares(assets, RoundingDirection::Down);

        let mut market = self.clone();
        market.total_borrow_assets -= assets;
        market.total_borrow_shares = zero_floor_sub(market.total_borrow_shares, shares);

        (market, shares)
    }

    fn ensure_liquidity(&self, assets: U256) -> Result<(), SimError> {
        let available = self.liquidity();
        if assets > available {
            return Err(SimError::InsufficientMarketLiquidity {
                requested: assets,
                available,
            });
        }
        Ok(())
    }

    /// Convert supply shares to assets
    pub fn to_supply_assets(&self, shares: U256, rounding: RoundingDirection) -> U256 {
        shares_to_assets(shares, self.total_supply_assets, self.total_supply_shares, rounding)
    }

    /// Convert assets to supply shares
    pub fn to_supply_shares(&self, assets: U256, rounding: RoundingDirection) -> U256 {
        assets_to_shares(assets, self.total_supply_assets, self.total_supply_shares, rounding)
    }

    /// Convert assets to borrow shares
    pub fn to_borrow_shares(&self, assets: U256, rounding: RoundingDirection) -> U256 {
        assets_to_shares(assets, self.total_borrow_assets, self.total_borrow_shares, rounding)
    }

    // ==================== Utilization Targeting ====================

    /// Smallest volume to supply until the market reaches the target utilization.
    ///
    /// A zero target can only be approached, never reached, by supplying, so it
    /// absorbs an unlimited amount.
    pub fn supply_to_utilization(&self, target_utilization: U256) -> Limit {
        if target_utilization.is_zero() {
            return Limit::Unlimited;
        }

        Limit::Finite(zero_floor_sub(
            w_div_up(self.total_borrow_assets, target_utilization),
            self.total_supply_assets,
        ))
    }

    /// Amount to withdraw until the market reaches the target utilization.
    pub fn withdraw_to_utilization(&self, target_utilization: U256) -> U256 {
        if target_utilization.is_zero() {
            if self.total_borrow_assets.is_zero() {
                return self.total_supply_assets;
            }
            return U256::ZERO;
        }

        zero_floor_sub(
            self.total_supply_assets,
            w_div_up(self.total_borrow_assets, target_utilization),
        )
    }

    /// Amount to borrow until the market reaches the target utilization.
    pub fn borrow_to_utilization(&self, target_utilization: U256) -> U256 {
        zero_floor_sub(
            w_mul_down(self.total_supply_assets, target_utilization),
            self.total_borrow_assets,
        )
    }

    /// Smallest volume to repay until the market reaches the target utilization.
    pub fn repay_to_utilization(&self, target_utilization: U256) -> U256 {
        zero_floor_sub(
            self.total_borrow_assets,
            w_mul_down(self.total_supply_assets, target_utilization),
        )
    }
}

/// Annualized rates of a market (WAD-scaled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketApys {
    pub supply_apy: U256,
    pub borrow_apy: U256,
}

impl MarketApys {
    /// APYs of `state` on the curve anchored at `rate_at_target`.
    pub fn compute(state: &MarketState, rate_at_target: U256) -> Self {
        let utilization = state.utilization();
        let borrow_apy = compute_new_borrow_apy(utilization, rate_at_target);
        Self {
            supply_apy: compute_new_supply_apy(borrow_apy, utilization, state.fee),
            borrow_apy,
        }
    }
}

/// Point-in-time view of a market used in plan logs and simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub total_supply_assets: U256,
    pub total_borrow_assets: U256,
    pub liquidity: U256,
    pub utilization: U256,
    pub borrow_apy: U256,
    pub supply_apy: U256,
}

/// Market state together with its IRM anchor and derived APYs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketChainData {
    pub id: MarketId,
    pub state: MarketState,
    /// Per-second rate at target utilization (WAD-scaled)
    pub rate_at_target: U256,
    pub apys: MarketApys,
}

impl MarketChainData {
    /// Wraps a state, deriving its APYs.
    ///
    /// A zero `rate_at_target` is read as an untouched IRM and stored as
    /// [`INITIAL_RATE_AT_TARGET`](crate::irm::INITIAL_RATE_AT_TARGET).
    pub fn new(id: MarketId, state: MarketState, rate_at_target: U256) -> Self {
        let rate_at_target = effective_rate_at_target(rate_at_target);
        let apys = MarketApys::compute(&state, rate_at_target);
        Self {
            id,
            state,
            rate_at_target,
            apys,
        }
    }

    /// Accrues interest up to `timestamp` at the window's average borrow rate
    /// and adapts the rate at target.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidInterestAccrual`] if `timestamp < last_update`
    pub fn accrue_interest(&self, timestamp: u64) -> Result<MarketChainData, SimError> {
        let elapsed = timestamp.checked_sub(self.state.last_update).ok_or(
            SimError::InvalidInterestAccrual {
                timestamp,
                last_update: self.state.last_update,
            },
        )?;

        if elapsed == 0 {
            return Ok(self.clone());
        }

        let rates = get_borrow_rate(self.state.utilization(), self.rate_at_target, elapsed);
        let state = self.state.accrue_interest(timestamp, rates.avg_borrow_rate)?;

        Ok(Self::new(self.id, state, rates.end_rate_at_target))
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            total_supply_assets: self.state.total_supply_assets,
            total_borrow_assets: self.state.total_borrow_assets,
            liquidity: self.state.liquidity(),
            utilization: self.state.utilization(),
            borrow_apy: self.apys.borrow_apy,
            supply_apy: self.apys.supply_apy,
        }
    }

    /// Snapshot the market would show with the given totals, holding the rate
    /// at target fixed.
    pub fn project(&self, total_supply_assets: U256, total_borrow_assets: U256) -> MarketSnapshot {
        let utilization = compute_utilization(total_borrow_assets, total_supply_assets);
        let borrow_apy = compute_new_borrow_apy(utilization, self.rate_at_target);

        MarketSnapshot {
            total_supply_assets,
            total_borrow_assets,
            liquidity: zero_floor_sub(total_supply_assets, total_borrow_assets),
            utilization,
            borrow_apy,
            supply_apy: compute_new_supply_apy(borrow_apy, utilization, self.state.fee),
        }
    }

    /// Market after supplying `assets`.
    pub fn supply(&self, assets: U256) -> MarketChainData {
        let (state, _) = self.state.supply(assets);
        Self::new(self.id, state, self.rate_at_target)
    }

    /// Market after withdrawing `assets`.
    ///
    /// # Errors
    ///
    /// - [`SimError::InsufficientMarketLiquidity`] if `assets > liquidity()`
    pub fn withdraw(&self, assets: U256) -> Result<MarketChainData, SimError> {
        let (state, _) = self.state.withdraw(assets)?;
        Ok(Self::new(self.id, state, self.rate_at_target))
    }

    /// Market after borrowing `assets`.
    ///
    /// # Errors
    ///
    /// - [`SimError::InsufficientMarketLiquidity`] if `assets > liquidity()`
    pub fn borrow(&self, assets: U256) -> Result<MarketChainData, SimError> {
        let (state, _) = self.state.borrow(assets)?;
        Ok(Self::new(self.id, state, self.rate_at_target))
    }

    /// Market after repaying up to `assets`.
    pub fn repay(&self, assets: U256) -> MarketChainData {
        let (state, _) = self.state.repay(assets);
        Self::new(self.id, state, self.rate_at_target)
    }
}
