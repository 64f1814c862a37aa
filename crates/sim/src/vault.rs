//! Reallocation view of a MetaMorpho vault.
//!
//! A vault supplies into several Morpho Blue markets. For reallocation
//! purposes each position carries its size, the vault's supply cap on the
//! market, and the public allocator's flow caps:
//!
//! - **Supply cap**: ceiling on the vault's position in the market
//! - **Flow caps**: `max_in` / `max_out` bound how much a single
//!   permissionless reallocation may move into or out of the market
//!
//! [`MetaMorphoVault::reallocate`] replays a withdraw-then-supply operation
//! under the public allocator's rules and returns the resulting vault.
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::vault::{MetaMorphoVault, VaultAsset};
//! use alloy_chains::NamedChain;
//! use alloy_primitives::Address;
//!
//! let asset = VaultAsset::new(Address::ZERO, "USDC", 6).with_price_usd(1.0);
//! let vault = MetaMorphoVault::new(Address::ZERO, NamedChain::Mainnet, asset);
//!
//! assert!(vault.positions.is_empty());
//! assert_eq!(vault.asset.usd_value(alloy_primitives::U256::from(2_500_000u64)), Some(2.5));
//! ```

use std::collections::BTreeMap;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use morpho_realloc_strategy::Strategy;
use serde::Serialize;

use crate::error::{MarketId, SimError};
use crate::limit::Limit;
use crate::market::{MarketChainData, MarketParams};
use crate::math::{format_units, RoundingDirection};
use crate::reallocation::Reallocation;

/// The vault's underlying asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultAsset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    /// USD price of one whole token, if known
    pub price_usd: Option<f64>,
}

impl VaultAsset {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            price_usd: None,
        }
    }

    pub fn with_price_usd(mut self, price: f64) -> Self {
        self.price_usd = Some(price);
        self
    }

    /// USD value of an integer asset amount, if the price is known.
    pub fn usd_value(&self, amount: U256) -> Option<f64> {
        self.price_usd
            .map(|price| format_units(amount, self.decimals) * price)
    }
}

/// Public allocator flow caps of a vault on one market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowCaps {
    /// Maximum assets that can flow into this market
    pub max_in: U256,
    /// Maximum assets that can flow out of this market
    pub max_out: U256,
}

impl FlowCaps {
    pub fn new(max_in: U256, max_out: U256) -> Self {
        Self { max_in, max_out }
    }
}

/// Everything known about a market the vault supplies into.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub params: MarketParams,
    pub chain_data: MarketChainData,
    pub strategy: Option<Strategy>,
}

/// The vault's position in one market.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultPosition {
    /// Assets the vault currently supplies to the market
    pub supply_assets: U256,
    pub supply_cap: Limit,
    pub flow_caps: FlowCaps,
    pub market: MarketData,
}

impl VaultPosition {
    pub fn market_id(&self) -> MarketId {
        self.market.chain_data.id
    }

    /// Room left under the supply cap.
    pub fn cap_headroom(&self) -> Limit {
        self.supply_cap.headroom(self.supply_assets)
    }

    /// Most the vault can pull out right now: its position, bounded by the
    /// market's idle liquidity.
    pub fn withdrawable(&self) -> U256 {
        self.supply_assets
            .min(self.market.chain_data.state.liquidity())
    }

    pub fn is_idle(&self) -> bool {
        self.market
            .strategy
            .is_some_and(|strategy| strategy.idle_market)
    }
}

/// A single withdrawal leg of a reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub market_id: MarketId,
    pub market_params: MarketParams,
    pub amount: U256,
}

/// A vault and its positions, keyed and iterated by market id.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaMorphoVault {
    pub address: Address,
    pub chain: NamedChain,
    pub asset: VaultAsset,
    pub positions: BTreeMap<MarketId, VaultPosition>,
}

impl MetaMorphoVault {
    pub fn new(address: Address, chain: NamedChain, asset: VaultAsset) -> Self {
        Self {
            address,
            chain,
            asset,
            positions: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a position, keyed by its market id.
    pub fn with_position(mut self, position: VaultPosition) -> Self {
        self.positions.insert(position.market_id(), position);
        self
    }

    pub fn position(&self, market_id: MarketId) -> Result<&VaultPosition, SimError> {
        self.positions.get(&market_id).ok_or(SimError::MarketNotFound {
            vault: self.address,
            market_id,
        })
    }

    fn position_mut(&mut self, market_id: MarketId) -> Result<&mut VaultPosition, SimError> {
        let vault = self.address;
        self.positions
            .get_mut(&market_id)
            .ok_or(SimError::MarketNotFound { vault, market_id })
    }

    /// Total assets supplied across all positions.
    pub fn total_assets(&self) -> U256 {
        self.positions
            .values()
            .fold(U256::ZERO, |total, position| total.saturating_add(position.supply_assets))
    }

    /// Accrues every market up to `timestamp`; positions grow with their
    /// share of the supply-side interest.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidInterestAccrual`] if any market was updated after `timestamp`
    pub fn accrue_interest(&self, timestamp: u64) -> Result<MetaMorphoVault, SimError> {
        let mut vault = self.clone();

        for position in vault.positions.values_mut() {
            let before = &position.market.chain_data.state;
            let shares = before.to_supply_shares(position.supply_assets, RoundingDirection::Down);

            let accrued = position.market.chain_data.accrue_interest(timestamp)?;
            position.supply_assets = accrued
                .state
                .to_supply_assets(shares, RoundingDirection::Down);
            position.market.chain_data = accrued;
        }

        Ok(vault)
    }

    /// Replays a public reallocation: every withdrawal, then one supply of
    /// their sum into `supply_market_id`.
    ///
    /// Withdrawals must be non-empty and strictly sorted by market id, and
    /// must not include the supply market. Flow caps, positions, market
    /// liquidity and the destination's supply cap are enforced. Flow caps
    /// move with the assets: sources gain `max_in` and lose `max_out`, the
    /// destination the reverse.
    ///
    /// # Errors
    ///
    /// - [`SimError::EmptyWithdrawals`] if `withdrawals` is empty
    /// - [`SimError::WithdrawalsNotSorted`] if ids are not strictly increasing
    /// - [`SimError::DepositMarketInWithdrawals`] if the destination is also a source
    /// - [`SimError::MarketNotFound`] if a market is not a vault position
    /// - [`SimError::MaxOutflowExceeded`] / [`SimError::MaxInflowExceeded`] on flow caps
    /// - [`SimError::InsufficientPosition`] if a withdrawal exceeds the position
    /// - [`SimError::InsufficientMarketLiquidity`] if a market cannot pay out
    /// - [`SimError::SupplyCapExceeded`] if the destination would exceed its cap
    pub fn reallocate(
        &self,
        withdrawals: &[Withdrawal],
        supply_market_id: MarketId,
    ) -> Result<MetaMorphoVault, SimError> {
        if withdrawals.is_empty() {
            return Err(SimError::EmptyWithdrawals { vault: self.address });
        }

        // Destination must exist before anything moves
        self.position(supply_market_id)?;

        let mut vault = self.clone();
        let mut total_withdrawn = U256::ZERO;
        let mut prev_id: Option<MarketId> = None;

        for withdrawal in withdrawals {
            let market_id = withdrawal.market_id;
            let amount = withdrawal.amount;

            if prev_id.is_some_and(|prev| market_id <= prev) {
                return Err(SimError::WithdrawalsNotSorted { vault: self.address });
            }
            prev_id = Some(market_id);

            if market_id == supply_market_id {
                return Err(SimError::DepositMarketInWithdrawals {
                    vault: self.address,
                    market_id,
                });
            }

            let address = vault.address;
            let position = vault.position_mut(market_id)?;

            if position.flow_caps.max_out < amount {
                return Err(SimError::MaxOutflowExceeded {
                    vault: address,
                    market_id,
                });
            }

            if position.supply_assets < amount {
                return Err(SimError::InsufficientPosition {
                    vault: address,
                    market_id,
                });
            }

            position.market.chain_data = position.market.chain_data.withdraw(amount)?;
            position.supply_assets -= amount;
            position.flow_caps.max_out -= amount;
            position.flow_caps.max_in = position.flow_caps.max_in.saturating_add(amount);

            total_withdrawn = total_withdrawn.saturating_add(amount);
        }

        let address = vault.address;
        let destination = vault.position_mut(supply_market_id)?;

        if destination.flow_caps.max_in < total_withdrawn {
            return Err(SimError::MaxInflowExceeded {
                vault: address,
                market_id: supply_market_id,
            });
        }

        if let Limit::Finite(cap) = destination.supply_cap {
            if destination.supply_assets.saturating_add(total_withdrawn) > cap {
                return Err(SimError::SupplyCapExceeded {
                    vault: address,
                    market_id: supply_market_id,
                    cap,
                });
            }
        }

        destination.market.chain_data = destination.market.chain_data.supply(total_withdrawn);
        destination.supply_assets += total_withdrawn;
        destination.flow_caps.max_in -= total_withdrawn;
        destination.flow_caps.max_out = destination.flow_caps.max_out.saturating_add(total_withdrawn);

        Ok(vault)
    }

    /// Applies a plan produced by the matcher.
    ///
    /// # Errors
    ///
    /// - [`SimError::InconsistentReallocation`] if the plan's total differs
    ///   from the sum of its withdrawals
    /// - any error of [`MetaMorphoVault::reallocate`]
    pub fn apply_reallocation(&self, plan: &Reallocation) -> Result<MetaMorphoVault, SimError> {
        let withdrawn = plan
            .withdrawals
            .iter()
            .fold(U256::ZERO, |total, withdrawal| total.saturating_add(withdrawal.amount));

        if withdrawn != plan.amount_reallocated {
            return Err(SimError::InconsistentReallocation {
                vault: self.address,
                supplied: plan.amount_reallocated,
                withdrawn,
            });
        }

        self.reallocate(&plan.withdrawals, plan.supply_market_id)
    }
}
