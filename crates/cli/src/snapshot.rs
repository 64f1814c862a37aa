//! Vault snapshot loading.
//!
//! A snapshot is a JSON file holding one consistent view of a vault: its
//! asset, and for every market the params, on-chain state, IRM anchor, the
//! vault's position with its caps, and the operator strategy. Big integers
//! are decimal strings.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use morpho_realloc_sim::market::{MarketChainData, MarketParams, MarketState};
use morpho_realloc_sim::vault::{FlowCaps, MarketData, MetaMorphoVault, VaultAsset, VaultPosition};
use morpho_realloc_sim::Limit;
use morpho_realloc_strategy::{Strategy, StrategyRecord};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSnapshot {
    pub vault: Address,
    pub chain_id: u64,
    pub asset: AssetRecord,
    /// Accrue every market up to this timestamp before planning
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub markets: Vec<MarketRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub price_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub params: ParamsRecord,
    pub state: StateRecord,
    #[serde(deserialize_with = "u256_from_str")]
    pub rate_at_target: U256,
    pub position: PositionRecord,
    #[serde(default)]
    pub strategy: Option<StrategyRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsRecord {
    pub loan_token: Address,
    pub collateral_token: Address,
    pub oracle: Address,
    pub irm: Address,
    #[serde(deserialize_with = "u256_from_str")]
    pub lltv: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    #[serde(deserialize_with = "u256_from_str")]
    pub total_supply_assets: U256,
    #[serde(deserialize_with = "u256_from_str")]
    pub total_borrow_assets: U256,
    #[serde(default, deserialize_with = "option_u256_from_str")]
    pub total_supply_shares: Option<U256>,
    #[serde(default, deserialize_with = "option_u256_from_str")]
    pub total_borrow_shares: Option<U256>,
    pub last_update: u64,
    #[serde(deserialize_with = "u256_from_str")]
    pub fee: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    #[serde(deserialize_with = "u256_from_str")]
    pub supply_assets: U256,
    /// Raw cap; values at or above `u128::MAX` mean no cap
    #[serde(deserialize_with = "u256_from_str")]
    pub supply_cap: U256,
    #[serde(deserialize_with = "u256_from_str")]
    pub max_in: U256,
    #[serde(deserialize_with = "u256_from_str")]
    pub max_out: U256,
}

fn u256_from_str<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    U256::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

fn option_u256_from_str<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| U256::from_str(raw.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl MarketRecord {
    fn into_position(self) -> VaultPosition {
        let params = MarketParams {
            loan_token: self.params.loan_token,
            collateral_token: self.params.collateral_token,
            oracle: self.params.oracle,
            irm: self.params.irm,
            lltv: self.params.lltv,
        };
        let market_id = params.id();

        let mut state = MarketState::new(
            self.state.total_supply_assets,
            self.state.total_borrow_assets,
            self.state.last_update,
            self.state.fee,
        );
        if let Some(shares) = self.state.total_supply_shares {
            state.total_supply_shares = shares;
        }
        if let Some(shares) = self.state.total_borrow_shares {
            state.total_borrow_shares = shares;
        }

        // A strategy that fails validation leaves the market without a target
        let strategy = self.strategy.and_then(|record| {
            Strategy::try_from(record)
                .map_err(|err| warn!(%market_id, %err, "invalid strategy, market has no target"))
                .ok()
        });

        VaultPosition {
            supply_assets: self.position.supply_assets,
            supply_cap: Limit::from_raw(self.position.supply_cap),
            flow_caps: FlowCaps::new(self.position.max_in, self.position.max_out),
            market: MarketData {
                params,
                chain_data: MarketChainData::new(market_id, state, self.rate_at_target),
                strategy,
            },
        }
    }
}

impl VaultSnapshot {
    /// Builds the vault, accrued to the snapshot timestamp if one is set.
    pub fn into_vault(self) -> Result<MetaMorphoVault> {
        let chain = NamedChain::try_from(self.chain_id)
            .map_err(|_| anyhow!("Unsupported chain id: {}", self.chain_id))?;

        let mut asset = VaultAsset::new(self.asset.address, self.asset.symbol, self.asset.decimals);
        asset.price_usd = self.asset.price_usd;

        let vault = self
            .markets
            .into_iter()
            .map(MarketRecord::into_position)
            .fold(MetaMorphoVault::new(self.vault, chain, asset), MetaMorphoVault::with_position);

        match self.timestamp {
            Some(timestamp) => vault
                .accrue_interest(timestamp)
                .with_context(|| format!("Failed to accrue interest to {}", timestamp)),
            None => Ok(vault),
        }
    }
}

/// Reads and converts a snapshot file.
pub fn load_vault(path: &Path) -> Result<MetaMorphoVault> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: VaultSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    let vault = snapshot.into_vault()?;
    debug!(vault = %vault.address, markets = vault.positions.len(), "snapshot loaded");
    Ok(vault)
}
