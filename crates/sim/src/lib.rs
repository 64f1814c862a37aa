//! Morpho Reallocation Engine
//!
//! This crate plans liquidity reallocations across the Morpho Blue markets a
//! MetaMorpho vault supplies into. It is a pure, synchronous library: callers
//! supply consistent market, strategy and flow-cap snapshots and get plans
//! back, without any I/O.
//!
//! # Overview
//!
//! - [`math`]: WAD fixed-point kernel with 512-bit intermediates
//! - [`irm`]: the adaptive curve interest rate model
//! - [`market`]: market state transitions and derived APYs
//! - [`target`]: how far a market is from its strategy target
//! - [`reallocation`]: the greedy supply/withdraw matcher
//! - [`vault`]: the vault view, and plan replay under public allocator rules
//! - [`series`]: liquidity sweeps and borrow simulation
//!
//! # Example
//!
//! ```rust,ignore
//! use morpho_realloc_sim::{seek_reallocation, ReallocationConfig};
//!
//! let vault = load_vault_snapshot()?.accrue_interest(now)?;
//! for market_id in vault.positions.keys() {
//!     if let Some(plan) = seek_reallocation(*market_id, &vault, true) {
//!         println!("{} moved into {}", plan.amount_reallocated, plan.supply_market_id);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod irm;
pub mod limit;
pub mod market;
pub mod math;
pub mod reallocation;
pub mod series;
pub mod target;
pub mod vault;

// Re-export commonly used types
pub use config::ReallocationConfig;
pub use error::{MarketId, SimError};
pub use limit::Limit;

// Math exports
pub use math::{RoundingDirection, SECONDS_PER_YEAR, WAD};

// IRM exports
pub use irm::{
    compute_borrow_rate, compute_new_borrow_apy, compute_new_supply_apy, compute_rate_at_target,
    compute_utilization, get_borrow_rate, w_exp, BorrowRateResult, CURVE_STEEPNESS,
    INITIAL_RATE_AT_TARGET, MAX_RATE_AT_TARGET, MIN_RATE_AT_TARGET, TARGET_UTILIZATION,
};

// Market exports
pub use market::{MarketApys, MarketChainData, MarketParams, MarketSnapshot, MarketState};

// Target exports
pub use target::{classify_market, get_reallocation_data, RangePosition, ReallocationData};

// Vault exports
pub use vault::{FlowCaps, MarketData, MetaMorphoVault, VaultAsset, VaultPosition, Withdrawal};

// Matcher exports
pub use reallocation::{
    get_market_reallocation_data, seek_for_supply_reallocation, seek_for_withdraw_reallocation,
    seek_reallocation, MarketReallocationData, Reallocation, ReallocationKind,
    ReallocationLogData, Warnings,
};

// Series exports
pub use series::{liquidity_series, max_available_liquidity, simulate_borrow, BorrowSimulation, SeriesPoint};
