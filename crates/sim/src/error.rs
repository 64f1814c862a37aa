//! Error types for the reallocation engine.

use alloy_primitives::{Address, FixedBytes, U256};
use thiserror::Error;

/// Type alias for a 32-byte market ID
pub type MarketId = FixedBytes<32>;

/// Errors raised while accruing, validating, or applying a reallocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Interest accrual was attempted with a timestamp before the last update
    #[error("Invalid interest accrual: timestamp {timestamp} is before last update {last_update}")]
    InvalidInterestAccrual { timestamp: u64, last_update: u64 },

    /// Market not found among the vault positions
    #[error("Market {market_id} not found in vault {vault}")]
    MarketNotFound { vault: Address, market_id: MarketId },

    /// Not enough idle liquidity in the market for a withdraw or borrow
    #[error("Insufficient market liquidity: requested {requested}, available {available}")]
    InsufficientMarketLiquidity { requested: U256, available: U256 },

    /// Vault position is smaller than the requested withdrawal
    #[error("Insufficient position for vault {vault} in market {market_id}")]
    InsufficientPosition { vault: Address, market_id: MarketId },

    /// Supply cap exceeded
    #[error("Supply cap exceeded for market {market_id} in vault {vault}: cap is {cap}")]
    SupplyCapExceeded {
        vault: Address,
        market_id: MarketId,
        cap: U256,
    },

    /// Inconsistent reallocation (total supplied != total withdrawn)
    #[error("Inconsistent reallocation in vault {vault}: supplied {supplied}, withdrawn {withdrawn}")]
    InconsistentReallocation {
        vault: Address,
        supplied: U256,
        withdrawn: U256,
    },

    /// Max inflow exceeded for public allocator
    #[error("Max inflow exceeded for market {market_id} in vault {vault}")]
    MaxInflowExceeded { vault: Address, market_id: MarketId },

    /// Max outflow exceeded for public allocator
    #[error("Max outflow exceeded for market {market_id} in vault {vault}")]
    MaxOutflowExceeded { vault: Address, market_id: MarketId },

    /// Empty withdrawals list for public reallocate
    #[error("Empty withdrawals list for vault {vault}")]
    EmptyWithdrawals { vault: Address },

    /// Deposit market included in withdrawals
    #[error("Deposit market {market_id} included in withdrawals for vault {vault}")]
    DepositMarketInWithdrawals { vault: Address, market_id: MarketId },

    /// Withdrawals not sorted
    #[error("Withdrawals not sorted for vault {vault}")]
    WithdrawalsNotSorted { vault: Address },
}
