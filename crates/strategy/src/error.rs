//! Error types for strategy conversion.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while converting a [`crate::StrategyRecord`] into a [`crate::Strategy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// Both a utilization target and a borrow APY target are set
    #[error("Strategy sets both a utilization target and a borrow APY target")]
    ConflictingTargets,

    /// A target or range bound is negative
    #[error("Negative value {0} in strategy")]
    NegativeValue(Decimal),

    /// A utilization value is above 100%
    #[error("Utilization value {0} is above 100%")]
    UtilizationOutOfRange(Decimal),

    /// A range whose lower bound is above its upper bound
    #[error("Range lower bound {lower} is above upper bound {upper}")]
    InvertedRange { lower: U256, upper: U256 },
}
