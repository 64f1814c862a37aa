//! Bounded-or-unbounded asset amounts.
//!
//! Supply caps and absorbable amounts are either a concrete number of assets
//! or unbounded. Raw on-chain values at or above `u128::MAX` are the
//! contracts' way of saying "no cap" and are lifted to [`Limit::Unlimited`]
//! at the boundary so no arithmetic ever runs on the sentinel.

use std::fmt;

use alloy_primitives::U256;
use serde::Serialize;

/// Raw values at or above this are treated as "no limit"
pub const UNLIMITED_THRESHOLD: U256 = U256::from_limbs([u64::MAX, u64::MAX, 0, 0]);

/// An asset amount that may be unbounded.
///
/// Ordering treats `Unlimited` as greater than every finite amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    Finite(U256),
    Unlimited,
}

impl Limit {
    pub const ZERO: Limit = Limit::Finite(U256::ZERO);

    /// Lifts a raw on-chain value, mapping `>= u128::MAX` to `Unlimited`.
    pub fn from_raw(value: U256) -> Self {
        if value >= UNLIMITED_THRESHOLD {
            Limit::Unlimited
        } else {
            Limit::Finite(value)
        }
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// The finite amount, if any.
    pub fn finite(self) -> Option<U256> {
        match self {
            Limit::Finite(value) => Some(value),
            Limit::Unlimited => None,
        }
    }

    /// `min(amount, self)`
    pub fn cap(self, amount: U256) -> U256 {
        match self {
            Limit::Finite(value) if value < amount => value,
            _ => amount,
        }
    }

    /// Room left under this limit once `used` is taken, floored at zero.
    pub fn headroom(self, used: U256) -> Limit {
        match self {
            Limit::Finite(value) => Limit::Finite(value.saturating_sub(used)),
            Limit::Unlimited => Limit::Unlimited,
        }
    }
}

impl From<U256> for Limit {
    fn from(value: U256) -> Self {
        Limit::Finite(value)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(value) => write!(f, "{value}"),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}
