//! Type definitions for strategy crate.
//!
//! All numeric targets are WAD-scaled (`1e18` = 100%). The API serves plain
//! decimals (e.g. `0.9` for a 90% utilization target); [`StrategyRecord`]
//! carries them verbatim and the conversion into [`Strategy`] rescales them
//! exactly with [`decimal_to_wad`].

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Number of decimals of a WAD-scaled value.
pub const WAD_DECIMALS: u32 = 18;

/// 1.0 in WAD.
const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Inclusive band a market metric is expected to stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRange {
    /// Lower bound (WAD-scaled).
    pub lower: U256,
    /// Upper bound (WAD-scaled).
    pub upper: U256,
}

impl TargetRange {
    /// Create a range, rejecting inverted bounds.
    pub fn new(lower: U256, upper: U256) -> Result<Self, StrategyError> {
        if lower > upper {
            return Err(StrategyError::InvertedRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Check if a value lies within the range (bounds included).
    pub fn contains(&self, value: U256) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Which metric a market is steered towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum TargetMode {
    /// Steer utilization towards `target`.
    Utilization {
        target: U256,
        range: Option<TargetRange>,
    },
    /// Steer the borrow APY towards `target`.
    BorrowApy {
        target: U256,
        range: Option<TargetRange>,
    },
}

impl TargetMode {
    /// The WAD-scaled target value.
    pub fn target(&self) -> U256 {
        match self {
            Self::Utilization { target, .. } | Self::BorrowApy { target, .. } => *target,
        }
    }

    /// The optional tolerance range.
    pub fn range(&self) -> Option<TargetRange> {
        match self {
            Self::Utilization { range, .. } | Self::BorrowApy { range, .. } => *range,
        }
    }
}

/// Per-market reallocation strategy.
///
/// A market with no `target` and no `idle_market` flag has nothing to steer
/// towards. A blacklisted market never takes part in reallocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    /// Target metric, if any.
    pub target: Option<TargetMode>,
    /// Market is excluded from reallocations.
    pub blacklist: bool,
    /// Market is the vault's idle market (no borrowers).
    pub idle_market: bool,
}

impl Strategy {
    /// Strategy targeting a utilization (WAD-scaled).
    pub fn utilization(target: U256) -> Self {
        Self {
            target: Some(TargetMode::Utilization {
                target,
                range: None,
            }),
            ..Self::default()
        }
    }

    /// Strategy targeting a borrow APY (WAD-scaled).
    pub fn borrow_apy(target: U256) -> Self {
        Self {
            target: Some(TargetMode::BorrowApy {
                target,
                range: None,
            }),
            ..Self::default()
        }
    }

    /// Strategy for an idle market.
    pub fn idle() -> Self {
        Self {
            idle_market: true,
            ..Self::default()
        }
    }

    /// Attach a tolerance range to the current target. No-op without a target.
    pub fn with_range(mut self, new_range: TargetRange) -> Self {
        match &mut self.target {
            Some(TargetMode::Utilization { range, .. } | TargetMode::BorrowApy { range, .. }) => {
                *range = Some(new_range);
            }
            None => {}
        }
        self
    }

    /// Flag the market as blacklisted.
    pub fn blacklisted(mut self) -> Self {
        self.blacklist = true;
        self
    }

    /// Check if the strategy can produce reallocation data at all.
    pub fn is_actionable(&self) -> bool {
        !self.blacklist && (self.idle_market || self.target.is_some())
    }
}

/// Range as served by the strategy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub lower: Decimal,
    pub upper: Decimal,
}

/// Strategy as served by the strategy API.
///
/// Field presence decides the targeting mode. Setting both targets is
/// rejected during conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_target: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_range: Option<RangeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_borrow_apy: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy_range: Option<RangeRecord>,
    #[serde(default)]
    pub blacklist: bool,
    #[serde(default)]
    pub idle_market: bool,
}

impl TryFrom<StrategyRecord> for Strategy {
    type Error = StrategyError;

    fn try_from(record: StrategyRecord) -> Result<Self, Self::Error> {
        let target = match (record.utilization_target, record.target_borrow_apy) {
            (Some(_), Some(_)) => return Err(StrategyError::ConflictingTargets),
            (Some(utilization), None) => {
                let target = utilization_to_wad(utilization)?;
                let range = record
                    .utilization_range
                    .map(|r| {
                        TargetRange::new(utilization_to_wad(r.lower)?, utilization_to_wad(r.upper)?)
                    })
                    .transpose()?;
                Some(TargetMode::Utilization { target, range })
            }
            (None, Some(apy)) => {
                let target = decimal_to_wad(apy)?;
                let range = record
                    .apy_range
                    .map(|r| TargetRange::new(decimal_to_wad(r.lower)?, decimal_to_wad(r.upper)?))
                    .transpose()?;
                Some(TargetMode::BorrowApy { target, range })
            }
            (None, None) => None,
        };

        Ok(Strategy {
            target,
            blacklist: record.blacklist,
            idle_market: record.idle_market,
        })
    }
}

/// Convert a non-negative decimal into its WAD-scaled integer.
///
/// Digits beyond the 18th decimal are truncated.
pub fn decimal_to_wad(value: Decimal) -> Result<U256, StrategyError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(StrategyError::NegativeValue(value));
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();

    let wad = if scale <= WAD_DECIMALS {
        mantissa * U256::from(10u64).pow(U256::from(WAD_DECIMALS - scale))
    } else {
        mantissa / U256::from(10u64).pow(U256::from(scale - WAD_DECIMALS))
    };

    Ok(wad)
}

fn utilization_to_wad(value: Decimal) -> Result<U256, StrategyError> {
    let wad = decimal_to_wad(value)?;
    if wad > WAD {
        return Err(StrategyError::UtilizationOutOfRange(value));
    }
    Ok(wad)
}
