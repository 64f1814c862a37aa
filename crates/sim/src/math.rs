//! Fixed-point math for WAD-scaled (`1e18`) integers.
//!
//! Every multiply-then-divide goes through a 512-bit intermediate so that
//! `x * y` never wraps, whatever the magnitude of the 256-bit operands. The
//! rounding direction of each helper is part of its contract: share and rate
//! computations must round the same way the on-chain contracts do.
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::math::{w_mul_down, w_div_up, WAD};
//! use alloy_primitives::U256;
//!
//! let half = WAD / U256::from(2);
//! assert_eq!(w_mul_down(WAD * U256::from(3), half), WAD + half);
//! assert_eq!(w_div_up(U256::from(1), U256::from(3) * WAD), U256::from(1));
//! ```

use alloy_primitives::{U256, U512};

/// 1.0 in WAD (1e18)
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Virtual assets added to market totals in share conversions
pub const VIRTUAL_ASSETS: U256 = U256::from_limbs([1, 0, 0, 0]);

/// Virtual shares added to market totals in share conversions (1e6)
pub const VIRTUAL_SHARES: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

/// Rounding direction for integer division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    Down,
    Up,
}

fn widen(x: U256) -> U512 {
    let l = x.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

/// Saturates to `U256::MAX` when the quotient does not fit.
fn narrow(x: U512) -> U256 {
    let l = x.as_limbs();
    if l[4..].iter().any(|&limb| limb != 0) {
        return U256::MAX;
    }
    U256::from_limbs([l[0], l[1], l[2], l[3]])
}

/// Computes `x * y / d` with the given rounding.
///
/// The product is held in 512 bits. A zero denominator or a quotient wider
/// than 256 bits saturates to `U256::MAX`.
pub fn mul_div(x: U256, y: U256, d: U256, rounding: RoundingDirection) -> U256 {
    if d.is_zero() {
        return U256::MAX;
    }

    let product = widen(x) * widen(y);
    let denominator = widen(d);
    let quotient = product / denominator;

    let quotient = match rounding {
        RoundingDirection::Down => quotient,
        RoundingDirection::Up if (product % denominator).is_zero() => quotient,
        RoundingDirection::Up => quotient + U512::from(1u64),
    };

    narrow(quotient)
}

/// `floor(x * y / d)`
pub fn mul_div_down(x: U256, y: U256, d: U256) -> U256 {
    mul_div(x, y, d, RoundingDirection::Down)
}

/// `ceil(x * y / d)`
pub fn mul_div_up(x: U256, y: U256, d: U256) -> U256 {
    mul_div(x, y, d, RoundingDirection::Up)
}

/// `x * y / WAD`, rounded down
pub fn w_mul_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, y, WAD)
}

/// `x * WAD / y`, rounded down
pub fn w_div_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, WAD, y)
}

/// `x * WAD / y`, rounded up
pub fn w_div_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, WAD, y)
}

/// Third-order Taylor expansion of `e^(x * n) - 1`.
///
/// Matches the on-chain compounding: three terms, each rounded down. Used both
/// for interest accrual and for annualizing a per-second rate.
pub fn w_taylor_compounded(x: U256, n: U256) -> U256 {
    let first_term = x.saturating_mul(n);
    let second_term = mul_div_down(first_term, first_term, U256::from(2) * WAD);
    let third_term = mul_div_down(second_term, first_term, U256::from(3) * WAD);

    first_term
        .saturating_add(second_term)
        .saturating_add(third_term)
}

/// `x - y`, floored at zero
pub fn zero_floor_sub(x: U256, y: U256) -> U256 {
    x.saturating_sub(y)
}

pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}

pub fn max(x: U256, y: U256) -> U256 {
    if x > y {
        x
    } else {
        y
    }
}

/// Converts assets to shares using the virtual offsets.
pub fn assets_to_shares(
    assets: U256,
    total_assets: U256,
    total_shares: U256,
    rounding: RoundingDirection,
) -> U256 {
    mul_div(
        assets,
        total_shares + VIRTUAL_SHARES,
        total_assets + VIRTUAL_ASSETS,
        rounding,
    )
}

/// Converts shares to assets using the virtual offsets.
pub fn shares_to_assets(
    shares: U256,
    total_assets: U256,
    total_shares: U256,
    rounding: RoundingDirection,
) -> U256 {
    mul_div(
        shares,
        total_assets + VIRTUAL_ASSETS,
        total_shares + VIRTUAL_SHARES,
        rounding,
    )
}

/// Lossy conversion of an integer to `f64`.
pub fn u256_to_f64(value: U256) -> f64 {
    let mut result = 0.0;
    for limb in value.as_limbs().iter().rev() {
        result = result * 18_446_744_073_709_551_616.0 + *limb as f64;
    }
    result
}

/// WAD-scaled value as a plain `f64` (e.g. 0.9 WAD -> 0.9)
pub fn rate_to_f64(value: U256) -> f64 {
    u256_to_f64(value) / 1e18
}

/// Integer asset amount to a decimal token amount (`1_500_000` at 6 decimals -> `1.5`).
pub fn format_units(amount: U256, decimals: u8) -> f64 {
    u256_to_f64(amount) / 10f64.powi(i32::from(decimals))
}

/// Decimal token amount to an integer asset amount, rounded to nearest.
///
/// Negative and non-finite inputs map to zero.
pub fn parse_units(value: f64, decimals: u8) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }

    let scaled = (value * 10f64.powi(i32::from(decimals))).round();
    if scaled < 18_446_744_073_709_551_616.0 {
        return U256::from(scaled as u64);
    }

    // Beyond u64 the f64 mantissa is already the limiting precision
    U256::from(scaled as u128)
}
