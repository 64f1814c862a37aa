//! Adaptive Curve Interest Rate Model (IRM) evaluator.
//!
//! Two pieces make up the model:
//!
//! ## 1. The curve
//!
//! The instantaneous borrow rate is a kinked line centered on the target
//! utilization (90%):
//!
//! ```text
//! If utilization >= target:
//!     rate = rate_at_target * (1 + 3 * err)      // up to 4x at 100%
//! If utilization < target:
//!     rate = rate_at_target * (1 - 0.75 * err)   // down to 1/4x at 0%
//!
//! where err = |utilization - target| / norm_factor
//! ```
//!
//! ## 2. Rate adaptation
//!
//! `rate_at_target` itself drifts with time: up while the market sits above
//! target, down while below, at 50% per year of normalized error. It is
//! always clamped to `[MIN_RATE_AT_TARGET, MAX_RATE_AT_TARGET]`.
//!
//! # Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TARGET_UTILIZATION` | 90% | Kink of the curve |
//! | `CURVE_STEEPNESS` | 4.0 | Rate multiplier at 100% utilization |
//! | `INITIAL_RATE_AT_TARGET` | ~4% APR | Starting rate for new markets |
//! | `ADJUSTMENT_SPEED` | 50%/year | How fast rate_at_target adapts |
//! | `MIN_RATE_AT_TARGET` | 0.1% APR | Floor for rate at target |
//! | `MAX_RATE_AT_TARGET` | 200% APR | Ceiling for rate at target |
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::irm::{compute_borrow_rate, compute_new_borrow_apy, TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET};
//! use morpho_realloc_sim::math::rate_to_f64;
//!
//! // At the kink the borrow rate is exactly the rate at target
//! assert_eq!(compute_borrow_rate(TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET), INITIAL_RATE_AT_TARGET);
//!
//! let apy = rate_to_f64(compute_new_borrow_apy(TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET));
//! assert!(apy > 0.04 && apy < 0.041);
//! ```

use alloy_primitives::U256;

use crate::market::MarketState;
use crate::math::{
    max, min, mul_div_down, w_div_down, w_mul_down, w_taylor_compounded, zero_floor_sub,
    SECONDS_PER_YEAR, WAD,
};

/// Curve steepness parameter (4.0 in WAD)
pub const CURVE_STEEPNESS: U256 = U256::from_limbs([4_000_000_000_000_000_000, 0, 0, 0]);

/// Target utilization rate (90% in WAD = 0.9)
pub const TARGET_UTILIZATION: U256 = U256::from_limbs([900_000_000_000_000_000, 0, 0, 0]);

/// Initial rate at target (4% / seconds per year)
pub const INITIAL_RATE_AT_TARGET: U256 = U256::from_limbs([1_268_391_679, 0, 0, 0]);

/// Adjustment speed (50% / seconds per year)
pub const ADJUSTMENT_SPEED: U256 = U256::from_limbs([15_854_895_991, 0, 0, 0]);

/// Minimum rate at target (0.1% / seconds per year)
pub const MIN_RATE_AT_TARGET: U256 = U256::from_limbs([31_709_791, 0, 0, 0]);

/// Maximum rate at target (200% / seconds per year)
pub const MAX_RATE_AT_TARGET: U256 = U256::from_limbs([63_419_583_967, 0, 0, 0]);

/// ln(2) scaled by WAD
pub const LN_2_INT: i128 = 693_147_180_559_945_309;

/// ln(1e-18) scaled by WAD (negative)
pub const LN_WEI_INT: i128 = -41_446_531_673_892_822_312;

/// Upper bound for wExp to avoid overflow
pub const WEXP_UPPER_BOUND: i128 = 93_859_467_695_000_404_319;

/// Value of wExp at upper bound
/// 57716089161558943949701069502944508345128422502756744429568 in little-endian u64 limbs
pub const WEXP_UPPER_VALUE: U256 = U256::from_limbs([
    0x3216C1AD5D72C200,
    0x09BA5D32E9C0DE49,
    0x80,
    0,
]);

/// Result of borrow rate calculation
#[derive(Debug, Clone)]
pub struct BorrowRateResult {
    /// Average borrow rate over the period (WAD-scaled per second)
    pub avg_borrow_rate: U256,
    /// End borrow rate (instantaneous rate at end of period)
    pub end_borrow_rate: U256,
    /// New rate at target after the period
    pub end_rate_at_target: U256,
}

/// Signed distance of utilization from the kink, normalized to `[0, WAD]`.
#[derive(Debug, Clone, Copy)]
struct UtilizationError {
    magnitude: U256,
    negative: bool,
}

impl UtilizationError {
    fn new(utilization: U256) -> Self {
        if utilization > TARGET_UTILIZATION {
            let above = min(utilization, WAD) - TARGET_UTILIZATION;
            Self {
                magnitude: w_div_down(above, WAD - TARGET_UTILIZATION),
                negative: false,
            }
        } else {
            Self {
                magnitude: w_div_down(TARGET_UTILIZATION - utilization, TARGET_UTILIZATION),
                negative: true,
            }
        }
    }

    /// Applies the kinked curve to a rate at target.
    fn curve(self, rate_at_target: U256) -> U256 {
        if self.negative {
            let coeff = WAD - w_div_down(WAD, CURVE_STEEPNESS);
            let factor = WAD.saturating_sub(w_mul_down(coeff, self.magnitude));
            w_mul_down(factor, rate_at_target)
        } else {
            let coeff = CURVE_STEEPNESS - WAD;
            let factor = WAD + w_mul_down(coeff, self.magnitude);
            w_mul_down(factor, rate_at_target)
        }
    }

    /// `rate_at_target * e^(±speed * elapsed)`, clamped.
    fn adapt(self, rate_at_target: U256, linear_adaptation: U256) -> U256 {
        let exponent = linear_adaptation.saturating_to::<i128>();
        let exponent = if self.negative { -exponent } else { exponent };
        clamp_rate_at_target(w_mul_down(rate_at_target, w_exp(exponent)))
    }

    fn linear_adaptation(self, elapsed: u64) -> U256 {
        w_mul_down(ADJUSTMENT_SPEED, self.magnitude).saturating_mul(U256::from(elapsed))
    }
}

fn clamp_rate_at_target(rate: U256) -> U256 {
    min(max(rate, MIN_RATE_AT_TARGET), MAX_RATE_AT_TARGET)
}

/// Rate at target the curve actually uses: zero marks an IRM that has not
/// been touched yet, which starts at [`INITIAL_RATE_AT_TARGET`].
pub fn effective_rate_at_target(rate_at_target: U256) -> U256 {
    if rate_at_target.is_zero() {
        INITIAL_RATE_AT_TARGET
    } else {
        rate_at_target
    }
}

/// Approximation of exp(x) used by the Adaptive Curve IRM.
///
/// Uses the decomposition: e^x = 2^q * e^r where x = q*ln(2) + r
/// with -ln(2)/2 <= r <= ln(2)/2
pub fn w_exp(x: i128) -> U256 {
    // exp(x) < 1e-18 rounds to zero
    if x < LN_WEI_INT {
        return U256::ZERO;
    }

    if x >= WEXP_UPPER_BOUND {
        return WEXP_UPPER_VALUE;
    }

    // q = x / ln(2) rounded half away from zero
    let rounding_adjustment = if x < 0 { -(LN_2_INT / 2) } else { LN_2_INT / 2 };
    let q = (x + rounding_adjustment) / LN_2_INT;
    let r = x - q * LN_2_INT;

    // e^r ≈ 1 + r + r²/2
    let wad_i128 = WAD.saturating_to::<i128>();
    let r_squared = (r * r) / wad_i128 / 2;
    let exp_r = U256::from((wad_i128 + r + r_squared).unsigned_abs());

    let shift = usize::try_from(q.unsigned_abs()).unwrap_or(usize::MAX);
    if q >= 0 {
        exp_r << shift
    } else {
        exp_r >> shift
    }
}

/// Borrow rates over an accrual window, together with the adapted rate at target.
///
/// A zero `rate_at_target` denotes a market that has never been touched; it
/// starts at [`INITIAL_RATE_AT_TARGET`] without adaptation. The average rate
/// over the window uses the trapezoidal rule on the start, middle and end
/// rates at target.
///
/// # Example
///
/// ```rust
/// use morpho_realloc_sim::irm::{get_borrow_rate, INITIAL_RATE_AT_TARGET};
/// use alloy_primitives::U256;
///
/// let high_util = U256::from(950_000_000_000_000_000u64);
/// let adapted = get_borrow_rate(high_util, INITIAL_RATE_AT_TARGET, 86_400);
/// assert!(adapted.end_rate_at_target > INITIAL_RATE_AT_TARGET);
/// assert!(adapted.avg_borrow_rate <= adapted.end_borrow_rate);
/// ```
pub fn get_borrow_rate(utilization: U256, rate_at_target: U256, elapsed: u64) -> BorrowRateResult {
    let err = UtilizationError::new(utilization);

    let (avg_rate_at_target, end_rate_at_target) = if rate_at_target.is_zero() {
        (INITIAL_RATE_AT_TARGET, INITIAL_RATE_AT_TARGET)
    } else {
        let linear_adaptation = err.linear_adaptation(elapsed);

        if linear_adaptation.is_zero() {
            (rate_at_target, rate_at_target)
        } else {
            let end_rate = err.adapt(rate_at_target, linear_adaptation);
            let mid_rate = err.adapt(rate_at_target, linear_adaptation / U256::from(2));
            let avg_rate = (rate_at_target + end_rate + U256::from(2) * mid_rate) / U256::from(4);

            (avg_rate, end_rate)
        }
    };

    BorrowRateResult {
        avg_borrow_rate: err.curve(avg_rate_at_target),
        end_borrow_rate: err.curve(end_rate_at_target),
        end_rate_at_target,
    }
}

/// Utilization of a market (WAD-scaled); zero when nothing is supplied.
pub fn compute_utilization(total_borrow_assets: U256, total_supply_assets: U256) -> U256 {
    if total_supply_assets.is_zero() {
        return U256::ZERO;
    }
    w_div_down(total_borrow_assets, total_supply_assets)
}

/// Instantaneous per-second borrow rate on the curve.
pub fn compute_borrow_rate(utilization: U256, rate_at_target: U256) -> U256 {
    UtilizationError::new(utilization).curve(effective_rate_at_target(rate_at_target))
}

/// Rate at target after adapting from `start_rate_at_target` over the time
/// between the market's last update and `timestamp`.
///
/// The result is always inside `[MIN_RATE_AT_TARGET, MAX_RATE_AT_TARGET]`.
/// A timestamp at or before the last update means no elapsed time.
pub fn compute_rate_at_target(market: &MarketState, start_rate_at_target: U256, timestamp: u64) -> U256 {
    if start_rate_at_target.is_zero() {
        return INITIAL_RATE_AT_TARGET;
    }

    let utilization = compute_utilization(market.total_borrow_assets, market.total_supply_assets);
    let err = UtilizationError::new(utilization);
    let elapsed = timestamp.saturating_sub(market.last_update);

    err.adapt(start_rate_at_target, err.linear_adaptation(elapsed))
}

/// Annualized borrow APY (WAD) at a utilization, compounded over a year.
pub fn compute_new_borrow_apy(utilization: U256, rate_at_target: U256) -> U256 {
    let rate = compute_borrow_rate(utilization, rate_at_target);
    w_taylor_compounded(rate, U256::from(SECONDS_PER_YEAR))
}

/// Supply APY (WAD): borrow APY earned on the borrowed fraction, net of the protocol fee.
pub fn compute_new_supply_apy(borrow_apy: U256, utilization: U256, fee: U256) -> U256 {
    w_mul_down(w_mul_down(borrow_apy, utilization), zero_floor_sub(WAD, fee))
}

/// Per-second rate whose yearly compounding gives `apy`.
///
/// Three-term series of `ln(1 + apy)`, divided by the seconds in a year.
pub fn get_rate_from_apy(apy: U256) -> U256 {
    let first_term = apy;
    let squared = w_mul_down(apy, apy);
    let second_term = squared / U256::from(2);
    let third_term = w_mul_down(squared, apy) / U256::from(3);

    zero_floor_sub(first_term + third_term, second_term) / U256::from(SECONDS_PER_YEAR)
}

/// Utilization at which the curve yields `wanted_rate`.
///
/// Rates at or above the curve's maximum map to full utilization, rates at
/// or below its minimum map to zero.
pub fn compute_new_utilization(wanted_rate: U256, rate_at_target: U256) -> U256 {
    let rate_at_target = effective_rate_at_target(rate_at_target);
    let max_rate = w_mul_down(CURVE_STEEPNESS, rate_at_target);
    let min_rate = w_div_down(rate_at_target, CURVE_STEEPNESS);

    if wanted_rate >= max_rate {
        WAD
    } else if wanted_rate >= rate_at_target {
        TARGET_UTILIZATION
            + mul_div_down(
                WAD - TARGET_UTILIZATION,
                wanted_rate - rate_at_target,
                max_rate - rate_at_target,
            )
    } else if wanted_rate > min_rate {
        mul_div_down(
            TARGET_UTILIZATION,
            wanted_rate - min_rate,
            rate_at_target - min_rate,
        )
    } else {
        U256::ZERO
    }
}

/// Utilization that produces a target borrow APY at the given rate at target.
pub fn utilization_for_borrow_apy(apy: U256, rate_at_target: U256) -> U256 {
    compute_new_utilization(get_rate_from_apy(apy), rate_at_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math;

    fn wad_percent(percent: u64) -> U256 {
        U256::from(percent) * WAD / U256::from(100)
    }

    fn create_test_state(supply: u64, borrow: u64) -> MarketState {
        MarketState {
            total_supply_assets: U256::from(supply) * WAD,
            total_borrow_assets: U256::from(borrow) * WAD,
            total_supply_shares: U256::from(supply) * WAD * math::VIRTUAL_SHARES,
            total_borrow_shares: U256::from(borrow) * WAD * math::VIRTUAL_SHARES,
            last_update: 1000,
            fee: U256::ZERO,
        }
    }

    #[test]
    fn test_w_exp_zero() {
        assert_eq!(w_exp(0), WAD);
    }

    #[test]
    fn test_w_exp_positive() {
        // e^1 ≈ 2.718
        let result = w_exp(WAD.saturating_to::<i128>());
        assert!((math::rate_to_f64(result) - std::f64::consts::E).abs() < 0.1);
    }

    #[test]
    fn test_w_exp_negative() {
        // e^(-1) ≈ 0.368
        let result = w_exp(-(WAD.saturating_to::<i128>()));
        assert!((math::rate_to_f64(result) - 0.368).abs() < 0.05);
    }

    #[test]
    fn test_w_exp_very_small() {
        assert_eq!(w_exp(LN_WEI_INT - 1), U256::ZERO);
    }

    #[test]
    fn test_w_exp_upper_bound() {
        assert_eq!(w_exp(WEXP_UPPER_BOUND), WEXP_UPPER_VALUE);
        assert_eq!(w_exp(WEXP_UPPER_BOUND + 1), WEXP_UPPER_VALUE);
    }

    #[test]
    fn test_w_exp_small_values() {
        let tenth = WAD.saturating_to::<i128>() / 10;
        assert!((math::rate_to_f64(w_exp(tenth)) - 1.105).abs() < 0.01);
        assert!((math::rate_to_f64(w_exp(-tenth)) - 0.905).abs() < 0.01);
    }

    #[test]
    fn test_compute_utilization() {
        assert_eq!(compute_utilization(U256::from(900), U256::from(1000)), TARGET_UTILIZATION);
        assert_eq!(compute_utilization(U256::from(5), U256::ZERO), U256::ZERO);
        assert_eq!(compute_utilization(U256::ZERO, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_curve_end_points() {
        let rat = INITIAL_RATE_AT_TARGET;

        assert_eq!(compute_borrow_rate(TARGET_UTILIZATION, rat), rat);
        assert_eq!(compute_borrow_rate(WAD, rat), rat * U256::from(4));
        assert_eq!(compute_borrow_rate(U256::ZERO, rat), rat / U256::from(4));
    }

    #[test]
    fn test_curve_is_monotonic() {
        let rat = INITIAL_RATE_AT_TARGET;
        let mut previous = U256::ZERO;
        for percent in 0..=100u64 {
            let rate = compute_borrow_rate(wad_percent(percent), rat);
            assert!(rate >= previous, "curve decreased at {percent}%");
            previous = rate;
        }
    }

    #[test]
    fn test_get_borrow_rate_initial() {
        let result = get_borrow_rate(TARGET_UTILIZATION, U256::ZERO, 0);
        assert_eq!(result.end_rate_at_target, INITIAL_RATE_AT_TARGET);
    }

    #[test]
    fn test_get_borrow_rate_adaptation_over_time() {
        let one_day = 86_400u64;

        let high = get_borrow_rate(wad_percent(95), INITIAL_RATE_AT_TARGET, one_day);
        assert!(high.end_rate_at_target > INITIAL_RATE_AT_TARGET);
        assert!(high.avg_borrow_rate <= high.end_borrow_rate);

        let low = get_borrow_rate(wad_percent(50), INITIAL_RATE_AT_TARGET, one_day);
        assert!(low.end_rate_at_target < INITIAL_RATE_AT_TARGET);
        assert!(low.avg_borrow_rate >= low.end_borrow_rate);
    }

    #[test]
    fn test_compute_rate_at_target_no_elapsed_time() {
        // Utilization exactly at the kink and no time passed: unchanged
        let market = create_test_state(1000, 900);
        let rat = U256::from(2_000_000_000u64);
        assert_eq!(compute_rate_at_target(&market, rat, market.last_update), rat);
    }

    #[test]
    fn test_compute_rate_at_target_at_kink_over_time() {
        // err = 0 means no adaptation regardless of elapsed time
        let market = create_test_state(1000, 900);
        let rat = U256::from(2_000_000_000u64);
        assert_eq!(compute_rate_at_target(&market, rat, market.last_update + 86_400 * 30), rat);
    }

    #[test]
    fn test_compute_rate_at_target_bounds() {
        let year = SECONDS_PER_YEAR * 5;

        let hot = create_test_state(1000, 1000);
        let rat = compute_rate_at_target(&hot, MAX_RATE_AT_TARGET, hot.last_update + year);
        assert_eq!(rat, MAX_RATE_AT_TARGET);

        let cold = create_test_state(1000, 0);
        let rat = compute_rate_at_target(&cold, MIN_RATE_AT_TARGET, cold.last_update + year);
        assert_eq!(rat, MIN_RATE_AT_TARGET);
    }

    #[test]
    fn test_compute_rate_at_target_timestamp_in_past() {
        let market = create_test_state(1000, 500);
        let rat = U256::from(2_000_000_000u64);
        assert_eq!(compute_rate_at_target(&market, rat, 0), rat);
    }

    #[test]
    fn test_compute_new_borrow_apy_at_target() {
        // 4% APR compounds to ~4.08% APY
        let apy = math::rate_to_f64(compute_new_borrow_apy(TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET));
        assert!((apy - 0.04f64.exp_m1()).abs() < 1e-6);
    }

    #[test]
    fn test_compute_new_supply_apy() {
        let borrow_apy = wad_percent(10);

        // 10% * 50% utilization = 5%, minus a 10% fee = 4.5%
        let supply_apy = compute_new_supply_apy(borrow_apy, wad_percent(50), wad_percent(10));
        assert_eq!(supply_apy, U256::from(45) * WAD / U256::from(1000));

        assert_eq!(compute_new_supply_apy(borrow_apy, U256::ZERO, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_get_rate_from_apy_zero() {
        assert_eq!(get_rate_from_apy(U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_compute_new_utilization_cases() {
        let rat = INITIAL_RATE_AT_TARGET;

        assert_eq!(compute_new_utilization(rat * U256::from(4), rat), WAD);
        assert_eq!(compute_new_utilization(rat * U256::from(10), rat), WAD);
        assert_eq!(compute_new_utilization(rat, rat), TARGET_UTILIZATION);
        assert_eq!(compute_new_utilization(rat / U256::from(4), rat), U256::ZERO);
        assert_eq!(compute_new_utilization(U256::ZERO, rat), U256::ZERO);

        let between = compute_new_utilization(rat * U256::from(2), rat);
        assert!(between > TARGET_UTILIZATION && between < WAD);

        let below = compute_new_utilization(rat / U256::from(2), rat);
        assert!(below > U256::ZERO && below < TARGET_UTILIZATION);
    }

    #[test]
    fn test_compute_new_utilization_inverts_curve() {
        let rat = INITIAL_RATE_AT_TARGET;
        for percent in [10u64, 35, 60, 89, 91, 95, 99] {
            let utilization = wad_percent(percent);
            let rate = compute_borrow_rate(utilization, rat);
            let recovered = compute_new_utilization(rate, rat);

            let diff = if recovered > utilization { recovered - utilization } else { utilization - recovered };
            assert!(diff < U256::from(1_000_000_000_000u64), "{percent}%: {recovered}");
        }
    }

    #[test]
    fn test_uninitialized_rate_uses_initial_curve() {
        let utilization = wad_percent(90);
        assert_eq!(
            compute_new_borrow_apy(utilization, U256::ZERO),
            compute_new_borrow_apy(utilization, INITIAL_RATE_AT_TARGET)
        );
        assert_eq!(
            compute_new_utilization(INITIAL_RATE_AT_TARGET, U256::ZERO),
            TARGET_UTILIZATION
        );
        assert!(compute_new_utilization(INITIAL_RATE_AT_TARGET, U256::ZERO) < WAD);
    }

    // The three-term ln(1 + x) series drifts past 1bp around 15% APY, so the
    // tolerance widens there. A tighter bound needs more series terms.
    #[test]
    fn test_apy_round_trip() {
        let rat = INITIAL_RATE_AT_TARGET;
        for (percent, tolerance_bps) in [(3u64, 1.0), (5, 1.0), (10, 1.0), (15, 4.0)] {
            let target = wad_percent(percent);
            let utilization = utilization_for_borrow_apy(target, rat);
            let apy = compute_new_borrow_apy(utilization, rat);

            let error_bps = (math::rate_to_f64(apy) - math::rate_to_f64(target)).abs() * 10_000.0;
            assert!(error_bps < tolerance_bps, "{percent}% apy off by {error_bps} bps");
        }
    }
}
