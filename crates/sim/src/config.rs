//! Policy thresholds for target resolution and matching.

use alloy_primitives::U256;

/// Minimum USD value for a single market leg to be worth moving
pub const REALLOCATION_USD_THRESHOLD: f64 = 10_000.0;

/// Relative distance from a utilization target (percent of the target) that triggers action
pub const REALLOCATION_THRESHOLD_PERCENT: u64 = 2;

/// Half-width of the dead-band around an APY target, in percent of the target
pub const REALLOCATION_DIST_THRESHOLD: u64 = 5;

/// Share of a market's liquidity that a withdraw or borrow may consume
pub const MAX_LIQUIDITY_USAGE_PERCENT: u64 = 95;

/// Candidates below this percent of the needed amount carry warnings
pub const WARNING_RATIO_PERCENT: u64 = 10;

/// Post-borrow utilization above which a borrow triggers a reallocation (90.5%)
pub const DEFAULT_SUPPLY_TARGET_UTILIZATION: U256 = U256::from_limbs([905_000_000_000_000_000, 0, 0, 0]);

/// Spacing of the exactly computed points in a liquidity series, in percent
pub const SERIES_ANCHOR_STEP_PERCENT: u64 = 10;

/// Tunable thresholds for the reallocation engine.
///
/// # Example
///
/// ```rust
/// use morpho_realloc_sim::ReallocationConfig;
///
/// let config = ReallocationConfig::new()
///     .with_usd_threshold(5_000.0)
///     .with_max_liquidity_usage_percent(90);
///
/// assert_eq!(config.usd_threshold, 5_000.0);
/// assert_eq!(config.utilization_threshold_percent, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReallocationConfig {
    pub usd_threshold: f64,
    pub utilization_threshold_percent: u64,
    pub apy_dist_threshold_percent: u64,
    pub max_liquidity_usage_percent: u64,
    pub warning_ratio_percent: u64,
    pub supply_target_utilization: U256,
    pub series_anchor_step_percent: u64,
}

impl Default for ReallocationConfig {
    fn default() -> Self {
        Self {
            usd_threshold: REALLOCATION_USD_THRESHOLD,
            utilization_threshold_percent: REALLOCATION_THRESHOLD_PERCENT,
            apy_dist_threshold_percent: REALLOCATION_DIST_THRESHOLD,
            max_liquidity_usage_percent: MAX_LIQUIDITY_USAGE_PERCENT,
            warning_ratio_percent: WARNING_RATIO_PERCENT,
            supply_target_utilization: DEFAULT_SUPPLY_TARGET_UTILIZATION,
            series_anchor_step_percent: SERIES_ANCHOR_STEP_PERCENT,
        }
    }
}

impl ReallocationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usd_threshold(mut self, usd: f64) -> Self {
        self.usd_threshold = usd;
        self
    }

    pub fn with_utilization_threshold_percent(mut self, percent: u64) -> Self {
        self.utilization_threshold_percent = percent;
        self
    }

    pub fn with_apy_dist_threshold_percent(mut self, percent: u64) -> Self {
        self.apy_dist_threshold_percent = percent;
        self
    }

    /// Clamped to 100.
    pub fn with_max_liquidity_usage_percent(mut self, percent: u64) -> Self {
        self.max_liquidity_usage_percent = percent.min(100);
        self
    }

    pub fn with_warning_ratio_percent(mut self, percent: u64) -> Self {
        self.warning_ratio_percent = percent;
        self
    }

    pub fn with_supply_target_utilization(mut self, utilization: U256) -> Self {
        self.supply_target_utilization = utilization;
        self
    }

    /// Clamped to `1..=100`.
    pub fn with_series_anchor_step_percent(mut self, percent: u64) -> Self {
        self.series_anchor_step_percent = percent.clamp(1, 100);
        self
    }
}
