//! Output formatting for CLI results.

pub mod detail;
pub mod table;

pub use detail::{format_borrow_simulation, format_market_detail, format_plans};
pub use table::{format_candidates_table, format_markets_table, format_series_table};

use alloy_primitives::U256;
use morpho_realloc_sim::math::{format_units, rate_to_f64};
use morpho_realloc_sim::{Limit, MarketId, RangePosition};
use morpho_realloc_strategy::{Strategy, TargetMode};

fn truncate_id(id: &MarketId) -> String {
    let id = format!("{}", id);
    if id.len() > 14 {
        format!("{}...{}", &id[..10], &id[id.len() - 4..])
    } else {
        id
    }
}

fn format_amount(amount: U256, decimals: u8) -> String {
    format!("{:.2}", format_units(amount, decimals))
}

fn format_limit(limit: Limit, decimals: u8) -> String {
    match limit {
        Limit::Finite(amount) => format_amount(amount, decimals),
        Limit::Unlimited => "unlimited".to_string(),
    }
}

fn format_rate(rate: U256) -> String {
    format!("{:.2}%", rate_to_f64(rate) * 100.0)
}

fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 1_000_000.0 => format!("${:.2}M", v / 1_000_000.0),
        Some(v) if v >= 1_000.0 => format!("${:.2}K", v / 1_000.0),
        Some(v) => format!("${:.2}", v),
        None => "-".to_string(),
    }
}

fn format_strategy(strategy: Option<&Strategy>) -> String {
    let Some(strategy) = strategy else {
        return "-".to_string();
    };

    if strategy.blacklist {
        return "blacklisted".to_string();
    }
    if strategy.idle_market {
        return "idle".to_string();
    }
    match strategy.target {
        Some(TargetMode::Utilization { target, .. }) => format!("util {}", format_rate(target)),
        Some(TargetMode::BorrowApy { target, .. }) => format!("apy {}", format_rate(target)),
        None => "-".to_string(),
    }
}

fn format_status(status: Option<RangePosition>) -> String {
    match status {
        Some(RangePosition::Below) => "Below".to_string(),
        Some(RangePosition::Within) => "Within".to_string(),
        Some(RangePosition::Above) => "Above".to_string(),
        None => "-".to_string(),
    }
}
