//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use morpho_realloc_sim::{MarketId, ReallocationConfig};

/// Morpho reallocation planner - plan vault liquidity moves from a snapshot
#[derive(Parser, Debug)]
#[command(name = "morpho-realloc")]
#[command(about = "Plan Morpho vault liquidity reallocations from a snapshot", long_about = None)]
pub struct Cli {
    /// Vault snapshot file (JSON)
    #[arg(long, global = true, env = "MORPHO_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, env = "MORPHO_REALLOC_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Minimum USD value for a single market leg (default: 10000)
    #[arg(long, global = true, env = "MORPHO_REALLOC_USD_THRESHOLD")]
    pub usd_threshold: Option<f64>,

    /// Post-borrow utilization, in percent, above which a borrow triggers a reallocation (default: 90.5)
    #[arg(long, global = true, env = "MORPHO_REALLOC_SUPPLY_TARGET")]
    pub supply_target: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Engine thresholds, with flag overrides applied.
    pub fn reallocation_config(&self) -> ReallocationConfig {
        let mut config = ReallocationConfig::new();
        if let Some(usd) = self.usd_threshold {
            config = config.with_usd_threshold(usd);
        }
        if let Some(percent) = self.supply_target {
            let utilization = morpho_realloc_sim::math::parse_units(percent / 100.0, 18);
            config = config.with_supply_target_utilization(utilization);
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the vault's markets against their targets
    Market(MarketArgs),
    /// List markets able to move liquidity around a market
    Candidates(CandidatesArgs),
    /// Plan reallocations for out-of-range markets
    Seek(SeekArgs),
    /// Sweep borrowing across a market's available liquidity
    Series(SeriesArgs),
    /// Simulate a borrow, reallocating first if needed
    Borrow(BorrowArgs),
}

#[derive(Parser, Debug)]
pub struct MarketArgs {
    /// Market id (omit to list every market)
    pub market_id: Option<MarketId>,
}

#[derive(Parser, Debug)]
pub struct CandidatesArgs {
    /// Market id of the focus market
    pub market_id: MarketId,
}

#[derive(Parser, Debug)]
pub struct SeekArgs {
    /// Market id (omit to plan for every market)
    pub market_id: Option<MarketId>,

    /// Leave idle markets out of the candidates
    #[arg(long)]
    pub filter_idle: bool,
}

#[derive(Parser, Debug)]
pub struct SeriesArgs {
    /// Market id
    pub market_id: MarketId,

    /// Spacing of exactly computed points, in percent
    #[arg(long, default_value = "10")]
    pub step: u64,

    /// Show one table row every N percent
    #[arg(long, default_value = "10")]
    pub every: u8,
}

#[derive(Parser, Debug)]
pub struct BorrowArgs {
    /// Market id
    pub market_id: MarketId,

    /// Amount to borrow in human-readable units (e.g., "100.5")
    pub amount: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
