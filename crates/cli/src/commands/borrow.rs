//! Borrow simulation command implementation.

use alloy_primitives::U256;
use anyhow::{Context, Result};
use morpho_realloc_sim::{max_available_liquidity, simulate_borrow, MetaMorphoVault, ReallocationConfig};

use crate::cli::{BorrowArgs, OutputFormat};
use crate::output::format_borrow_simulation;

/// Parse a human-readable amount string to U256 given decimals.
fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let parts: Vec<&str> = amount.split('.').collect();

    let (integer_part, fractional_part) = match parts.as_slice() {
        [integer] => (*integer, ""),
        [integer, fraction] => (*integer, *fraction),
        _ => anyhow::bail!("Invalid amount format: {}", amount),
    };

    // Extra precision beyond the token's decimals is dropped
    let fractional_part = fractional_part
        .get(..decimals as usize)
        .unwrap_or(fractional_part);
    let fractional_padded = format!("{:0<width$}", fractional_part, width = decimals as usize);

    let combined = format!("{}{}", integer_part, fractional_padded);
    let combined = combined.trim_start_matches('0');

    if combined.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(combined, 10).with_context(|| format!("Failed to parse amount: {}", amount))
}

pub fn run_borrow(
    vault: &MetaMorphoVault,
    args: &BorrowArgs,
    config: &ReallocationConfig,
    format: OutputFormat,
) -> Result<()> {
    let amount = parse_amount(&args.amount, vault.asset.decimals)?;
    let simulation = simulate_borrow(vault, args.market_id, amount, config)?;

    match format {
        OutputFormat::Table => {
            let available = max_available_liquidity(vault, args.market_id, config)?;
            println!("{}", format_borrow_simulation(vault, amount, &simulation, available));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&simulation)?);
        }
    }

    Ok(())
}
