//! Detailed output for single markets, plans and simulations.

use alloy_primitives::U256;
use colored::Colorize;
use morpho_realloc_sim::{
    BorrowSimulation, MarketSnapshot, MetaMorphoVault, RangePosition, Reallocation,
    ReallocationData, ReallocationKind, VaultPosition,
};

use super::{format_amount, format_limit, format_rate, format_status, format_strategy, format_usd, truncate_id};

fn header(output: &mut String, title: &str) {
    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str(&format!("{}\n", title.bold()));
    output.push_str(&format!("{}\n\n", "=".repeat(60)));
}

fn push_snapshot(output: &mut String, label: &str, snapshot: &MarketSnapshot, decimals: u8) {
    output.push_str(&format!(
        "  {:<18} supply {} | borrow {} | util {} | borrow APY {} | supply APY {}\n",
        label,
        format_amount(snapshot.total_supply_assets, decimals),
        format_amount(snapshot.total_borrow_assets, decimals),
        format_rate(snapshot.utilization),
        format_rate(snapshot.borrow_apy),
        format_rate(snapshot.supply_apy),
    ));
}

pub fn format_market_detail(
    vault: &MetaMorphoVault,
    position: &VaultPosition,
    status: Option<RangePosition>,
    data: Option<ReallocationData>,
) -> String {
    let mut output = String::new();
    let decimals = vault.asset.decimals;
    let market = &position.market;
    let snapshot = market.chain_data.snapshot();

    header(&mut output, &format!("Market {}", position.market_id()));

    // Params
    output.push_str(&format!("{}\n", "Params".cyan().bold()));
    output.push_str(&format!("  Loan Token:   {}\n", market.params.loan_token));
    output.push_str(&format!("  Collateral:   {}\n", market.params.collateral_token));
    output.push_str(&format!("  Oracle:       {}\n", market.params.oracle));
    output.push_str(&format!("  IRM:          {}\n", market.params.irm));
    output.push_str(&format!("  LLTV:         {}\n\n", format_rate(market.params.lltv)));

    // State
    output.push_str(&format!("{}\n", "State".cyan().bold()));
    output.push_str(&format!("  Supply:       {} {}\n", format_amount(snapshot.total_supply_assets, decimals), vault.asset.symbol));
    output.push_str(&format!("  Borrow:       {} {}\n", format_amount(snapshot.total_borrow_assets, decimals), vault.asset.symbol));
    output.push_str(&format!("  Liquidity:    {} {}\n", format_amount(snapshot.liquidity, decimals), vault.asset.symbol));
    output.push_str(&format!("  Utilization:  {}\n", format_rate(snapshot.utilization)));
    output.push_str(&format!("  Borrow APY:   {}\n", format_rate(snapshot.borrow_apy)));
    output.push_str(&format!("  Supply APY:   {}\n\n", format_rate(snapshot.supply_apy)));

    // Vault position
    output.push_str(&format!("{}\n", "Vault Position".cyan().bold()));
    output.push_str(&format!("  Supplied:     {}\n", format_amount(position.supply_assets, decimals)));
    output.push_str(&format!("  Value:        {}\n", format_usd(vault.asset.usd_value(position.supply_assets))));
    output.push_str(&format!("  Supply Cap:   {}\n", format_limit(position.supply_cap, decimals)));
    output.push_str(&format!("  Max In:       {}\n", format_amount(position.flow_caps.max_in, decimals)));
    output.push_str(&format!("  Max Out:      {}\n\n", format_amount(position.flow_caps.max_out, decimals)));

    // Target
    output.push_str(&format!("{}\n", "Target".cyan().bold()));
    output.push_str(&format!("  Strategy:     {}\n", format_strategy(market.strategy.as_ref())));
    output.push_str(&format!("  Status:       {}\n", format_status(status)));
    match data {
        Some(data) => {
            output.push_str(&format!("  To Supply:    {}\n", format_limit(data.to_supply, decimals)));
            output.push_str(&format!("  To Withdraw:  {}\n", format_amount(data.to_withdraw, decimals)));
            output.push_str(&format!("  To Borrow:    {}\n", format_amount(data.to_borrow, decimals)));
        }
        None => output.push_str(&format!("  {}\n", "No reallocation target".yellow())),
    }

    output
}

pub fn format_plans(vault: &MetaMorphoVault, plans: &[Reallocation]) -> String {
    if plans.is_empty() {
        return "No reallocation needed.".to_string();
    }

    let decimals = vault.asset.decimals;
    let mut output = String::new();

    for plan in plans {
        header(
            &mut output,
            &format!("Reallocation into {}", truncate_id(&plan.supply_market_id)),
        );
        output.push_str(&format!(
            "  Amount:   {} {} ({})\n",
            format_amount(plan.amount_reallocated, decimals),
            vault.asset.symbol,
            format_usd(plan.total_usd)
        ));
        output.push_str(&format!("  Chain:    {}\n", plan.chain));
        output.push_str(&format!("  Legs:     {}\n\n", plan.withdrawals.len()));

        for log in &plan.logs {
            let kind = match log.kind {
                ReallocationKind::Withdraw => "Withdraw".red().bold(),
                ReallocationKind::Supply => "Supply".green().bold(),
            };
            output.push_str(&format!(
                "{} {} {}\n",
                kind,
                format_amount(log.amount, decimals),
                truncate_id(&log.market_id)
            ));
            push_snapshot(&mut output, "before", &log.before, decimals);
            push_snapshot(&mut output, "after", &log.after, decimals);
        }
        output.push('\n');
    }

    output
}

pub fn format_borrow_simulation(
    vault: &MetaMorphoVault,
    amount: U256,
    simulation: &BorrowSimulation,
    available: U256,
) -> String {
    let decimals = vault.asset.decimals;
    let mut output = String::new();

    header(
        &mut output,
        &format!("Borrow {} {}", format_amount(amount, decimals), vault.asset.symbol),
    );
    output.push_str(&format!(
        "  Available liquidity: {} {}\n\n",
        format_amount(available, decimals),
        vault.asset.symbol
    ));

    match simulation {
        BorrowSimulation::NotNeeded { before, after_borrow } => {
            output.push_str(&format!("{}\n", "No reallocation needed".green().bold()));
            push_snapshot(&mut output, "before", before, decimals);
            push_snapshot(&mut output, "after borrow", after_borrow, decimals);
        }
        BorrowSimulation::Reallocated {
            plan,
            before,
            after_reallocation,
            after_borrow,
        } => {
            output.push_str(&format!("{}\n", "Reallocation required".yellow().bold()));
            push_snapshot(&mut output, "before", before, decimals);
            push_snapshot(&mut output, "after reallocation", after_reallocation, decimals);
            push_snapshot(&mut output, "after borrow", after_borrow, decimals);
            output.push('\n');
            output.push_str(&format_plans(vault, std::slice::from_ref(plan)));
        }
        BorrowSimulation::Unavailable {
            before,
            available_liquidity,
        } => {
            output.push_str(&format!(
                "{} at most {} {} can be borrowed\n",
                "Insufficient liquidity:".red().bold(),
                format_amount(*available_liquidity, decimals),
                vault.asset.symbol
            ));
            push_snapshot(&mut output, "before", before, decimals);
        }
    }

    output
}
