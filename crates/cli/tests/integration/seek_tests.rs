//! Seek command tests.

use predicates::prelude::*;

use super::helpers::{
    morpho_cmd_with_snapshot, run_json, CBETH_MARKET, IDLE_MARKET, RETH_MARKET, WSTETH_MARKET,
};

#[test]
fn test_seek_supply_drains_sources_in_id_order() {
    let json = run_json(&["seek", WSTETH_MARKET]);
    let plans = json.as_array().unwrap();
    assert_eq!(plans.len(), 1);

    let plan = &plans[0];
    assert_eq!(plan["supplyMarketId"], WSTETH_MARKET);
    // 300 WETH from rETH (max out) then 600 WETH from the idle market
    assert_eq!(plan["amountReallocated"], "0x30ca024f987b900000");

    let withdrawals = plan["withdrawals"].as_array().unwrap();
    assert_eq!(withdrawals.len(), 2);
    assert_eq!(withdrawals[0]["marketId"], RETH_MARKET);
    assert_eq!(withdrawals[0]["amount"], "0x1043561a8829300000");
    assert_eq!(withdrawals[1]["marketId"], IDLE_MARKET);
    assert_eq!(withdrawals[1]["amount"], "0x2086ac351052600000");

    // Two withdraw legs then the supply leg
    assert_eq!(plan["logs"].as_array().unwrap().len(), 3);
}

#[test]
fn test_seek_withdraw_picks_largest_destination() {
    let json = run_json(&["seek", RETH_MARKET]);
    let plan = &json.as_array().unwrap()[0];
    assert_eq!(plan["supplyMarketId"], IDLE_MARKET);
    assert_eq!(plan["withdrawals"][0]["marketId"], RETH_MARKET);
}

#[test]
fn test_seek_filter_idle() {
    let json = run_json(&["seek", RETH_MARKET, "--filter-idle"]);
    let plan = &json.as_array().unwrap()[0];
    assert_eq!(plan["supplyMarketId"], WSTETH_MARKET);
    assert_eq!(plan["amountReallocated"], "0x1043561a8829300000");
}

#[test]
fn test_seek_idle_market_empties_into_destination() {
    let json = run_json(&["seek", IDLE_MARKET]);
    let plan = &json.as_array().unwrap()[0];
    assert_eq!(plan["supplyMarketId"], WSTETH_MARKET);
    assert_eq!(plan["amountReallocated"], "0x2086ac351052600000");
}

#[test]
fn test_seek_within_range() {
    let json = run_json(&["seek", CBETH_MARKET]);
    assert!(json.as_array().unwrap().is_empty());

    morpho_cmd_with_snapshot()
        .args(["seek", CBETH_MARKET])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reallocation needed."));
}

#[test]
fn test_seek_all_markets() {
    let json = run_json(&["seek"]);
    let plans = json.as_array().unwrap();
    assert_eq!(plans.len(), 3);
}

#[test]
fn test_seek_table() {
    morpho_cmd_with_snapshot()
        .args(["seek", WSTETH_MARKET])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reallocation into"))
        .stdout(predicate::str::contains("900.00 WETH"))
        .stdout(predicate::str::contains("Withdraw"))
        .stdout(predicate::str::contains("Supply"));
}
