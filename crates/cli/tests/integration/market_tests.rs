//! Market and candidates command tests.

use predicates::prelude::*;

use super::helpers::{
    morpho_cmd_with_snapshot, run_json, CBETH_MARKET, IDLE_MARKET, RETH_MARKET, WSTETH_MARKET,
};

#[test]
fn test_market_table() {
    morpho_cmd_with_snapshot()
        .arg("market")
        .assert()
        .success()
        .stdout(predicate::str::contains("Utilization"))
        .stdout(predicate::str::contains("Above"))
        .stdout(predicate::str::contains("Below"))
        .stdout(predicate::str::contains("Within"))
        .stdout(predicate::str::contains("idle"));
}

#[test]
fn test_market_json_sorted_by_id() {
    let json = run_json(&["market"]);
    let markets = json.as_array().unwrap();

    let ids: Vec<&str> = markets
        .iter()
        .map(|market| market["marketId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![CBETH_MARKET, RETH_MARKET, IDLE_MARKET, WSTETH_MARKET]);

    assert_eq!(markets[0]["status"], "within");
    assert_eq!(markets[1]["status"], "below");
    assert_eq!(markets[2]["status"], "below");
    assert_eq!(markets[3]["status"], "above");
}

#[test]
fn test_market_detail() {
    morpho_cmd_with_snapshot()
        .args(["market", WSTETH_MARKET])
        .assert()
        .success()
        .stdout(predicate::str::contains(WSTETH_MARKET))
        .stdout(predicate::str::contains("Vault Position"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("To Supply"));
}

#[test]
fn test_market_detail_json() {
    let json = run_json(&["market", IDLE_MARKET]);
    assert_eq!(json["marketId"], IDLE_MARKET);
    assert_eq!(json["supplyCap"], "unlimited");
    assert_eq!(json["reallocationData"]["toSupply"], "unlimited");
}

#[test]
fn test_candidates_for_market_needing_liquidity() {
    let json = run_json(&["candidates", WSTETH_MARKET]);
    let candidates = json.as_array().unwrap();

    assert!(candidates
        .iter()
        .all(|candidate| candidate["marketId"] != WSTETH_MARKET));

    let cbeth = candidates
        .iter()
        .find(|candidate| candidate["marketId"] == CBETH_MARKET)
        .unwrap();
    assert_eq!(cbeth["warnings"]["targetTooCloseOrAlreadyCrossed"], true);
}

#[test]
fn test_candidates_table() {
    morpho_cmd_with_snapshot()
        .args(["candidates", WSTETH_MARKET])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max Amount"))
        .stdout(predicate::str::contains("target too close"));
}
