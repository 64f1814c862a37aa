//! Series and borrow simulation tests.

use predicates::prelude::*;

use super::helpers::{morpho_cmd_with_snapshot, run_json, CBETH_MARKET, RETH_MARKET};

#[test]
fn test_series_json() {
    let json = run_json(&["series", CBETH_MARKET]);
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 101);
    assert_eq!(points[0]["percentage"], 0);
    assert_eq!(points[100]["percentage"], 100);
    assert_eq!(points[0]["borrowAmount"], "0x0");
}

#[test]
fn test_series_table_every() {
    morpho_cmd_with_snapshot()
        .args(["series", CBETH_MARKET, "--every", "25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25%"))
        .stdout(predicate::str::contains("100%"))
        .stdout(predicate::str::contains("Borrow APY"));
}

#[test]
fn test_borrow_not_needed() {
    let json = run_json(&["borrow", RETH_MARKET, "100"]);
    assert_eq!(json["status"], "notNeeded");
}

#[test]
fn test_borrow_reallocates() {
    let json = run_json(&["borrow", CBETH_MARKET, "50"]);
    assert_eq!(json["status"], "reallocated");
    assert_eq!(json["plan"]["supplyMarketId"], CBETH_MARKET);
    assert_eq!(json["plan"]["withdrawals"][0]["marketId"], RETH_MARKET);
}

#[test]
fn test_borrow_unavailable() {
    let json = run_json(&["borrow", CBETH_MARKET, "5000"]);
    assert_eq!(json["status"], "unavailable");
}

#[test]
fn test_borrow_table() {
    morpho_cmd_with_snapshot()
        .args(["borrow", CBETH_MARKET, "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Borrow 50.00 WETH"))
        .stdout(predicate::str::contains("Reallocation required"));
}
