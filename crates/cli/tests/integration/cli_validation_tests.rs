//! CLI argument validation tests.
//!
//! These tests verify that the CLI properly validates arguments and provides
//! helpful error messages.

use predicates::prelude::*;

use super::helpers::{morpho_cmd, morpho_cmd_with_snapshot, WSTETH_MARKET};

#[test]
fn test_help_output() {
    morpho_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("morpho-realloc"))
        .stdout(predicate::str::contains("market"))
        .stdout(predicate::str::contains("candidates"))
        .stdout(predicate::str::contains("seek"))
        .stdout(predicate::str::contains("series"))
        .stdout(predicate::str::contains("borrow"));
}

#[test]
fn test_seek_help_output() {
    morpho_cmd()
        .args(["seek", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--filter-idle"));
}

#[test]
fn test_invalid_command() {
    morpho_cmd()
        .arg("invalid_command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_snapshot() {
    morpho_cmd()
        .arg("market")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No snapshot given"));
}

#[test]
fn test_snapshot_not_found() {
    morpho_cmd()
        .args(["--snapshot", "/nonexistent/vault.json", "market"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_invalid_market_id() {
    morpho_cmd_with_snapshot()
        .args(["market", "0xinvalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn test_unknown_market() {
    morpho_cmd_with_snapshot()
        .args([
            "market",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_candidates_missing_market_id() {
    morpho_cmd_with_snapshot()
        .arg("candidates")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_borrow_invalid_amount() {
    morpho_cmd_with_snapshot()
        .args(["borrow", WSTETH_MARKET, "1.2.3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount format"));
}

#[test]
fn test_invalid_format() {
    morpho_cmd_with_snapshot()
        .args(["--format", "xml", "market"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
