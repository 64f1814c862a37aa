//! Test helper utilities for CLI integration tests.

use assert_cmd::Command;
use serde_json::Value;

/// wstETH/WETH: above its 50% target, needs liquidity.
pub const WSTETH_MARKET: &str = "0xc54d7acf14de29e0e5527cabd7a576506870346a78a11a6762e2cca66322ec41";
/// Idle WETH market.
pub const IDLE_MARKET: &str = "0x58e212060645d18eab6d9b2af3d56fbc906a92ff5667385f616f662c70372284";
/// rETH/WETH: below its 90% target, has excess liquidity.
pub const RETH_MARKET: &str = "0x4989652150a4000cfb029eeed5d0c12bb53241e635e273de8059dcc341274f7f";
/// cbETH/WETH: within its 90% target band.
pub const CBETH_MARKET: &str = "0x4949c5446606cf48fecd4dd51883fc70f8a68c95c8ed44e8fc380c2fa189c33f";

/// Create a CLI command without a snapshot (for validation tests).
pub fn morpho_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("morpho-realloc"));
    cmd.env_remove("MORPHO_SNAPSHOT")
        .env_remove("MORPHO_REALLOC_USD_THRESHOLD")
        .env_remove("MORPHO_REALLOC_SUPPLY_TARGET")
        .env_remove("RUST_LOG");
    cmd
}

/// Path of a fixture file.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}.json", env!("CARGO_MANIFEST_DIR"), name)
}

/// Create a CLI command pointing at the vault fixture.
pub fn morpho_cmd_with_snapshot() -> Command {
    let mut cmd = morpho_cmd();
    cmd.arg("--snapshot").arg(fixture_path("vault"));
    cmd
}

/// Run a command with `--format json` and parse its stdout.
pub fn run_json(args: &[&str]) -> Value {
    let output = morpho_cmd_with_snapshot()
        .args(["--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}
