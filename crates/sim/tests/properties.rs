//! Property-based tests for the reallocation engine.
//!
//! These tests use proptest to generate random market and vault states and
//! verify the engine's invariants hold.

use alloy_chains::NamedChain;
use alloy_primitives::{Address, U256};
use morpho_realloc_sim::{
    compute_rate_at_target, compute_utilization, seek_for_supply_reallocation,
    seek_for_withdraw_reallocation, FlowCaps, Limit, MarketChainData, MarketData, MarketParams,
    MarketState, MetaMorphoVault, VaultAsset, VaultPosition, INITIAL_RATE_AT_TARGET,
    MAX_RATE_AT_TARGET, MIN_RATE_AT_TARGET, WAD,
};
use morpho_realloc_strategy::Strategy as MarketStrategy;
use proptest::prelude::*;

fn tokens(amount: u64) -> U256 {
    U256::from(amount) * WAD
}

fn market_params(seed: u8) -> MarketParams {
    MarketParams {
        loan_token: Address::repeat_byte(0xAA),
        collateral_token: Address::repeat_byte(seed),
        oracle: Address::repeat_byte(seed.wrapping_add(1)),
        irm: Address::repeat_byte(0x11),
        lltv: U256::from(860_000_000_000_000_000u64),
    }
}

fn position(
    seed: u8,
    supply: u64,
    borrow: u64,
    vault_supply: u64,
    supply_cap: Limit,
    flow_caps: FlowCaps,
    strategy: MarketStrategy,
) -> VaultPosition {
    let params = market_params(seed);
    let state = MarketState::new(tokens(supply), tokens(borrow), 0, U256::ZERO);

    VaultPosition {
        supply_assets: tokens(vault_supply),
        supply_cap,
        flow_caps,
        market: MarketData {
            params,
            chain_data: MarketChainData::new(params.id(), state, INITIAL_RATE_AT_TARGET),
            strategy: Some(strategy),
        },
    }
}

fn empty_vault() -> MetaMorphoVault {
    let asset = VaultAsset::new(Address::repeat_byte(0xAA), "WETH", 18).with_price_usd(3_000.0);
    MetaMorphoVault::new(Address::repeat_byte(0xBE), NamedChain::Mainnet, asset)
}

// Strategy for generating market totals (supply, borrow <= supply), in tokens
fn market_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..10_000_000).prop_flat_map(|supply| (Just(supply), 0..=supply))
}

// Strategy for generating a supply cap as headroom above `supplied` tokens
fn cap_strategy(supplied: u64) -> impl Strategy<Value = Limit> {
    prop_oneof![
        Just(Limit::Unlimited),
        (0u64..2_000_000).prop_map(move |headroom| Limit::Finite(tokens(supplied + headroom))),
    ]
}

// Strategy for generating a source market: (supply, borrow, vault share of supply %, max_out)
fn source_strategy() -> impl Strategy<Value = (u64, u64, u64, u64)> {
    (market_strategy(), 0u64..=100, 0u64..100_000)
        .prop_map(|((supply, borrow), share, max_out)| (supply, borrow, share, max_out))
}

fn supply_vault(
    target_borrow: u64,
    target_cap: Limit,
    sources: &[(u64, u64, u64, u64)],
) -> MetaMorphoVault {
    let mut vault = empty_vault().with_position(position(
        0,
        target_borrow,
        target_borrow,
        target_borrow / 2,
        target_cap,
        FlowCaps::new(U256::MAX, U256::MAX),
        MarketStrategy::utilization(WAD / U256::from(2)),
    ));

    for (index, (supply, borrow, share, max_out)) in sources.iter().enumerate() {
        vault = vault.with_position(position(
            index as u8 + 1,
            *supply,
            *borrow,
            supply * share / 100,
            Limit::Unlimited,
            FlowCaps::new(U256::MAX, tokens(*max_out)),
            MarketStrategy::idle(),
        ));
    }
    vault
}

proptest! {
    #[test]
    fn fuzz_utilization_bounded((supply, borrow) in market_strategy()) {
        let utilization = compute_utilization(tokens(borrow), tokens(supply));
        prop_assert!(utilization <= WAD);
    }

    #[test]
    fn fuzz_rate_at_target_clamped(
        (supply, borrow) in market_strategy(),
        start in 0u64..200_000_000_000,
        elapsed in 0u64..100_000_000,
    ) {
        let state = MarketState::new(tokens(supply), tokens(borrow), 1_000, U256::ZERO);
        let rate = compute_rate_at_target(&state, U256::from(start), 1_000 + elapsed);

        prop_assert!(rate >= MIN_RATE_AT_TARGET, "rate {} below floor", rate);
        prop_assert!(rate <= MAX_RATE_AT_TARGET, "rate {} above ceiling", rate);
    }

    #[test]
    fn fuzz_accrual_idempotent(
        (supply, borrow) in market_strategy(),
        elapsed in 0u64..(10 * 365 * 86_400),
    ) {
        let state = MarketState::new(tokens(supply), tokens(borrow), 1_000, U256::ZERO);
        let market = MarketChainData::new(market_params(1).id(), state, INITIAL_RATE_AT_TARGET);

        let once = market.accrue_interest(1_000 + elapsed).unwrap();
        let twice = once.accrue_interest(1_000 + elapsed).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.state.total_borrow_assets <= once.state.total_supply_assets);
    }

    #[test]
    fn fuzz_supply_plan_conservation(
        (target_borrow, target_cap) in (1u64..1_000_000).prop_flat_map(|borrow| (Just(borrow), cap_strategy(borrow / 2))),
        sources in prop::collection::vec(source_strategy(), 1..6),
    ) {
        let vault = supply_vault(target_borrow, target_cap, &sources);
        let snapshot = vault.clone();

        if let Some(plan) = seek_for_supply_reallocation(market_params(0).id(), &vault, false) {
            let withdrawn = plan
                .withdrawals
                .iter()
                .fold(U256::ZERO, |total, withdrawal| total + withdrawal.amount);
            prop_assert_eq!(withdrawn, plan.amount_reallocated);

            // Target needs exactly its borrow at 50% utilization
            prop_assert!(plan.amount_reallocated <= tokens(target_borrow));

            prop_assert!(plan.withdrawals.windows(2).all(|pair| pair[0].market_id < pair[1].market_id));

            let next = vault.apply_reallocation(&plan).unwrap();
            prop_assert_eq!(next.total_assets(), vault.total_assets());
        }

        prop_assert_eq!(vault, snapshot);
    }

    #[test]
    fn fuzz_supply_plan_respects_caps(
        (target_borrow, target_cap) in (1u64..1_000_000).prop_flat_map(|borrow| (Just(borrow), cap_strategy(borrow / 2))),
        sources in prop::collection::vec(source_strategy(), 1..6),
    ) {
        let vault = supply_vault(target_borrow, target_cap, &sources);

        if let Some(plan) = seek_for_supply_reallocation(market_params(0).id(), &vault, false) {
            let target = &vault.positions[&market_params(0).id()];
            prop_assert!(Limit::Finite(plan.amount_reallocated) <= target.cap_headroom());

            for withdrawal in &plan.withdrawals {
                let source = &vault.positions[&withdrawal.market_id];
                prop_assert!(withdrawal.amount <= source.flow_caps.max_out);
                prop_assert!(withdrawal.amount <= source.supply_assets);
                prop_assert!(withdrawal.amount <= source.market.chain_data.state.liquidity());
            }
        }
    }

    #[test]
    fn fuzz_withdraw_plan_picks_largest_destination(
        focus_supply in 10u64..1_000_000,
        destinations in prop::collection::vec((0u64..1_000_000, cap_strategy(1_000)), 1..6),
    ) {
        let mut vault = empty_vault().with_position(position(
            0,
            focus_supply,
            0,
            focus_supply,
            Limit::Unlimited,
            FlowCaps::new(U256::MAX, U256::MAX),
            MarketStrategy::idle(),
        ));
        for (index, (max_in, cap)) in destinations.iter().enumerate() {
            vault = vault.with_position(position(
                index as u8 + 1,
                1_000_000,
                1_000_000,
                1_000,
                *cap,
                FlowCaps::new(tokens(*max_in), U256::MAX),
                MarketStrategy::utilization(WAD / U256::from(2)),
            ));
        }

        // Each destination absorbs at most its inflow cap and cap headroom
        let capacity = |position: &VaultPosition| position.cap_headroom().cap(position.flow_caps.max_in);

        if let Some(plan) = seek_for_withdraw_reallocation(market_params(0).id(), &vault, false) {
            let destination = &vault.positions[&plan.supply_market_id];
            prop_assert!(plan.amount_reallocated <= capacity(destination));
            prop_assert!(plan.amount_reallocated <= tokens(focus_supply));
            prop_assert_eq!(plan.withdrawals.len(), 1);

            let best = vault
                .positions
                .iter()
                .filter(|(id, _)| **id != market_params(0).id())
                .map(|(_, position)| capacity(position))
                .max()
                .unwrap_or_default();
            prop_assert_eq!(capacity(destination), best);

            vault.apply_reallocation(&plan).unwrap();
        }
    }
}
