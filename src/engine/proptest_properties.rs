//! Property-based tests for the engine's numeric and scheduling invariants.
//!
//! 1. **Reservation accounting**: `liquidity >= reserved` for every
//!    provider and the aggregate reserved total matches the providers.
//! 2. **Queue cleanup**: cleaning twice is a no-op and the watermark never
//!    passes a live provider.
//! 3. **Virtual pool**: buys never raise the tokens-per-satoshi quote
//!    beyond rounding, the token reserve stays at least one and sells never
//!    lower it.
//! 4. **Dynamic fee**: bounded by the configured range and monotone in
//!    trade size.

#![allow(clippy::panic)]

use primitive_types::U256;
use proptest::prelude::*;

use super::liquidity_queue::tests::{account, created, token};
use super::{LiquidityQueue, ProviderQueue, VirtualPool};
use crate::config::DynamicFeeConfig;
use crate::context::{CallEffects, CallEnv};
use crate::domain::{Address, ProviderId, Quote, QueueKind, QUOTE_SCALE};
use crate::fee::DynamicFee;
use crate::repository::Repository;
use crate::storage::MemoryStore;
use crate::traits::TransactionOutput;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn receiver(n: u8) -> String {
    format!("bc1qprovider{n}")
}

fn assert_accounting(queue: &LiquidityQueue, repo: &mut Repository<'_>, owners: &[u8]) -> Result<(), TestCaseError> {
    let mut reserved_total = 0u128;
    let mut owners: Vec<u8> = owners.to_vec();
    owners.push(1);
    for n in owners {
        let Ok(provider) = repo.provider_for_owner(&account(n)) else {
            panic!("expected Ok");
        };
        prop_assert!(provider.liquidity() >= provider.reserved());
        reserved_total += provider.reserved();
    }
    prop_assert_eq!(reserved_total, queue.reserved_liquidity());
    Ok(())
}

// ---------------------------------------------------------------------------
// Property 1: reservation accounting
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_reserved_never_exceeds_liquidity(
        listings in proptest::collection::vec(1_000_000u128..=5_000_000u128, 1..5),
        wants in proptest::collection::vec(10_000u64..=80_000u64, 1..4),
        paid_percent in 0u64..=150u64,
    ) {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = created(&mut repo, 10);
        let mut effects = CallEffects::new();
        let owners: Vec<u8> = (0..listings.len()).map(|i| 10 + i as u8).collect();
        for (n, amount) in owners.iter().zip(&listings) {
            let Ok(_) = queue.list_liquidity(
                &mut repo, &account(*n), &receiver(*n), *amount, false, &mut effects,
            ) else {
                panic!("expected Ok");
            };
        }

        for (i, sats) in wants.iter().enumerate() {
            let buyer = account(100 + i as u8);
            if queue.reserve(&mut repo, &buyer, *sats, 0, false, &mut effects).is_err() {
                continue;
            }
            assert_accounting(&queue, &mut repo, &owners)?;

            let Ok(reservation) = repo.reservation_for_buyer(&buyer) else {
                panic!("expected Ok");
            };
            let reservation = reservation.clone();
            let pay = sats * paid_percent / 100;
            let outputs = owners
                .iter()
                .map(|n| TransactionOutput::new(receiver(*n), pay))
                .chain([TransactionOutput::new("bc1qinitial", pay)])
                .collect();
            let env = CallEnv::new(buyer, buyer, 11, outputs);
            let _ = queue.execute_trade(&mut repo, &env, &reservation, &mut effects);
            assert_accounting(&queue, &mut repo, &owners)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: queue cleanup
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cleanup_is_idempotent_and_stops_at_live(
        live in proptest::collection::vec(any::<bool>(), 0..24),
    ) {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let Ok(mut queue) = ProviderQueue::load(&repo, &token(), QueueKind::Normal) else {
            panic!("expected Ok");
        };
        for (i, alive) in live.iter().enumerate() {
            let owner = Address::from_bytes([i as u8 + 1; 32]);
            let Ok(provider) = repo.provider_for_owner(&owner) else {
                panic!("expected Ok");
            };
            if *alive {
                provider.activate(false);
            }
            let id = provider.id();
            let Ok(_) = queue.push(&mut repo, id) else {
                panic!("expected Ok");
            };
        }

        let is_live = |repo: &mut Repository<'_>, id: ProviderId| -> crate::error::Result<bool> {
            Ok(repo.provider(id)?.is_active())
        };
        let Ok(()) = queue.clean_up(&mut repo, is_live) else {
            panic!("expected Ok");
        };
        let first = queue.starting_index();
        let Ok(()) = queue.clean_up(&mut repo, is_live) else {
            panic!("expected Ok");
        };
        prop_assert_eq!(first, queue.starting_index());

        let first_live = live.iter().position(|alive| *alive).map_or(live.len(), |i| i) as u64;
        prop_assert_eq!(first, first_live);
    }
}

// ---------------------------------------------------------------------------
// Property 3: virtual pool
// ---------------------------------------------------------------------------

fn seeded(tokens: u128, floor: u128) -> VirtualPool {
    let Ok(pool) = VirtualPool::seed(Quote::from_scaled(U256::from(floor)), tokens, 1) else {
        panic!("expected Ok");
    };
    pool
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_buys_raise_price(
        tokens in 1_000_000_000u128..=1_000_000_000_000u128,
        floor_units in 1u128..=10_000u128,
        bought_percent in 0u128..=120u128,
        sats in 0u64..=10_000_000u64,
    ) {
        let mut pool = seeded(tokens, floor_units * u128::from(QUOTE_SCALE));
        let Ok(before) = pool.quote() else {
            panic!("expected Ok");
        };
        let Ok(()) = pool.record_buy(tokens * bought_percent / 100, sats) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.update_if_needed(2) else {
            panic!("expected Ok");
        };
        prop_assert!(pool.virtual_tokens() >= U256::one());
        let Ok(after) = pool.quote() else {
            panic!("expected Ok");
        };
        // B' is floored, so allow one part in 10_000 of rounding
        let tolerance = before.scaled() / U256::from(10_000u64) + U256::one();
        prop_assert!(
            after.scaled() <= before.scaled() + tolerance,
            "quote rose after a buy: {} > {}", after, before
        );
    }

    #[test]
    fn prop_sells_lower_price(
        tokens in 1_000_000u128..=1_000_000_000_000u128,
        floor_units in 1u128..=10_000u128,
        sold in 1u128..=1_000_000_000u128,
    ) {
        let mut pool = seeded(tokens, floor_units * u128::from(QUOTE_SCALE));
        let Ok(before) = pool.quote() else {
            panic!("expected Ok");
        };
        let Ok(()) = pool.record_sell(sold) else {
            panic!("expected Ok");
        };
        let Ok(_) = pool.update_if_needed(2) else {
            panic!("expected Ok");
        };
        let Ok(after) = pool.quote() else {
            panic!("expected Ok");
        };
        prop_assert!(after >= before, "quote fell after a sell: {} < {}", after, before);
    }
}

// ---------------------------------------------------------------------------
// Property 4: dynamic fee
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_fee_bounded_and_monotone(
        small in 1u64..=1_000_000_000u64,
        extra in 0u64..=1_000_000_000u64,
        volatility in 0u64..=50_000u64,
    ) {
        let config = DynamicFeeConfig::default();
        let fee = DynamicFee::new(config);
        let low = fee.fee_bp(small, volatility);
        let high = fee.fee_bp(small + extra, volatility);
        prop_assert!(low >= config.min_fee() && low <= config.max_fee());
        prop_assert!(high >= low);
    }
}
