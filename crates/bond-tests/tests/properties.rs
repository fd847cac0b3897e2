//! Randomized invariants of the escrow ledger and emission engine.
//!
//! Each property runs at least 256 cases with proptest shrinking.
//!
//! - Conservation: total supply equals the sum of account balances
//! - Monotonic decay: balances never grow without a deposit and reach zero
//!   at the unlock time
//! - Emissions stay between the lower-bound share and the gross budget
//! - A claim succeeds at most once per (account, epoch)
//! - Claims keep resolving when utilization is recorded every epoch

use proptest::prelude::*;

use bond_core::constants::{DEFAULT_SYSTEM_LOWER_BOUND, RATIO_SCALE, TOKEN};
use bond_core::error::{BondError, StateError, UtilizationError};
use bond_core::traits::UtilizationSource;
use bond_escrow::{EscrowLedger, LedgerParams};
use bond_tests::helpers::*;

#[derive(Debug, Clone)]
enum Op {
    Create { who: u8, amount: u64, weeks: u64 },
    Increase { who: u8, amount: u64 },
    Extend { who: u8, weeks: u64 },
    Withdraw { who: u8 },
    Checkpoint,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..=6, 1u64..=1_000_000, 2u64..=104).prop_map(|(who, amount, weeks)| Op::Create { who, amount, weeks }),
        (1u8..=6, 1u64..=1_000_000).prop_map(|(who, amount)| Op::Increase { who, amount }),
        (1u8..=6, 1u64..=104).prop_map(|(who, weeks)| Op::Extend { who, weeks }),
        (1u8..=6).prop_map(|who| Op::Withdraw { who }),
        Just(Op::Checkpoint),
    ]
}

/// Apply `ops` one every `gap` seconds, ignoring rejected operations.
fn run(ops: &[(Op, u64)]) -> (EscrowLedger, Vec<u64>) {
    let mut ledger = EscrowLedger::new(stamp(START), LedgerParams::default());
    let mut now = START;
    let mut times = Vec::new();
    for (op, gap) in ops {
        now += gap;
        let at = stamp(now);
        let _ = match *op {
            Op::Create { who, amount, weeks } => ledger
                .create_lock(&account(who), u128::from(amount) * TOKEN, now + weeks * WEEK, at)
                .map(|_| ()),
            Op::Increase { who, amount } => ledger
                .increase_amount(&account(who), u128::from(amount) * TOKEN, at)
                .map(|_| ()),
            Op::Extend { who, weeks } => ledger
                .increase_unlock_time(&account(who), ledger.locked_end(&account(who)) + weeks * WEEK, at)
                .map(|_| ()),
            Op::Withdraw { who } => ledger.withdraw(&account(who), at).map(|_| ()),
            Op::Checkpoint => ledger.checkpoint(at),
        };
        times.push(now);
    }
    (ledger, times)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn conservation_at_every_operation_time(
        ops in prop::collection::vec((op(), 1u64..=30 * 86_400), 1..40),
        tail in 0u64..=200 * WEEK,
    ) {
        let (ledger, mut times) = run(&ops);
        let last = *times.last().unwrap_or(&START);
        times.push(last + tail);
        for t in times {
            let sum: u128 = (1u8..=6).map(|i| ledger.balance_of_at(&account(i), t)).sum();
            prop_assert_eq!(ledger.total_supply_at(t), sum, "t = {}", t);
        }
    }

    #[test]
    fn balance_decays_monotonically(
        amount in 1u64..=10_000_000,
        weeks in 3u64..=104,
        offset in 0u64..WEEK,
        samples in prop::collection::vec(0u64..=110 * WEEK, 2..30),
    ) {
        let now = START + offset;
        let mut ledger = EscrowLedger::new(stamp(START), LedgerParams::default());
        let lock = ledger
            .create_lock(&account(1), u128::from(amount) * TOKEN, now + weeks * WEEK, stamp(now))
            .unwrap();

        let mut ts: Vec<u64> = samples.into_iter().map(|s| now + s).collect();
        ts.sort_unstable();
        let mut previous = u128::MAX;
        for t in ts {
            let b = ledger.balance_of_at(&account(1), t);
            prop_assert!(b <= previous);
            if t >= lock.end {
                prop_assert_eq!(b, 0);
            }
            previous = b;
        }
    }

    #[test]
    fn emissions_bounded_by_lower_bound_and_budget(
        deltas in prop::collection::vec(-1_000i128..=1_000_000, 1..8),
        epoch in 2u64..8,
    ) {
        let mut w = world();
        w.engine.create_lock(&account(1), 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();
        for (i, d) in deltas.iter().enumerate() {
            let e = (i as u64).min(epoch);
            w.utilization.record_utilization(&account(1), e, *d * TOKEN as i128).unwrap();
        }
        let now = epoch_ts(epoch, 0);
        let p = w.utilization.system_active_epochs().unwrap();
        let exhausted = !p.never_active() && [p.last, p.previous, p.previous_previous].iter().all(|&x| x >= epoch);
        match w.engine.emissions_for_epoch(epoch, now) {
            Ok(emissions) => {
                prop_assert!(!exhausted);
                prop_assert!(emissions <= BUDGET);
                prop_assert!(emissions >= BUDGET / u128::from(RATIO_SCALE) * u128::from(DEFAULT_SYSTEM_LOWER_BOUND));
            }
            Err(e) => {
                prop_assert!(exhausted, "{e}");
                prop_assert_eq!(e, BondError::Utilization(UtilizationError::Untrackable { epoch }));
            }
        }
    }

    #[test]
    fn claims_keep_working_with_utilization_every_epoch(
        deltas in prop::collection::vec(1i128..=2_000_000, 4..10),
        amount in 1u64..=1_000_000,
    ) {
        let mut w = world();
        let alice = account(1);
        w.engine.create_lock(&alice, u128::from(amount) * TOKEN, max_unlock(START), stamp(START)).unwrap();
        for (i, d) in deltas.iter().enumerate() {
            let epoch = i as u64 + 1;
            w.utilization.record_utilization(&alice, epoch, *d * TOKEN as i128).unwrap();
            let receipt = w.engine.claim_rewards(&alice, &alice, epoch_ts(epoch, 30));
            prop_assert!(receipt.is_ok(), "epoch {}: {:?}", epoch, receipt);
            let receipt = receipt.unwrap();
            prop_assert_eq!(receipt.epoch, epoch - 1);
            prop_assert!(receipt.amount > 0 && receipt.amount <= BUDGET);
        }
    }

    #[test]
    fn claim_is_idempotent(
        epochs in prop::collection::btree_set(1u64..12, 1..6),
        amount in 1u64..=1_000_000,
    ) {
        let mut w = world();
        let alice = account(1);
        w.engine.create_lock(&alice, u128::from(amount) * TOKEN, max_unlock(START), stamp(START)).unwrap();
        let mut paid = 0u128;
        for epoch in epochs {
            let now = epoch_ts(epoch, 30);
            let receipt = w.engine.claim_rewards(&alice, &alice, now).unwrap();
            paid += receipt.amount;
            prop_assert_eq!(
                w.engine.claim_rewards(&alice, &alice, now + 1),
                Err(BondError::State(StateError::AlreadyClaimed { epoch: epoch - 1 }))
            );
        }
        prop_assert_eq!(w.sink.balance_of(&alice), paid);
    }
}
