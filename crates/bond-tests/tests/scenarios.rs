//! Reference scenarios for the emission engine and escrow ledger.
//!
//! - A: ratio normalization against a claimed target
//! - B: a sole locker earns the whole epoch emission
//! - C: an epoch left unclaimed is forfeited
//! - D: baseline resolution through the three active-epoch pointers
//!
//! Plus claim idempotency, pause enforcement and the lock lifecycle.

use bond_core::constants::{RATIO_SCALE, TOKEN};
use bond_core::error::{BondError, InputError, StateError, UtilizationError};
use bond_core::traits::UtilizationSource;
use bond_core::types::ActiveEpochPointers;
use bond_emission::ratio::normalize_ratio;
use bond_emission::resolve_baseline;
use bond_tests::helpers::*;

// ---------------------------------------------------------------------------
// Scenario A
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_ratio() {
    assert_eq!(normalize_ratio(250, 1_000, 5_000, true), 6_250);
}

#[test]
fn scenario_a_through_engine() {
    let mut w = world();
    w.engine.create_lock(&account(1), 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();
    // Claimed total of epoch 1 becomes the target of epoch 2.
    let r = w.engine.claim_rewards(&account(1), &account(1), epoch_ts(2, 5)).unwrap();
    assert_eq!(r.amount, BUDGET);

    w.utilization.record_utilization(&account(1), 2, (BUDGET / 4) as i128).unwrap();
    assert_eq!(w.engine.system_utilization_ratio(2, epoch_ts(2, 10)).unwrap(), 6_250);
}

// ---------------------------------------------------------------------------
// Scenario B
// ---------------------------------------------------------------------------

#[test]
fn scenario_b_sole_locker_takes_whole_emission() {
    let mut w = world();
    w.engine.create_lock(&account(1), 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();

    let now = epoch_ts(1, 1);
    let emission = w.engine.emissions_for_epoch(0, now).unwrap();
    assert_eq!(emission, BUDGET);
    assert_eq!(w.engine.eligible_reward(&account(1), 0, now).unwrap(), emission);
}

#[test]
fn scenario_b_late_locker_shares_by_balance() {
    let mut w = world();
    w.engine.create_lock(&account(1), 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();
    w.engine
        .create_lock(&account(2), 1_000 * TOKEN, max_unlock(START), stamp(START + WEEK))
        .unwrap();

    let now = epoch_ts(1, 1);
    let a = w.engine.eligible_reward(&account(1), 0, now).unwrap();
    let b = w.engine.eligible_reward(&account(2), 0, now).unwrap();
    assert!(a > 0 && b > 0);
    assert!(a + b <= BUDGET);
    assert!(BUDGET - (a + b) < 10, "rounding dust only: {}", BUDGET - (a + b));
    // Same lock end, same slope: the same balance at the epoch end.
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Scenario C
// ---------------------------------------------------------------------------

#[test]
fn scenario_c_unclaimed_epoch_is_forfeited() {
    let mut w = world();
    let alice = account(1);
    w.engine.create_lock(&alice, 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();

    // Epoch 1's reward claimed during epoch 2.
    let r1 = w.engine.claim_rewards(&alice, &alice, epoch_ts(2, 60)).unwrap();
    assert_eq!(r1.epoch, 1);

    // Epoch 2 passes. At epoch 4 only epoch 3 is claimable.
    let now = epoch_ts(4, 60);
    let claimable = w.engine.user_current_claimable_rewards(&alice, now).unwrap();
    let r3 = w.engine.claim_rewards(&alice, &alice, now).unwrap();
    assert_eq!(r3.epoch, 3);
    assert_eq!(r3.amount, claimable);

    assert!(!w.engine.has_claimed(&alice, 2));
    assert_eq!(w.engine.user_claimed(&alice, 2), 0);
    assert_eq!(w.engine.total_claimed(2), 0);
    let forfeited = w.engine.emissions_for_epoch(2, now).unwrap();
    assert!(forfeited > 0);
    assert_eq!(w.engine.unclaimed_rewards_for_epoch(2, now).unwrap(), forfeited);

    // Nothing further to claim for epoch 3 and no way to reach epoch 2.
    assert_eq!(
        w.engine.claim_rewards(&alice, &alice, now + 1),
        Err(BondError::State(StateError::AlreadyClaimed { epoch: 3 }))
    );
    assert_eq!(w.sink.balance_of(&alice), r1.amount + r3.amount);
}

// ---------------------------------------------------------------------------
// Scenario D
// ---------------------------------------------------------------------------

#[test]
fn scenario_d_baseline_resolution() {
    let w = world();
    let alice = account(1);
    w.utilization.record_utilization(&alice, 1, 100).unwrap();
    w.utilization.record_utilization(&alice, 4, 50).unwrap();

    let pointers = w.utilization.personal_active_epochs(&alice).unwrap();
    assert_eq!(pointers, ActiveEpochPointers::new(4, 1, 0));

    let lookup = |e| w.utilization.personal_utilization(&alice, e);
    assert_eq!(resolve_baseline(&pointers, 6, lookup).unwrap(), 150);
    assert_eq!(resolve_baseline(&pointers, 3, lookup).unwrap(), 100);

    // Never active.
    let never = w.utilization.personal_active_epochs(&account(9)).unwrap();
    assert_eq!(resolve_baseline(&never, 3, |e| w.utilization.personal_utilization(&account(9), e)).unwrap(), 0);

    // All three pointers at or after the query.
    let bob = account(2);
    for epoch in [5, 6, 7] {
        w.utilization.record_utilization(&bob, epoch, 1).unwrap();
    }
    let pointers = w.utilization.personal_active_epochs(&bob).unwrap();
    assert_eq!(
        resolve_baseline(&pointers, 5, |e| w.utilization.personal_utilization(&bob, e)),
        Err(BondError::Utilization(UtilizationError::Untrackable { epoch: 5 }))
    );
}

#[test]
fn scenario_d_untrackable_blocks_claim() {
    let mut w = world();
    let alice = account(1);
    w.engine.create_lock(&alice, 1_000 * TOKEN, max_unlock(START), stamp(START)).unwrap();
    for epoch in [5, 6, 7] {
        w.utilization.record_utilization(&account(2), epoch, 1).unwrap();
    }
    // Claiming epoch 3 needs the system baseline of epoch 3.
    let err = w.engine.claim_rewards(&alice, &alice, epoch_ts(4, 0)).unwrap_err();
    assert_eq!(err, BondError::Utilization(UtilizationError::Untrackable { epoch: 3 }));
    assert!(!w.engine.has_claimed(&alice, 3));
    assert_eq!(w.sink.total_paid(), 0);
}

// ---------------------------------------------------------------------------
// Claims and pause
// ---------------------------------------------------------------------------

#[test]
fn claim_succeeds_at_most_once_per_epoch() {
    let mut w = world();
    let alice = account(1);
    w.engine.create_lock(&alice, 10 * TOKEN, max_unlock(START), stamp(START)).unwrap();
    for epoch in 1..6 {
        let now = epoch_ts(epoch, 100);
        let first = w.engine.claim_rewards(&alice, &alice, now).unwrap();
        assert_eq!(first.epoch, epoch - 1);
        for retry in 1..3 {
            assert_eq!(
                w.engine.claim_rewards(&alice, &account(3), now + retry),
                Err(BondError::State(StateError::AlreadyClaimed { epoch: epoch - 1 }))
            );
        }
    }
    assert_eq!(w.sink.balance_of(&account(3)), 0);
}

#[test]
fn full_personal_ratio_with_enough_utilization() {
    let mut w = world();
    let alice = account(1);
    w.engine.create_lock(&alice, 10 * TOKEN, max_unlock(START), stamp(START)).unwrap();
    let r1 = w.engine.claim_rewards(&alice, &alice, epoch_ts(2, 0)).unwrap();

    w.utilization.record_utilization(&alice, 2, r1.amount as i128).unwrap();
    let r2 = w.engine.claim_rewards(&alice, &alice, epoch_ts(3, 0)).unwrap();
    assert_eq!(r2.personal_ratio, RATIO_SCALE);
    assert_eq!(r2.amount, r2.raw);
}

#[test]
fn paused_engine_rejects_mutations_but_answers_queries() {
    let mut w = world();
    let alice = account(1);
    w.engine.create_lock(&alice, TOKEN, max_unlock(START), stamp(START)).unwrap();
    w.engine.pause(&admin()).unwrap();

    let now = epoch_ts(1, 0);
    assert_eq!(w.engine.claim_rewards(&alice, &alice, now), Err(BondError::State(StateError::Paused)));
    assert_eq!(w.engine.increase_amount(&alice, TOKEN, stamp(now)), Err(BondError::State(StateError::Paused)));
    assert_eq!(w.engine.eligible_reward(&alice, 0, now).unwrap(), BUDGET);

    w.engine.unpause(&admin()).unwrap();
    assert!(w.engine.claim_rewards(&alice, &alice, now).is_ok());
}

#[test]
fn first_epoch_and_future_epoch_guards() {
    let mut w = world();
    assert_eq!(
        w.engine.claim_rewards(&account(1), &account(1), epoch_ts(0, 100)),
        Err(BondError::State(StateError::FirstEpochClaim))
    );
    assert_eq!(
        w.engine.eligible_reward(&account(1), 3, epoch_ts(2, 0)),
        Err(BondError::Input(InputError::FutureEpoch { epoch: 3, current: 2 }))
    );
}

// ---------------------------------------------------------------------------
// Lock lifecycle
// ---------------------------------------------------------------------------

#[test]
fn lock_lifecycle_and_expired_rewards() {
    let mut w = world();
    let alice = account(1);
    let end = START + 4 * WEEK;
    w.engine.create_lock(&alice, 100 * TOKEN, end, stamp(START)).unwrap();
    w.engine.increase_unlock_time(&alice, START + 6 * WEEK, stamp(START + WEEK)).unwrap();
    assert_eq!(
        w.engine.withdraw(&alice, stamp(START + 5 * WEEK)),
        Err(BondError::State(StateError::LockNotExpired { end: START + 6 * WEEK }))
    );
    assert_eq!(w.engine.withdraw(&alice, stamp(START + 6 * WEEK)).unwrap(), 100 * TOKEN);
    assert_eq!(w.engine.ledger().total_supply_at(START + 6 * WEEK), 0);

    // Epoch 3 started after the lock ended: nothing to claim.
    assert_eq!(
        w.engine.claim_rewards(&alice, &alice, epoch_ts(4, 0)),
        Err(BondError::State(StateError::NothingToClaim { epoch: 3 }))
    );
}

#[test]
fn long_idle_gap_keeps_supply_consistent() {
    let mut w = world();
    w.engine.create_lock(&account(1), 500 * TOKEN, START + 20 * WEEK, stamp(START)).unwrap();
    w.engine.create_lock(&account(2), 700 * TOKEN, START + 40 * WEEK, stamp(START + 60)).unwrap();

    // No activity for 60 weeks; both locks end during the gap.
    let later = START + 60 * WEEK + 123;
    assert_eq!(w.engine.ledger().total_supply_at(later), 0);
    w.engine.create_lock(&account(3), 300 * TOKEN, max_unlock(later), stamp(later)).unwrap();
    let supply = w.engine.ledger().total_supply_at(later);
    assert_eq!(supply, w.engine.ledger().balance_of_at(&account(3), later));
    assert!(supply > 0);
}
