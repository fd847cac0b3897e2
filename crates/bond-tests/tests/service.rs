//! End-to-end tests through the service layer.
//!
//! Each test loads a configuration from a temporary TOML file, drives the
//! service with a manual clock and observes the broadcast notifications.

use std::io::Write;
use std::sync::Arc;

use bond_core::access::Role;
use bond_core::constants::TOKEN;
use bond_core::error::{BondError, StateError};
use bond_core::events::{BondingEvent, BoundKind};
use bond_core::traits::MemoryRewardSink;
use bond_core::types::Address;
use bond_emission::UtilizationLedger;
use bond_service::{BondingService, ManualClock, ServiceConfig};
use bond_tests::helpers::*;

const ADMIN: &str = "0xadadadadadadadadadadadadadadadadadadadad";

fn load_config(extra: &str) -> (ServiceConfig, tempfile::NamedTempFile) {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "admin = \"{ADMIN}\"\nepoch_start = {START}\nepoch_length_secs = {EPOCH}\n{extra}").unwrap();
    let config = ServiceConfig::load_with_env(Some(file.path()), Some(Default::default())).unwrap();
    (config, file)
}

struct Node {
    service: BondingService,
    clock: Arc<ManualClock>,
    utilization: Arc<UtilizationLedger>,
    sink: Arc<MemoryRewardSink>,
}

fn node(extra: &str) -> Node {
    let (config, _file) = load_config(extra);
    let clock = Arc::new(ManualClock::new(stamp(START)));
    let utilization = Arc::new(UtilizationLedger::new());
    let sink = Arc::new(MemoryRewardSink::new());
    let service =
        BondingService::from_config(&config, clock.clone(), utilization.clone(), sink.clone()).unwrap();
    Node { service, clock, utilization, sink }
}

#[test]
fn system_clock_from_config_drives_service() {
    let (config, _file) = load_config("block_time_secs = 6");
    let clock = Arc::new(config.system_clock());
    assert_eq!(clock.block_time_secs(), 6);
    let service = BondingService::from_config(
        &config,
        clock.clone(),
        Arc::new(UtilizationLedger::new()),
        Arc::new(MemoryRewardSink::new()),
    )
    .unwrap();

    let now = service.now();
    assert!(now.timestamp >= clock.genesis().timestamp);
    service.create_lock(&account(1), 10 * TOKEN, max_unlock(now.timestamp)).unwrap();
    assert!(service.balance_of(&account(1)) > 0);
    assert!(service.total_supply() > 0);
}

#[test]
fn logging_initialises_once_from_config() {
    let (config, _file) = load_config("log_level = \"debug\"\nlog_format = \"json\"");
    assert!(config.init_logging().is_ok());
    assert!(config.init_logging().is_err());
}

#[test]
fn config_admin_is_fixture_admin() {
    let parsed: Address = ADMIN.parse().unwrap();
    assert_eq!(parsed, admin());
}

#[tokio::test]
async fn lifecycle_emits_notifications() {
    let n = node("");
    let mut rx = n.service.subscribe();
    let alice = account(1);

    n.service.create_lock(&alice, 1_000 * TOKEN, max_unlock(START)).unwrap();
    n.clock.set(stamp(epoch_ts(1, 60)));
    let receipt = n.service.claim_rewards(&alice, &account(2)).unwrap();
    assert_eq!(receipt.amount, 1_000_000 * TOKEN);
    assert_eq!(n.sink.balance_of(&account(2)), receipt.amount);

    match rx.recv().await.unwrap() {
        BondingEvent::LockCreated { account, amount, .. } => {
            assert_eq!(account, alice);
            assert_eq!(amount, 1_000 * TOKEN);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        BondingEvent::RewardsClaimed { account: alice, recipient: account(2), epoch: 0, amount: receipt.amount }
    );
}

#[test]
fn emission_schedule_comes_from_config() {
    let n = node("emissions_per_epoch_tokens = 500\nreduction_cliff = 1\nreduction_bps = 5000");
    n.service.create_lock(&account(1), TOKEN, max_unlock(START)).unwrap();
    n.clock.set(stamp(epoch_ts(1, 0)));
    assert_eq!(n.service.emissions_for_epoch(0).unwrap(), 500 * TOKEN);
    // Epoch 1 is a bootstrap epoch: full ratio, budget halved once.
    assert_eq!(n.service.emissions_for_epoch(1).unwrap(), 250 * TOKEN);
}

#[test]
fn roles_and_bounds_through_service() {
    let n = node("");
    let admin = admin();
    let mut rx = n.service.subscribe();
    let controller = account(7);

    assert!(matches!(
        n.service.update_system_lower_bound(&controller, 4_500),
        Err(BondError::State(StateError::Unauthorized { .. }))
    ));
    assert!(n.service.grant_role(&admin, Role::Controller, controller).unwrap());
    n.service.update_system_lower_bound(&controller, 4_500).unwrap();
    assert_eq!(n.service.read(|e, _| e.epoch_config().system_lower_bound()), 4_500);

    assert_eq!(rx.try_recv().unwrap(), BondingEvent::RoleGranted { role: Role::Controller, account: controller });
    assert_eq!(rx.try_recv().unwrap(), BondingEvent::LowerBoundUpdated { kind: BoundKind::System, value: 4_500 });
}

#[test]
fn block_queries_through_service() {
    let n = node("");
    let alice = account(1);
    n.service.create_lock(&alice, 100 * TOKEN, START + 10 * WEEK).unwrap();
    n.clock.set(stamp(START + 2 * WEEK));
    n.service.checkpoint().unwrap();
    n.clock.set(stamp(START + 3 * WEEK));

    // Block timestamps are interpolated, so allow a minute of drift.
    let block = stamp(START + WEEK).block;
    let by_block = n.service.balance_of_at_block(&alice, block).unwrap();
    let upper = n.service.read(|e, _| e.ledger().balance_of_at(&alice, START + WEEK - 60));
    let lower = n.service.read(|e, _| e.ledger().balance_of_at(&alice, START + WEEK + 60));
    assert!(lower <= by_block && by_block <= upper);
    assert_eq!(n.service.total_supply_at_block(block).unwrap(), by_block);
    assert!(n.service.balance_of_at_block(&alice, stamp(START + 4 * WEEK).block).is_err());
}

#[test]
fn utilization_feeds_claims_end_to_end() {
    let n = node("");
    let alice = account(1);
    n.service.create_lock(&alice, 50 * TOKEN, max_unlock(START)).unwrap();

    n.clock.set(stamp(epoch_ts(2, 0)));
    let r1 = n.service.claim_rewards(&alice, &alice).unwrap();
    n.utilization.record_utilization(&alice, 2, r1.amount as i128 / 2).unwrap();

    n.clock.set(stamp(epoch_ts(3, 0)));
    let info = n.service.user_info(&alice).unwrap();
    assert_eq!(info.personal_utilization, r1.amount as i128 / 2);
    assert!(info.eligible_rewards < info.max_rewards);
    let r2 = n.service.claim_rewards(&alice, &alice).unwrap();
    assert_eq!(r2.amount, info.eligible_rewards);
    // Half of the target: halfway between the default bounds and full.
    assert_eq!(r2.personal_ratio, 3_000 + 7_000 / 2);
    assert_eq!(n.service.user_current_claimable_rewards(&alice).unwrap(), 0);
}
