//! Single-writer service around the bonding engine.
//!
//! Every mutation holds the engine's write lock for its whole duration, so
//! readers never observe a half-applied checkpoint. Queries share the read
//! lock. Events queued by a mutation are drained under the same write lock
//! and fanned out after it is released.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use bond_core::access::Role;
use bond_core::error::BondResult;
use bond_core::events::BondingEvent;
use bond_core::traits::{EmissionSource, RewardSink, UtilizationSource};
use bond_core::types::{Address, BlockStamp, Lock};
use bond_emission::{BondingEngine, ClaimReceipt, Collaborators, UserApy, UserInfo};

use crate::clock::Clock;
use crate::config::ServiceConfig;

pub struct BondingService {
    engine: RwLock<BondingEngine>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BondingEvent>,
}

impl fmt::Debug for BondingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BondingService")
            .field("engine", &*self.engine.read())
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl BondingService {
    pub fn new(engine: BondingEngine, clock: Arc<dyn Clock>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { engine: RwLock::new(engine), clock, events }
    }

    /// Build an engine from `config` whose ledger starts at the clock's
    /// current stamp. The emission source is the configured schedule.
    pub fn from_config(
        config: &ServiceConfig,
        clock: Arc<dyn Clock>,
        utilization: Arc<dyn UtilizationSource>,
        rewards: Arc<dyn RewardSink>,
    ) -> BondResult<Self> {
        let admin = config.admin_address()?;
        let epochs = config.epoch_config()?;
        let emission = Arc::new(config.emission_schedule()?);
        let genesis = clock.now();
        let engine = BondingEngine::new(
            admin,
            genesis,
            config.ledger_params(),
            epochs,
            Collaborators { emission, utilization, rewards },
        );
        info!(%admin, genesis = genesis.timestamp, epoch_length = epochs.epoch_length(), "bonding service ready");
        Ok(Self::new(engine, clock, config.event_capacity))
    }

    /// Receiver of every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BondingEvent> {
        self.events.subscribe()
    }

    pub fn now(&self) -> BlockStamp {
        self.clock.now()
    }

    /// Run a read-only closure against the engine.
    pub fn read<T>(&self, f: impl FnOnce(&BondingEngine, BlockStamp) -> T) -> T {
        let now = self.clock.now();
        let engine = self.engine.read();
        f(&*engine, now)
    }

    // --- locks ---

    pub fn create_lock(&self, account: &Address, amount: u128, unlock_time: u64) -> BondResult<Lock> {
        self.mutate("create_lock", |e, now| e.create_lock(account, amount, unlock_time, now))
    }

    pub fn increase_amount(&self, account: &Address, amount: u128) -> BondResult<Lock> {
        self.mutate("increase_amount", |e, now| e.increase_amount(account, amount, now))
    }

    pub fn deposit_for(&self, funder: &Address, account: &Address, amount: u128) -> BondResult<Lock> {
        self.mutate("deposit_for", |e, now| e.deposit_for(funder, account, amount, now))
    }

    pub fn increase_unlock_time(&self, account: &Address, unlock_time: u64) -> BondResult<Lock> {
        self.mutate("increase_unlock_time", |e, now| e.increase_unlock_time(account, unlock_time, now))
    }

    pub fn withdraw(&self, account: &Address) -> BondResult<u128> {
        self.mutate("withdraw", |e, now| e.withdraw(account, now))
    }

    pub fn checkpoint(&self) -> BondResult<()> {
        self.mutate("checkpoint", |e, now| e.checkpoint(now))
    }

    // --- rewards ---

    pub fn claim_rewards(&self, account: &Address, recipient: &Address) -> BondResult<ClaimReceipt> {
        self.mutate("claim_rewards", |e, now| e.claim_rewards(account, recipient, now.timestamp))
    }

    pub fn user_current_claimable_rewards(&self, account: &Address) -> BondResult<u128> {
        self.read(|e, now| e.user_current_claimable_rewards(account, now.timestamp))
    }

    pub fn eligible_reward(&self, account: &Address, epoch: u64) -> BondResult<u128> {
        self.read(|e, now| e.eligible_reward(account, epoch, now.timestamp))
    }

    pub fn emissions_for_epoch(&self, epoch: u64) -> BondResult<u128> {
        self.read(|e, now| e.emissions_for_epoch(epoch, now.timestamp))
    }

    pub fn unclaimed_rewards_for_epoch(&self, epoch: u64) -> BondResult<u128> {
        self.read(|e, now| e.unclaimed_rewards_for_epoch(epoch, now.timestamp))
    }

    pub fn user_info(&self, account: &Address) -> BondResult<UserInfo> {
        self.read(|e, now| e.user_info(account, now))
    }

    pub fn user_apy(&self, account: &Address) -> BondResult<UserApy> {
        self.read(|e, now| e.user_apy(account, now.timestamp))
    }

    pub fn system_apy(&self) -> BondResult<u128> {
        self.read(|e, now| e.system_apy(now.timestamp))
    }

    // --- balances ---

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.read(|e, now| e.ledger().balance_of(account, now))
    }

    pub fn total_supply(&self) -> u128 {
        self.read(|e, now| e.ledger().total_supply(now))
    }

    pub fn balance_of_at_block(&self, account: &Address, block: u64) -> BondResult<u128> {
        self.read(|e, now| e.ledger().balance_of_at_block(account, block, now))
    }

    pub fn total_supply_at_block(&self, block: u64) -> BondResult<u128> {
        self.read(|e, now| e.ledger().total_supply_at_block(block, now))
    }

    pub fn current_epoch(&self) -> u64 {
        self.read(|e, now| e.current_epoch(now.timestamp))
    }

    // --- privileged ---

    pub fn pause(&self, caller: &Address) -> BondResult<()> {
        self.mutate("pause", |e, _| e.pause(caller))
    }

    pub fn unpause(&self, caller: &Address) -> BondResult<()> {
        self.mutate("unpause", |e, _| e.unpause(caller))
    }

    pub fn update_system_lower_bound(&self, caller: &Address, value: u64) -> BondResult<()> {
        self.mutate("update_system_lower_bound", |e, _| e.update_system_lower_bound(caller, value))
    }

    pub fn update_personal_lower_bound(&self, caller: &Address, value: u64) -> BondResult<()> {
        self.mutate("update_personal_lower_bound", |e, _| e.update_personal_lower_bound(caller, value))
    }

    pub fn grant_role(&self, caller: &Address, role: Role, account: Address) -> BondResult<bool> {
        self.mutate("grant_role", |e, _| e.grant_role(caller, role, account))
    }

    pub fn revoke_role(&self, caller: &Address, role: Role, account: &Address) -> BondResult<bool> {
        self.mutate("revoke_role", |e, _| e.revoke_role(caller, role, account))
    }

    pub fn set_emission_source(&self, caller: &Address, source: Arc<dyn EmissionSource>) -> BondResult<()> {
        self.mutate("set_emission_source", |e, _| e.set_emission_source(caller, source))
    }

    pub fn set_utilization_source(&self, caller: &Address, source: Arc<dyn UtilizationSource>) -> BondResult<()> {
        self.mutate("set_utilization_source", |e, _| e.set_utilization_source(caller, source))
    }

    pub fn set_reward_sink(&self, caller: &Address, sink: Arc<dyn RewardSink>) -> BondResult<()> {
        self.mutate("set_reward_sink", |e, _| e.set_reward_sink(caller, sink))
    }

    fn mutate<T>(&self, op: &'static str, f: impl FnOnce(&mut BondingEngine, BlockStamp) -> BondResult<T>) -> BondResult<T> {
        let (result, events) = {
            let mut engine = self.engine.write();
            let now = self.clock.now();
            let result = f(&mut *engine, now);
            (result, engine.drain_events())
        };
        if let Err(e) = &result {
            warn!(op, error = %e, "operation rejected");
        }
        for event in events {
            self.publish(event);
        }
        result
    }

    fn publish(&self, event: BondingEvent) {
        match event.to_json() {
            Ok(json) => debug!(event = %json, "bonding event"),
            Err(e) => warn!("failed to encode event: {e}"),
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
