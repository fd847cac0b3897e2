//! Shared fixtures for the integration tests.

use std::sync::Arc;

use bond_core::constants::{LOCK_PERIOD_SECS, MAX_LOCK_SECS, TOKEN};
use bond_core::traits::{EmissionSource, MemoryRewardSink};
use bond_core::types::{align_to_period, Address, BlockStamp};
use bond_emission::{BondingEngine, Collaborators, EmissionSchedule, EpochConfig, UtilizationLedger};
use bond_escrow::LedgerParams;

pub const WEEK: u64 = LOCK_PERIOD_SECS;
/// Epoch 0 starts on a lock-period boundary.
pub const START: u64 = 2_800 * WEEK;
pub const EPOCH: u64 = 2 * WEEK;
pub const START_BLOCK: u64 = 1_000;
pub const BLOCK_TIME: u64 = 12;
/// Gross budget of every epoch in the flat schedule.
pub const BUDGET: u128 = 1_000_000 * TOKEN;

/// Account from a seed byte. Seed 0 is the zero address.
pub fn account(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn admin() -> Address {
    account(0xAD)
}

/// Stamp at timestamp `ts` with 12-second blocks from `START`.
pub fn stamp(ts: u64) -> BlockStamp {
    BlockStamp::new(ts, START_BLOCK + ts.saturating_sub(START) / BLOCK_TIME)
}

/// Timestamp `offset` seconds into `epoch`.
pub fn epoch_ts(epoch: u64, offset: u64) -> u64 {
    START + epoch * EPOCH + offset
}

/// Longest lock that can be created at `now`.
pub fn max_unlock(now: u64) -> u64 {
    align_to_period(now + MAX_LOCK_SECS)
}

pub struct World {
    pub engine: BondingEngine,
    pub utilization: Arc<UtilizationLedger>,
    pub sink: Arc<MemoryRewardSink>,
}

/// Engine with a flat `BUDGET` per epoch starting at `START`.
pub fn world() -> World {
    world_with(Arc::new(EmissionSchedule::flat(BUDGET)))
}

pub fn world_with(emission: Arc<dyn EmissionSource>) -> World {
    let utilization = Arc::new(UtilizationLedger::new());
    let sink = Arc::new(MemoryRewardSink::new());
    let epochs = EpochConfig::new(START, EPOCH).expect("valid epoch config");
    let engine = BondingEngine::new(
        admin(),
        stamp(START),
        LedgerParams::default(),
        epochs,
        Collaborators { emission, utilization: utilization.clone(), rewards: sink.clone() },
    );
    World { engine, utilization, sink }
}
