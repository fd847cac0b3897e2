//! Collaborator interfaces consumed by the emission engine.
//!
//! - [`EmissionSource`]: gross emission budget per epoch (bond-emission's
//!   `EmissionSchedule` implements)
//! - [`UtilizationSource`]: cumulative utilization series and active-epoch
//!   pointers (bond-emission's `UtilizationLedger` implements)
//! - [`RewardSink`]: pays out claimed rewards ([`MemoryRewardSink`] here)

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::BondResult;
use crate::types::{ActiveEpochPointers, Address};

/// Source of the per-epoch emission budget before utilization gating.
pub trait EmissionSource: Send + Sync {
    /// Gross emissions for `epoch`.
    ///
    /// Implementations fail with `InputError::FutureEpoch` when
    /// `epoch > current_epoch`.
    fn gross_emission_budget(&self, epoch: u64, current_epoch: u64) -> BondResult<u128>;
}

/// Cumulative utilization signals produced outside this workspace.
///
/// Values are cumulative through the given epoch, not per-epoch deltas.
pub trait UtilizationSource: Send + Sync {
    /// System-wide cumulative utilization through `epoch`.
    fn total_utilization(&self, epoch: u64) -> BondResult<i128>;

    /// Cumulative utilization of `account` through `epoch`.
    fn personal_utilization(&self, account: &Address, epoch: u64) -> BondResult<i128>;

    /// Most recent epochs at which system utilization changed.
    fn system_active_epochs(&self) -> BondResult<ActiveEpochPointers>;

    /// Most recent epochs at which `account`'s utilization changed.
    fn personal_active_epochs(&self, account: &Address) -> BondResult<ActiveEpochPointers>;
}

/// Destination of claimed rewards.
pub trait RewardSink: Send + Sync {
    /// Credit `amount` to `recipient`.
    fn transfer(&self, recipient: &Address, amount: u128) -> BondResult<()>;
}

/// In-memory reward sink recording credited balances. Suitable for tests and
/// simulations; a production deployment mints through its own sink.
#[derive(Debug, Default)]
pub struct MemoryRewardSink {
    balances: Mutex<HashMap<Address, u128>>,
}

impl MemoryRewardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    pub fn total_paid(&self) -> u128 {
        self.balances.lock().values().sum()
    }
}

impl RewardSink for MemoryRewardSink {
    fn transfer(&self, recipient: &Address, amount: u128) -> BondResult<()> {
        recipient.ensure_nonzero()?;
        let mut balances = self.balances.lock();
        let entry = balances.entry(*recipient).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(crate::error::ArithmeticError::Overflow)?;
        Ok(())
    }
}
