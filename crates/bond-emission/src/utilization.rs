//! Utilization baselines and the in-memory utilization ledger.
//!
//! Utilization arrives as cumulative series. The change attributable to an
//! epoch is `cumulative(epoch) - baseline(epoch)`, where the baseline is the
//! cumulative value at the most recent active epoch strictly before it.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use bond_core::error::{ArithmeticError, BondResult, UtilizationError};
use bond_core::traits::UtilizationSource;
use bond_core::types::{ActiveEpochPointers, Address};

/// Cumulative value at the last active epoch before `epoch`.
///
/// Walks the three pointers newest first. An account that was never active
/// has a zero baseline; one whose pointers all sit at or after `epoch` cannot
/// be resolved and fails with [`UtilizationError::Untrackable`].
pub fn resolve_baseline<F>(pointers: &ActiveEpochPointers, epoch: u64, lookup: F) -> BondResult<i128>
where
    F: Fn(u64) -> BondResult<i128>,
{
    for pointer in [pointers.last, pointers.previous, pointers.previous_previous] {
        if pointer < epoch {
            return lookup(pointer);
        }
    }
    if pointers.never_active() {
        return Ok(0);
    }
    Err(UtilizationError::Untrackable { epoch }.into())
}

#[derive(Debug, Clone, Default)]
struct Series {
    cumulative: BTreeMap<u64, i128>,
    pointers: ActiveEpochPointers,
}

impl Series {
    fn running(&self) -> i128 {
        self.cumulative.values().next_back().copied().unwrap_or(0)
    }

    /// Epoch a change lands at: never behind the latest recorded epoch.
    fn landing_epoch(&self, epoch: u64) -> u64 {
        self.cumulative.keys().next_back().map_or(epoch, |last| epoch.max(*last))
    }

    fn cumulative_at(&self, epoch: u64) -> i128 {
        self.cumulative.range(..=epoch).next_back().map_or(0, |(_, v)| *v)
    }

    fn next_total(&self, delta: i128) -> Result<i128, ArithmeticError> {
        self.running().checked_add(delta).ok_or(ArithmeticError::Overflow)
    }

    fn apply(&mut self, epoch: u64, total: i128) {
        self.cumulative.insert(epoch, total);
        self.pointers.record(epoch);
    }
}

#[derive(Debug, Default)]
struct Inner {
    system: Series,
    accounts: HashMap<Address, Series>,
}

/// Records signed utilization changes per account and epoch and serves them
/// back as cumulative series.
///
/// Changes recorded for an epoch older than the latest one already seen are
/// applied at the latest epoch, so cumulative values never get rewritten.
#[derive(Debug, Default)]
pub struct UtilizationLedger {
    inner: RwLock<Inner>,
}

impl UtilizationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `account` and to the system total at `epoch`.
    pub fn record_utilization(&self, account: &Address, epoch: u64, delta: i128) -> BondResult<()> {
        account.ensure_nonzero()?;
        if delta == 0 {
            return Ok(());
        }
        let mut inner = self.inner.write();

        let system_epoch = inner.system.landing_epoch(epoch);
        let system_total = inner.system.next_total(delta)?;
        let (personal_epoch, personal_total) = match inner.accounts.get(account) {
            Some(series) => (series.landing_epoch(epoch), series.next_total(delta)?),
            None => (epoch, delta),
        };

        inner.system.apply(system_epoch, system_total);
        inner
            .accounts
            .entry(*account)
            .or_default()
            .apply(personal_epoch, personal_total);

        debug!(%account, epoch = personal_epoch, delta, personal_total, system_total, "utilization recorded");
        Ok(())
    }

    pub fn account_count(&self) -> usize {
        self.inner.read().accounts.len()
    }
}

impl UtilizationSource for UtilizationLedger {
    fn total_utilization(&self, epoch: u64) -> BondResult<i128> {
        Ok(self.inner.read().system.cumulative_at(epoch))
    }

    fn personal_utilization(&self, account: &Address, epoch: u64) -> BondResult<i128> {
        Ok(self
            .inner
            .read()
            .accounts
            .get(account)
            .map_or(0, |s| s.cumulative_at(epoch)))
    }

    fn system_active_epochs(&self) -> BondResult<ActiveEpochPointers> {
        Ok(self.inner.read().system.pointers)
    }

    fn personal_active_epochs(&self, account: &Address) -> BondResult<ActiveEpochPointers> {
        Ok(self
            .inner
            .read()
            .accounts
            .get(account)
            .map(|s| s.pointers)
            .unwrap_or_default())
    }
}
