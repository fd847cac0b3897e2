//! Write-once claim records per (account, epoch) and per-epoch totals.

use std::collections::HashMap;

use bond_core::error::{ArithmeticError, BondResult, StateError};
use bond_core::types::Address;

#[derive(Debug, Clone, Default)]
pub struct ClaimBook {
    claimed: HashMap<(Address, u64), u128>,
    totals: HashMap<u64, u128>,
}

impl ClaimBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `AlreadyClaimed` if `account` already claimed `epoch`.
    pub fn ensure_unclaimed(&self, account: &Address, epoch: u64) -> Result<(), StateError> {
        if self.has_claimed(account, epoch) {
            return Err(StateError::AlreadyClaimed { epoch });
        }
        Ok(())
    }

    /// Record a claim and add it to the epoch total. A zero `amount` still
    /// marks the epoch as claimed.
    pub fn record(&mut self, account: Address, epoch: u64, amount: u128) -> BondResult<()> {
        self.ensure_unclaimed(&account, epoch)?;
        let total = self
            .total_claimed(epoch)
            .checked_add(amount)
            .ok_or(ArithmeticError::Overflow)?;
        self.claimed.insert((account, epoch), amount);
        self.totals.insert(epoch, total);
        Ok(())
    }

    pub fn has_claimed(&self, account: &Address, epoch: u64) -> bool {
        self.claimed.contains_key(&(*account, epoch))
    }

    pub fn user_claimed(&self, account: &Address, epoch: u64) -> u128 {
        self.claimed.get(&(*account, epoch)).copied().unwrap_or(0)
    }

    pub fn total_claimed(&self, epoch: u64) -> u128 {
        self.totals.get(&epoch).copied().unwrap_or(0)
    }
}
