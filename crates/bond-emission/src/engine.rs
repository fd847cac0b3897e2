//! Bonding engine: the escrow ledger plus utilization-gated epoch emissions.
//!
//! Emissions for an epoch are the gross budget scaled by the system
//! utilization ratio. An account's share is proportional to its bonded
//! balance at the end of the epoch, and is scaled again by its personal
//! utilization ratio when claimed. Rewards of epoch `e` can only be claimed
//! during epoch `e + 1`, once per account.
//!
//! The engine is a plain state machine with no internal locking; callers
//! serialize mutations (see `bond-service`).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bond_core::access::{AccessControl, Role};
use bond_core::constants::RATIO_SCALE;
use bond_core::error::{ArithmeticError, BondResult, InputError, StateError};
use bond_core::events::{BondingEvent, BoundKind, Collaborator};
use bond_core::traits::{EmissionSource, RewardSink, UtilizationSource};
use bond_core::types::{Address, BlockStamp, Lock};
use bond_escrow::{EscrowLedger, LedgerParams};

use crate::claims::ClaimBook;
use crate::epoch::EpochConfig;
use crate::math::mul_div;
use crate::ratio::normalize_ratio;
use crate::utilization::resolve_baseline;

/// External collaborators the engine reads from and pays through.
#[derive(Clone)]
pub struct Collaborators {
    pub emission: Arc<dyn EmissionSource>,
    pub utilization: Arc<dyn UtilizationSource>,
    pub rewards: Arc<dyn RewardSink>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Outcome of a successful claim.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub account: Address,
    pub recipient: Address,
    pub epoch: u64,
    /// Eligible reward before the personal ratio.
    pub raw: u128,
    pub personal_ratio: u64,
    /// Amount transferred to `recipient`.
    pub amount: u128,
}

/// Per-account summary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserInfo {
    /// Utilization change attributed to the previous epoch.
    pub personal_utilization: i128,
    /// Claimable now, after the personal ratio.
    pub eligible_rewards: u128,
    /// Claimable now at a full personal ratio.
    pub max_rewards: u128,
    pub locked_amount: u128,
    pub lock_end: u64,
    pub bonded_balance: u128,
}

/// Annualised rates of one account, in basis points.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserApy {
    /// After the personal utilization ratio.
    pub current: u128,
    /// At a full personal ratio.
    pub max: u128,
}

pub struct BondingEngine {
    ledger: EscrowLedger,
    epochs: EpochConfig,
    claims: ClaimBook,
    access: AccessControl,
    paused: bool,
    emission: Arc<dyn EmissionSource>,
    utilization: Arc<dyn UtilizationSource>,
    rewards: Arc<dyn RewardSink>,
    outbox: Vec<BondingEvent>,
}

impl fmt::Debug for BondingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BondingEngine")
            .field("epochs", &self.epochs)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl BondingEngine {
    /// New engine whose ledger starts at `genesis`, with `admin` holding
    /// every role.
    pub fn new(
        admin: Address,
        genesis: BlockStamp,
        params: LedgerParams,
        epochs: EpochConfig,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            ledger: EscrowLedger::new(genesis, params),
            epochs,
            claims: ClaimBook::new(),
            access: AccessControl::with_admin(admin),
            paused: false,
            emission: collaborators.emission,
            utilization: collaborators.utilization,
            rewards: collaborators.rewards,
            outbox: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &EscrowLedger {
        &self.ledger
    }

    pub fn epoch_config(&self) -> &EpochConfig {
        &self.epochs
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<BondingEvent> {
        std::mem::take(&mut self.outbox)
    }

    // --- epochs ---

    pub fn current_epoch(&self, now: u64) -> u64 {
        self.epochs.current_epoch(now)
    }

    pub fn previous_epoch(&self, now: u64) -> u64 {
        self.epochs.previous_epoch(now)
    }

    pub fn epoch_at_timestamp(&self, t: u64) -> u64 {
        self.epochs.epoch_at_timestamp(t)
    }

    pub fn epoch_timestamp_end(&self, epoch: u64) -> u64 {
        self.epochs.epoch_timestamp_end(epoch)
    }

    // --- locks ---

    pub fn create_lock(&mut self, account: &Address, amount: u128, unlock_time: u64, now: BlockStamp) -> BondResult<Lock> {
        self.ensure_not_paused()?;
        let lock = self.ledger.create_lock(account, amount, unlock_time, now)?;
        self.outbox.push(BondingEvent::LockCreated {
            account: *account,
            amount,
            unlock_time: lock.end,
            ts: now.timestamp,
        });
        Ok(lock)
    }

    pub fn increase_amount(&mut self, account: &Address, amount: u128, now: BlockStamp) -> BondResult<Lock> {
        self.deposit_for(account, account, amount, now)
    }

    pub fn deposit_for(&mut self, funder: &Address, account: &Address, amount: u128, now: BlockStamp) -> BondResult<Lock> {
        self.ensure_not_paused()?;
        let lock = self.ledger.deposit_for(funder, account, amount, now)?;
        self.outbox.push(BondingEvent::LockIncreased {
            account: *account,
            funder: *funder,
            amount,
            total: lock.amount,
            ts: now.timestamp,
        });
        Ok(lock)
    }

    pub fn increase_unlock_time(&mut self, account: &Address, unlock_time: u64, now: BlockStamp) -> BondResult<Lock> {
        self.ensure_not_paused()?;
        let lock = self.ledger.increase_unlock_time(account, unlock_time, now)?;
        self.outbox.push(BondingEvent::UnlockTimeIncreased {
            account: *account,
            unlock_time: lock.end,
            ts: now.timestamp,
        });
        Ok(lock)
    }

    pub fn withdraw(&mut self, account: &Address, now: BlockStamp) -> BondResult<u128> {
        self.ensure_not_paused()?;
        let amount = self.ledger.withdraw(account, now)?;
        self.outbox.push(BondingEvent::Withdrawn { account: *account, amount, ts: now.timestamp });
        Ok(amount)
    }

    pub fn checkpoint(&mut self, now: BlockStamp) -> BondResult<()> {
        self.ensure_not_paused()?;
        self.ledger.checkpoint(now)
    }

    /// Bonded balance of `account` sampled at the end of `epoch`.
    pub fn user_bonded_balance_at_epoch_end(&self, account: &Address, epoch: u64) -> u128 {
        self.ledger.balance_of_at(account, self.epochs.epoch_timestamp_end(epoch))
    }

    /// Total bonded supply sampled at the end of `epoch`.
    pub fn total_bonded_balance_at_epoch_end(&self, epoch: u64) -> u128 {
        self.ledger.total_supply_at(self.epochs.epoch_timestamp_end(epoch))
    }

    // --- emissions ---

    /// Gross budget of `epoch` scaled by the system utilization ratio.
    pub fn emissions_for_epoch(&self, epoch: u64, now: u64) -> BondResult<u128> {
        let current = self.ensure_not_future(epoch, now)?;
        let gross = self.emission.gross_emission_budget(epoch, current)?;
        let ratio = self.system_utilization_ratio(epoch, now)?;
        Ok(mul_div(gross, u128::from(ratio), u128::from(RATIO_SCALE))?)
    }

    /// System utilization ratio of `epoch`, in basis points.
    ///
    /// 0 for a future epoch; full for the bootstrap epochs 0 and 1.
    pub fn system_utilization_ratio(&self, epoch: u64, now: u64) -> BondResult<u64> {
        if epoch > self.current_epoch(now) {
            return Ok(0);
        }
        if epoch < 2 {
            return Ok(RATIO_SCALE);
        }
        let delta = self.system_utilization_delta(epoch)?;
        let target = self.claims.total_claimed(epoch - 1);
        let had_eligible = delta > 0 && target == 0 && self.total_bonded_balance_at_epoch_end(epoch - 1) > 0;
        Ok(normalize_ratio(delta, target, self.epochs.system_lower_bound(), had_eligible))
    }

    /// Personal utilization ratio of `account` for `epoch`, in basis points.
    pub fn personal_utilization_ratio(&self, account: &Address, epoch: u64, now: u64) -> BondResult<u64> {
        account.ensure_nonzero()?;
        if epoch > self.current_epoch(now) {
            return Ok(0);
        }
        if epoch < 2 {
            return Ok(RATIO_SCALE);
        }
        let delta = self.personal_utilization_delta(account, epoch)?;
        let target = self.claims.user_claimed(account, epoch - 1);
        // Eligibility only matters for a positive delta against a zero target.
        let had_eligible = delta > 0 && target == 0 && self.had_share(account, epoch - 1, now)?;
        Ok(normalize_ratio(delta, target, self.epochs.personal_lower_bound(), had_eligible))
    }

    /// System utilization change attributed to `epoch`.
    pub fn system_utilization_delta(&self, epoch: u64) -> BondResult<i128> {
        let pointers = self.utilization.system_active_epochs()?;
        let cumulative = self.utilization.total_utilization(epoch)?;
        let baseline = resolve_baseline(&pointers, epoch, |e| self.utilization.total_utilization(e))?;
        Ok(cumulative.checked_sub(baseline).ok_or(ArithmeticError::Overflow)?)
    }

    /// Utilization change of `account` attributed to `epoch`.
    pub fn personal_utilization_delta(&self, account: &Address, epoch: u64) -> BondResult<i128> {
        let pointers = self.utilization.personal_active_epochs(account)?;
        let cumulative = self.utilization.personal_utilization(account, epoch)?;
        let baseline = resolve_baseline(&pointers, epoch, |e| self.utilization.personal_utilization(account, e))?;
        Ok(cumulative.checked_sub(baseline).ok_or(ArithmeticError::Overflow)?)
    }

    /// Reward `account` earned in `epoch` before the personal ratio.
    pub fn eligible_reward(&self, account: &Address, epoch: u64, now: u64) -> BondResult<u128> {
        account.ensure_nonzero()?;
        self.ensure_not_future(epoch, now)?;
        let total = self.total_bonded_balance_at_epoch_end(epoch);
        if total == 0 {
            return Ok(0);
        }
        let balance = self.user_bonded_balance_at_epoch_end(account, epoch);
        if balance == 0 {
            return Ok(0);
        }
        let emissions = self.emissions_for_epoch(epoch, now)?;
        Ok(mul_div(emissions, balance, total)?)
    }

    // --- claims ---

    /// Claim the previous epoch's reward of `account`, paid to `recipient`.
    pub fn claim_rewards(&mut self, account: &Address, recipient: &Address, now: u64) -> BondResult<ClaimReceipt> {
        self.ensure_not_paused()?;
        recipient.ensure_nonzero()?;
        account.ensure_nonzero()?;
        let current = self.current_epoch(now);
        if current == 0 {
            return Err(StateError::FirstEpochClaim.into());
        }
        let epoch = current - 1;
        self.claims.ensure_unclaimed(account, epoch)?;

        let raw = self.eligible_reward(account, epoch, now)?;
        if raw == 0 {
            return Err(StateError::NothingToClaim { epoch }.into());
        }
        let personal_ratio = self.personal_utilization_ratio(account, epoch, now)?;
        let amount = mul_div(raw, u128::from(personal_ratio), u128::from(RATIO_SCALE))?;
        if self.claims.total_claimed(epoch).checked_add(amount).is_none() {
            return Err(ArithmeticError::Overflow.into());
        }

        // Pay first: a failing sink must leave no claim behind.
        self.rewards.transfer(recipient, amount)?;
        self.claims.record(*account, epoch, amount)?;

        info!(%account, %recipient, epoch, raw, personal_ratio, amount, "rewards claimed");
        self.outbox.push(BondingEvent::RewardsClaimed {
            account: *account,
            recipient: *recipient,
            epoch,
            amount,
        });
        Ok(ClaimReceipt { account: *account, recipient: *recipient, epoch, raw, personal_ratio, amount })
    }

    /// What `claim_rewards` would pay `account` right now, or 0.
    pub fn user_current_claimable_rewards(&self, account: &Address, now: u64) -> BondResult<u128> {
        self.claimable(account, now, true)
    }

    pub fn has_claimed(&self, account: &Address, epoch: u64) -> bool {
        self.claims.has_claimed(account, epoch)
    }

    pub fn user_claimed(&self, account: &Address, epoch: u64) -> u128 {
        self.claims.user_claimed(account, epoch)
    }

    pub fn total_claimed(&self, epoch: u64) -> u128 {
        self.claims.total_claimed(epoch)
    }

    /// Emissions of `epoch` nobody claimed. Only final once the claim window
    /// (epoch + 1) has closed; 0 before that.
    pub fn unclaimed_rewards_for_epoch(&self, epoch: u64, now: u64) -> BondResult<u128> {
        if epoch.saturating_add(2) > self.current_epoch(now) {
            return Ok(0);
        }
        let emissions = self.emissions_for_epoch(epoch, now)?;
        Ok(emissions.saturating_sub(self.claims.total_claimed(epoch)))
    }

    pub fn user_info(&self, account: &Address, now: BlockStamp) -> BondResult<UserInfo> {
        account.ensure_nonzero()?;
        let lock = self.ledger.locked(account);
        let current = self.current_epoch(now.timestamp);
        let personal_utilization = if current == 0 {
            0
        } else {
            self.personal_utilization_delta(account, current - 1)?
        };
        Ok(UserInfo {
            personal_utilization,
            eligible_rewards: self.claimable(account, now.timestamp, true)?,
            max_rewards: self.claimable(account, now.timestamp, false)?,
            locked_amount: lock.amount,
            lock_end: lock.end,
            bonded_balance: self.ledger.balance_of(account, now),
        })
    }

    /// Annualised reward rates of `account` on its locked amount, in basis
    /// points, extrapolated from the previous epoch.
    pub fn user_apy(&self, account: &Address, now: u64) -> BondResult<UserApy> {
        account.ensure_nonzero()?;
        let locked = self.ledger.locked(account).amount;
        if locked == 0 {
            return Ok(UserApy::default());
        }
        let epoch = self.previous_epoch(now);
        let reward = self.eligible_reward(account, epoch, now)?;
        if reward == 0 {
            return Ok(UserApy::default());
        }
        let ratio = self.personal_utilization_ratio(account, epoch, now)?;
        let current = mul_div(reward, u128::from(ratio), u128::from(RATIO_SCALE))?;
        Ok(UserApy {
            current: self.annualise(current, locked)?,
            max: self.annualise(reward, locked)?,
        })
    }

    /// Annualised emission rate on all locked tokens, in basis points.
    pub fn system_apy(&self, now: u64) -> BondResult<u128> {
        let locked = self.ledger.total_locked();
        if locked == 0 {
            return Ok(0);
        }
        let emissions = self.emissions_for_epoch(self.previous_epoch(now), now)?;
        self.annualise(emissions, locked)
    }

    // --- privileged ---

    pub fn set_emission_source(&mut self, caller: &Address, source: Arc<dyn EmissionSource>) -> BondResult<()> {
        self.authorize(Role::Admin, caller)?;
        self.emission = source;
        self.collaborator_updated(Collaborator::EmissionSource);
        Ok(())
    }

    pub fn set_utilization_source(&mut self, caller: &Address, source: Arc<dyn UtilizationSource>) -> BondResult<()> {
        self.authorize(Role::Admin, caller)?;
        self.utilization = source;
        self.collaborator_updated(Collaborator::UtilizationSource);
        Ok(())
    }

    pub fn set_reward_sink(&mut self, caller: &Address, sink: Arc<dyn RewardSink>) -> BondResult<()> {
        self.authorize(Role::Admin, caller)?;
        self.rewards = sink;
        self.collaborator_updated(Collaborator::RewardSink);
        Ok(())
    }

    /// Returns `false` if `account` already held `role`.
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: Address) -> BondResult<bool> {
        self.authorize(Role::Admin, caller)?;
        account.ensure_nonzero()?;
        let granted = self.access.grant(caller, role, account)?;
        if granted {
            info!(%role, %account, "role granted");
            self.outbox.push(BondingEvent::RoleGranted { role, account });
        }
        Ok(granted)
    }

    /// Returns `false` if `account` did not hold `role`.
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> BondResult<bool> {
        self.authorize(Role::Admin, caller)?;
        let revoked = self.access.revoke(caller, role, account)?;
        if revoked {
            info!(%role, %account, "role revoked");
            self.outbox.push(BondingEvent::RoleRevoked { role, account: *account });
        }
        Ok(revoked)
    }

    pub fn update_system_lower_bound(&mut self, caller: &Address, value: u64) -> BondResult<()> {
        self.authorize(Role::Controller, caller)?;
        self.epochs.set_system_lower_bound(value)?;
        self.bound_updated(BoundKind::System, value);
        Ok(())
    }

    pub fn update_personal_lower_bound(&mut self, caller: &Address, value: u64) -> BondResult<()> {
        self.authorize(Role::Controller, caller)?;
        self.epochs.set_personal_lower_bound(value)?;
        self.bound_updated(BoundKind::Personal, value);
        Ok(())
    }

    pub fn pause(&mut self, caller: &Address) -> BondResult<()> {
        self.authorize(Role::Pauser, caller)?;
        if self.paused {
            return Err(StateError::AlreadyPaused.into());
        }
        self.paused = true;
        info!(by = %caller, "paused");
        self.outbox.push(BondingEvent::Paused { by: *caller });
        Ok(())
    }

    pub fn unpause(&mut self, caller: &Address) -> BondResult<()> {
        self.authorize(Role::Pauser, caller)?;
        if !self.paused {
            return Err(StateError::NotPaused.into());
        }
        self.paused = false;
        info!(by = %caller, "unpaused");
        self.outbox.push(BondingEvent::Unpaused { by: *caller });
        Ok(())
    }

    // --- internal ---

    fn ensure_not_paused(&self) -> Result<(), StateError> {
        if self.paused {
            return Err(StateError::Paused);
        }
        Ok(())
    }

    /// Returns the current epoch, or `FutureEpoch` if `epoch` is after it.
    fn ensure_not_future(&self, epoch: u64, now: u64) -> Result<u64, InputError> {
        let current = self.current_epoch(now);
        if epoch > current {
            return Err(InputError::FutureEpoch { epoch, current });
        }
        Ok(current)
    }

    fn authorize(&self, role: Role, caller: &Address) -> Result<(), StateError> {
        self.access.ensure_role(role, caller).inspect_err(|_| {
            warn!(%caller, %role, "rejected privileged call");
        })
    }

    /// Previous-epoch reward claimable now, with or without the personal
    /// ratio applied.
    fn claimable(&self, account: &Address, now: u64, apply_ratio: bool) -> BondResult<u128> {
        let current = self.current_epoch(now);
        if current == 0 {
            return Ok(0);
        }
        let epoch = current - 1;
        if self.claims.has_claimed(account, epoch) {
            return Ok(0);
        }
        let raw = self.eligible_reward(account, epoch, now)?;
        if raw == 0 || !apply_ratio {
            return Ok(raw);
        }
        let ratio = self.personal_utilization_ratio(account, epoch, now)?;
        Ok(mul_div(raw, u128::from(ratio), u128::from(RATIO_SCALE))?)
    }

    /// Whether `account` held part of a non-zero bonded total while `epoch`
    /// had a non-zero gross budget. Unlike `eligible_reward` this never
    /// resolves utilization baselines of `epoch`.
    fn had_share(&self, account: &Address, epoch: u64, now: u64) -> BondResult<bool> {
        if self.user_bonded_balance_at_epoch_end(account, epoch) == 0
            || self.total_bonded_balance_at_epoch_end(epoch) == 0
        {
            return Ok(false);
        }
        let current = self.ensure_not_future(epoch, now)?;
        Ok(self.emission.gross_emission_budget(epoch, current)? > 0)
    }

    fn annualise(&self, per_epoch: u128, principal: u128) -> BondResult<u128> {
        let yearly = per_epoch
            .checked_mul(u128::from(self.epochs.epochs_per_year()))
            .ok_or(ArithmeticError::Overflow)?;
        Ok(mul_div(yearly, u128::from(RATIO_SCALE), principal)?)
    }

    fn collaborator_updated(&mut self, kind: Collaborator) {
        info!(?kind, "collaborator updated");
        self.outbox.push(BondingEvent::CollaboratorUpdated { kind });
    }

    fn bound_updated(&mut self, kind: BoundKind, value: u64) {
        info!(?kind, value, "lower bound updated");
        self.outbox.push(BondingEvent::LowerBoundUpdated { kind, value });
    }
}
