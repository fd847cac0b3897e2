//! Voting-escrow ledger of time-locked deposits.
//!
//! Each account holds at most one [`Lock`]. A lock of `amount` ending at `end`
//! contributes a bonded balance that decays linearly to zero at `end`:
//! `slope = amount / MAX_LOCK_SECS`, `bias = slope * (end - now)`.
//!
//! The global bonded supply is the sum of all those lines. It is maintained
//! without iterating accounts: the ledger keeps a running global line plus a
//! [`SlopeSchedule`] of slopes that stop decaying at future period boundaries.
//! Every mutation first calls [`replay_pending`] to walk the global line from
//! its last checkpoint to "now" one lock period at a time, applying each
//! scheduled reduction, and only then applies its own delta. Skipping a single
//! boundary leaves a stale slope in the global line, which keeps draining
//! after the locks behind it have ended and eventually drives supply queries
//! negative.
//!
//! All arithmetic is integer-only; lines use `i128` and are clamped at zero.

use std::collections::HashMap;

use tracing::{debug, info};

use bond_core::constants::{BLOCK_SLOPE_MULTIPLIER, DEFAULT_EPOCH_LENGTH_SECS, LOCK_PERIOD_SECS, MAX_LOCK_SECS};
use bond_core::error::{ArithmeticError, BondResult, InputError, StateError};
use bond_core::types::{align_to_period, Address, BlockStamp, Lock, Point};

use crate::checkpoint::CheckpointHistory;
use crate::schedule::SlopeSchedule;

/// Tunables of the escrow ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerParams {
    /// Shortest aligned lock duration accepted by `create_lock`.
    pub min_lock_secs: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self { min_lock_secs: DEFAULT_EPOCH_LENGTH_SECS }
    }
}

/// Result of walking the global line forward to a target stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// One checkpoint per lock-period boundary crossed strictly before the target.
    pub crossed: Vec<Point>,
    /// The global line at the target stamp.
    pub current: Point,
}

/// Walk the global line from `last` to `now`, applying every scheduled slope
/// reduction on the way.
///
/// Steps one lock period at a time with no iteration cap. Block numbers of
/// intermediate checkpoints are interpolated linearly between `last` and `now`.
pub fn replay_pending(last: Point, now: BlockStamp, schedule: &SlopeSchedule) -> Replay {
    let target_ts = now.timestamp.max(last.ts);
    let target_blk = now.block.max(last.blk);

    let block_slope: i128 = if target_ts > last.ts {
        BLOCK_SLOPE_MULTIPLIER * (target_blk - last.blk) as i128 / (target_ts - last.ts) as i128
    } else {
        0
    };

    let mut point = last;
    let mut crossed = Vec::new();
    let mut t_i = align_to_period(last.ts);

    loop {
        t_i = t_i.saturating_add(LOCK_PERIOD_SECS);
        let mut d_slope = 0;
        if t_i > target_ts {
            t_i = target_ts;
        } else {
            d_slope = schedule.scheduled(t_i);
        }

        point.bias -= point.slope * (t_i - point.ts) as i128;
        point.slope -= d_slope;
        point.bias = point.bias.max(0);
        point.slope = point.slope.max(0);
        point.ts = t_i;
        point.blk = last.blk + (block_slope * (t_i - last.ts) as i128 / BLOCK_SLOPE_MULTIPLIER) as u64;

        if t_i == target_ts {
            point.blk = target_blk;
            break;
        }
        crossed.push(point);
    }

    if !crossed.is_empty() {
        debug!(boundaries = crossed.len(), to = target_ts, "replayed pending slope changes");
    }

    Replay { crossed, current: point }
}

/// Evaluate the global line at `t >= point.ts` without mutating anything.
///
/// Only boundaries carrying a scheduled reduction change the slope, so the
/// walk visits those alone and stops once the slope is exhausted.
pub fn supply_at(point: Point, t: u64, schedule: &SlopeSchedule) -> u128 {
    if t <= point.ts {
        return point.value_at(point.ts);
    }
    let mut p = point;
    for (boundary, d_slope) in schedule.pending_between(p.ts, t - 1) {
        if p.slope <= 0 {
            break;
        }
        p.bias = p.bias.saturating_sub(p.slope.saturating_mul((boundary - p.ts) as i128));
        p.slope = (p.slope - d_slope).max(0);
        p.ts = boundary;
    }
    p.value_at(t)
}

/// Per-account line for `lock` written at `now`. Zero for ended locks.
fn account_point(lock: &Lock, now: BlockStamp) -> BondResult<Point> {
    let mut point = Point::zero_at(now);
    if lock.end > now.timestamp && lock.amount > 0 {
        let amount = i128::try_from(lock.amount).map_err(|_| ArithmeticError::Overflow)?;
        point.slope = amount / MAX_LOCK_SECS as i128;
        point.bias = point
            .slope
            .checked_mul((lock.end - now.timestamp) as i128)
            .ok_or(ArithmeticError::Overflow)?;
    }
    Ok(point)
}

/// The escrow ledger: locks, checkpoint histories and the slope schedule.
#[derive(Debug, Clone)]
pub struct EscrowLedger {
    params: LedgerParams,
    locks: HashMap<Address, Lock>,
    global: CheckpointHistory,
    accounts: HashMap<Address, CheckpointHistory>,
    schedule: SlopeSchedule,
    total_locked: u128,
}

impl EscrowLedger {
    /// Create an empty ledger whose global line starts at `genesis`.
    pub fn new(genesis: BlockStamp, params: LedgerParams) -> Self {
        Self {
            params,
            locks: HashMap::new(),
            global: CheckpointHistory::starting_at(Point::zero_at(genesis)),
            accounts: HashMap::new(),
            schedule: SlopeSchedule::new(),
            total_locked: 0,
        }
    }

    pub fn params(&self) -> LedgerParams {
        self.params
    }

    // --- mutations ---

    /// Lock `amount` for `account` until `unlock_time` (rounded down to the
    /// lock period).
    pub fn create_lock(&mut self, account: &Address, amount: u128, unlock_time: u64, now: BlockStamp) -> BondResult<Lock> {
        account.ensure_nonzero()?;
        if amount == 0 {
            return Err(InputError::ZeroAmount.into());
        }
        let old = self.locked(account);
        if old.amount > 0 {
            return Err(StateError::LockExists.into());
        }
        let end = self.validate_unlock_time(unlock_time, now)?;
        let duration = end - now.timestamp;
        if duration < self.params.min_lock_secs {
            return Err(InputError::LockTooShort { duration, min: self.params.min_lock_secs }.into());
        }
        let total_locked = self.total_locked.checked_add(amount).ok_or(ArithmeticError::Overflow)?;

        let new = Lock { amount, end };
        self.write_checkpoint(Some((account, &old, &new)), now)?;
        self.locks.insert(*account, new);
        self.total_locked = total_locked;

        info!(%account, amount, end, "lock created");
        Ok(new)
    }

    /// Add `amount` to `account`'s active lock without changing its end.
    pub fn increase_amount(&mut self, account: &Address, amount: u128, now: BlockStamp) -> BondResult<Lock> {
        self.deposit_for(account, account, amount, now)
    }

    /// Add `amount` funded by `funder` to `account`'s active lock.
    pub fn deposit_for(&mut self, funder: &Address, account: &Address, amount: u128, now: BlockStamp) -> BondResult<Lock> {
        funder.ensure_nonzero()?;
        account.ensure_nonzero()?;
        if amount == 0 {
            return Err(InputError::ZeroAmount.into());
        }
        let old = self.active_lock(account, now)?;
        let new_amount = old.amount.checked_add(amount).ok_or(ArithmeticError::Overflow)?;
        let total_locked = self.total_locked.checked_add(amount).ok_or(ArithmeticError::Overflow)?;

        let new = Lock { amount: new_amount, end: old.end };
        self.write_checkpoint(Some((account, &old, &new)), now)?;
        self.locks.insert(*account, new);
        self.total_locked = total_locked;

        info!(%account, %funder, amount, total = new_amount, "lock amount increased");
        Ok(new)
    }

    /// Move `account`'s unlock time later.
    pub fn increase_unlock_time(&mut self, account: &Address, new_unlock_time: u64, now: BlockStamp) -> BondResult<Lock> {
        account.ensure_nonzero()?;
        let old = self.active_lock(account, now)?;
        let end = align_to_period(new_unlock_time);
        if end <= old.end {
            return Err(StateError::UnlockTimeNotIncreased { requested: end, current: old.end }.into());
        }
        let end = self.validate_unlock_time(new_unlock_time, now)?;

        let new = Lock { amount: old.amount, end };
        self.write_checkpoint(Some((account, &old, &new)), now)?;
        self.locks.insert(*account, new);

        info!(%account, end, "unlock time increased");
        Ok(new)
    }

    /// Release an expired lock, returning the withdrawn amount.
    pub fn withdraw(&mut self, account: &Address, now: BlockStamp) -> BondResult<u128> {
        account.ensure_nonzero()?;
        let old = self.locked(account);
        if old.amount == 0 {
            return Err(StateError::NoLock.into());
        }
        if now.timestamp < old.end {
            return Err(StateError::LockNotExpired { end: old.end }.into());
        }
        let total_locked = self.total_locked.checked_sub(old.amount).ok_or(ArithmeticError::Overflow)?;

        let new = Lock::default();
        self.write_checkpoint(Some((account, &old, &new)), now)?;
        self.locks.remove(account);
        self.total_locked = total_locked;

        info!(%account, amount = old.amount, "lock withdrawn");
        Ok(old.amount)
    }

    /// Record the global line at `now` with no account change.
    pub fn checkpoint(&mut self, now: BlockStamp) -> BondResult<()> {
        self.write_checkpoint(None, now)
    }

    // --- queries ---

    pub fn locked(&self, account: &Address) -> Lock {
        self.locks.get(account).copied().unwrap_or_default()
    }

    pub fn locked_end(&self, account: &Address) -> u64 {
        self.locked(account).end
    }

    pub fn total_locked(&self) -> u128 {
        self.total_locked
    }

    /// Bonded balance of `account` at `now`.
    pub fn balance_of(&self, account: &Address, now: BlockStamp) -> u128 {
        self.balance_of_at(account, now.timestamp)
    }

    /// Bonded balance of `account` at timestamp `t`.
    pub fn balance_of_at(&self, account: &Address, t: u64) -> u128 {
        self.accounts
            .get(account)
            .map_or(0, |history| history.value_at_timestamp(t))
    }

    /// Total bonded supply at `now`.
    pub fn total_supply(&self, now: BlockStamp) -> u128 {
        self.total_supply_at(now.timestamp)
    }

    /// Total bonded supply at timestamp `t`.
    pub fn total_supply_at(&self, t: u64) -> u128 {
        self.global
            .point_at_timestamp(t)
            .map_or(0, |point| supply_at(*point, t, &self.schedule))
    }

    /// Bonded balance of `account` as of block `block`.
    pub fn balance_of_at_block(&self, account: &Address, block: u64, now: BlockStamp) -> BondResult<u128> {
        let Some(block_time) = self.block_to_timestamp(block, now)? else {
            return Ok(0);
        };
        let point = self.accounts.get(account).and_then(|h| h.point_at_block(block));
        Ok(point.map_or(0, |p| p.value_at(block_time)))
    }

    /// Total bonded supply as of block `block`.
    pub fn total_supply_at_block(&self, block: u64, now: BlockStamp) -> BondResult<u128> {
        let Some(block_time) = self.block_to_timestamp(block, now)? else {
            return Ok(0);
        };
        Ok(self
            .global
            .point_at_block(block)
            .map_or(0, |point| supply_at(*point, block_time, &self.schedule)))
    }

    /// Slope of `account`'s most recent checkpoint.
    pub fn last_user_slope(&self, account: &Address) -> i128 {
        self.accounts
            .get(account)
            .and_then(CheckpointHistory::last)
            .map_or(0, |p| p.slope)
    }

    pub fn user_point(&self, account: &Address, index: usize) -> Option<Point> {
        self.accounts.get(account).and_then(|h| h.get(index)).copied()
    }

    pub fn user_point_count(&self, account: &Address) -> usize {
        self.accounts.get(account).map_or(0, CheckpointHistory::len)
    }

    pub fn global_point(&self, index: usize) -> Option<Point> {
        self.global.get(index).copied()
    }

    pub fn global_point_count(&self) -> usize {
        self.global.len()
    }

    /// Slope reduction pending at boundary `t`.
    pub fn scheduled_slope_change(&self, t: u64) -> i128 {
        self.schedule.scheduled(t)
    }

    // --- internals ---

    fn active_lock(&self, account: &Address, now: BlockStamp) -> BondResult<Lock> {
        let lock = self.locked(account);
        if lock.amount == 0 {
            return Err(StateError::NoLock.into());
        }
        if lock.end <= now.timestamp {
            return Err(StateError::LockExpired { end: lock.end }.into());
        }
        Ok(lock)
    }

    fn validate_unlock_time(&self, unlock_time: u64, now: BlockStamp) -> BondResult<u64> {
        let end = align_to_period(unlock_time);
        if end <= now.timestamp {
            return Err(InputError::UnlockTimeInPast { unlock_time: end, now: now.timestamp }.into());
        }
        let max = now.timestamp.saturating_add(MAX_LOCK_SECS);
        if end > max {
            return Err(InputError::UnlockTimeTooFar { unlock_time: end, max }.into());
        }
        Ok(end)
    }

    /// Interpolate the timestamp of `block` from the bracketing global
    /// checkpoints (or the last checkpoint and `now`).
    fn block_to_timestamp(&self, block: u64, now: BlockStamp) -> BondResult<Option<u64>> {
        if block > now.block {
            return Err(InputError::FutureBlock { block, current: now.block }.into());
        }
        let Some(index) = self.global.find_by_block(block) else {
            return Ok(None);
        };
        let Some(p0) = self.global.get(index) else {
            return Ok(None);
        };
        let (d_block, d_t) = match self.global.get(index + 1) {
            Some(p1) => (p1.blk - p0.blk, p1.ts - p0.ts),
            None => (now.block.saturating_sub(p0.blk), now.timestamp.saturating_sub(p0.ts)),
        };
        let mut block_time = p0.ts;
        if d_block != 0 {
            let offset = (d_t as u128 * (block - p0.blk) as u128 / d_block as u128) as u64;
            block_time += offset;
        }
        Ok(Some(block_time))
    }

    /// Bring the global line up to `now`, then apply one account's change.
    ///
    /// All fallible work happens before the first write.
    fn write_checkpoint(&mut self, change: Option<(&Address, &Lock, &Lock)>, now: BlockStamp) -> BondResult<()> {
        let account_points = match change {
            Some((_, old, new)) => Some((account_point(old, now)?, account_point(new, now)?)),
            None => None,
        };

        let last = self.global.last().copied().unwrap_or_else(|| Point::zero_at(now));
        let replay = replay_pending(last, now, &self.schedule);
        let mut point = replay.current;

        if let Some((u_old, u_new)) = account_points {
            point.slope = (point.slope + u_new.slope - u_old.slope).max(0);
            point.bias = (point.bias + u_new.bias - u_old.bias).max(0);
        }

        for crossed in replay.crossed {
            self.global.push(crossed);
        }
        self.global.push(point);

        if let (Some((account, old, new)), Some((u_old, u_new))) = (change, account_points) {
            if old.end > now.timestamp {
                self.schedule.unschedule(old.end, u_old.slope);
            }
            if new.end > now.timestamp {
                self.schedule.schedule(new.end, u_new.slope);
            }
            self.accounts.entry(*account).or_default().push(u_new);
        }
        Ok(())
    }
}
