//! Error types for the bonding protocol.
//!
//! Every failure is synchronous and leaves state untouched: validation always
//! runs before the first write.
use thiserror::Error;

/// Rejected arguments (zero address, zero amount, time in the future, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("zero address")] ZeroAddress,
    #[error("zero amount")] ZeroAmount,
    #[error("unlock time {unlock_time} is not after {now}")] UnlockTimeInPast { unlock_time: u64, now: u64 },
    #[error("unlock time {unlock_time} exceeds max {max}")] UnlockTimeTooFar { unlock_time: u64, max: u64 },
    #[error("lock duration {duration}s below minimum {min}s")] LockTooShort { duration: u64, min: u64 },
    #[error("epoch {epoch} is in the future (current {current})")] FutureEpoch { epoch: u64, current: u64 },
    #[error("block {block} is in the future (current {current})")] FutureBlock { block: u64, current: u64 },
}

/// Operation not allowed in the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("no lock for account")] NoLock,
    #[error("lock already exists")] LockExists,
    #[error("lock expired at {end}")] LockExpired { end: u64 },
    #[error("lock not expired until {end}")] LockNotExpired { end: u64 },
    #[error("unlock time {requested} not after current {current}")] UnlockTimeNotIncreased { requested: u64, current: u64 },
    #[error("rewards already claimed for epoch {epoch}")] AlreadyClaimed { epoch: u64 },
    #[error("nothing to claim for epoch {epoch}")] NothingToClaim { epoch: u64 },
    #[error("no rewards can be claimed during the first epoch")] FirstEpochClaim,
    #[error("paused")] Paused,
    #[error("not paused")] NotPaused,
    #[error("already paused")] AlreadyPaused,
    #[error("{account} lacks role {role}")] Unauthorized { account: String, role: String },
}

/// Privileged configuration outside its documented range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("lower bound {value} outside [{min}, {max}]")] LowerBoundOutOfRange { value: u64, min: u64, max: u64 },
    #[error("epoch length {0}s too short")] InvalidEpochLength(u64),
    #[error("config: {0}")] Load(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtilizationError {
    /// All three active-epoch pointers are at or after the queried epoch.
    #[error("utilization baseline untrackable for epoch {epoch}")] Untrackable { epoch: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BondError {
    #[error(transparent)] Input(#[from] InputError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Utilization(#[from] UtilizationError),
    #[error(transparent)] Arithmetic(#[from] ArithmeticError),
}

pub type BondResult<T> = Result<T, BondError>;
