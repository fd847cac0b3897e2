//! Protocol constants. All token amounts are in base units (1 TOKEN = 10^18).

pub const TOKEN: u128 = 1_000_000_000_000_000_000;

/// Denominator for every bounded ratio (basis points).
///
/// # Examples
///
/// ```
/// use bond_core::constants::RATIO_SCALE;
/// assert_eq!(RATIO_SCALE, 10_000);
/// ```
pub const RATIO_SCALE: u64 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Lock ends are aligned down to a multiple of this period (one week).
pub const LOCK_PERIOD_SECS: u64 = 7 * SECONDS_PER_DAY;

/// Longest allowed lock. A lock of `amount` decays at `amount / MAX_LOCK_SECS`
/// per second, so a maximal lock starts with a bonded balance close to `amount`.
pub const MAX_LOCK_SECS: u64 = 2 * SECONDS_PER_YEAR;

pub const DEFAULT_EPOCH_LENGTH_SECS: u64 = 2 * LOCK_PERIOD_SECS;

/// Shortest allowed epoch length accepted by configuration.
pub const MIN_EPOCH_LENGTH_SECS: u64 = SECONDS_PER_DAY;

/// Safety margin subtracted from the nominal end of an epoch when sampling
/// bonded balances "at epoch end".
pub const EPOCH_END_OFFSET_SECS: u64 = 20;

pub const MIN_SYSTEM_LOWER_BOUND: u64 = 4_000;
pub const MIN_PERSONAL_LOWER_BOUND: u64 = 2_500;
pub const DEFAULT_SYSTEM_LOWER_BOUND: u64 = 5_000;
pub const DEFAULT_PERSONAL_LOWER_BOUND: u64 = 3_000;

/// Fixed-point scale used when interpolating block numbers from timestamps.
pub const BLOCK_SLOPE_MULTIPLIER: i128 = 1_000_000_000_000_000_000;

/// Default emissions released per epoch before utilization gating.
pub const DEFAULT_EMISSIONS_PER_EPOCH: u128 = 1_000_000 * TOKEN;
/// Number of epochs between emission reductions.
pub const DEFAULT_REDUCTION_CLIFF: u64 = 26;
/// Emission reduction applied at each cliff, in basis points.
pub const DEFAULT_REDUCTION_BPS: u64 = 1_000;
