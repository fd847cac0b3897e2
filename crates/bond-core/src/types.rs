//! Core protocol types: accounts, execution stamps, locks and decay lines.
//!
//! Token amounts are `u128` base units. Decay lines use signed `i128` so that
//! intermediate `bias - slope * dt` values can dip below zero before clamping.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::LOCK_PERIOD_SECS;
use crate::error::InputError;

/// A 20-byte account identifier. Text and serde forms are `0x`-prefixed hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid account or recipient.
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Reject the zero address.
    pub fn ensure_nonzero(&self) -> Result<(), InputError> {
        if self.is_zero() {
            return Err(InputError::ZeroAddress);
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Execution context of a call: wall-clock seconds and block height.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlockStamp {
    pub timestamp: u64,
    pub block: u64,
}

impl BlockStamp {
    pub fn new(timestamp: u64, block: u64) -> Self {
        Self { timestamp, block }
    }
}

/// Locked amount and aligned unlock time of one account.
///
/// `end == 0` means there is no active lock.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Lock {
    pub amount: u128,
    pub end: u64,
}

impl Lock {
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.end == 0
    }

    /// Whether the lock still contributes a bonded balance at `now`.
    pub fn is_active_at(&self, now: u64) -> bool {
        self.amount > 0 && self.end > now
    }
}

/// One linear segment of a decaying balance:
/// `balance(t) = max(0, bias - slope * (t - ts))`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Point {
    pub bias: i128,
    pub slope: i128,
    pub ts: u64,
    pub blk: u64,
}

impl Point {
    pub fn zero_at(stamp: BlockStamp) -> Self {
        Self { bias: 0, slope: 0, ts: stamp.timestamp, blk: stamp.block }
    }

    /// Evaluate the line at `t`, clamped at zero.
    ///
    /// Times before `ts` are evaluated at `ts`: a checkpoint never describes
    /// the balance before it was written.
    pub fn value_at(&self, t: u64) -> u128 {
        let dt = t.saturating_sub(self.ts) as i128;
        let value = self.bias.saturating_sub(self.slope.saturating_mul(dt));
        if value > 0 { value as u128 } else { 0 }
    }
}

/// Round a timestamp down to the lock period boundary.
///
/// # Examples
///
/// ```
/// use bond_core::types::align_to_period;
/// use bond_core::constants::LOCK_PERIOD_SECS;
/// assert_eq!(align_to_period(LOCK_PERIOD_SECS + 5), LOCK_PERIOD_SECS);
/// ```
pub fn align_to_period(t: u64) -> u64 {
    (t / LOCK_PERIOD_SECS) * LOCK_PERIOD_SECS
}

/// The three most recent epochs at which an account's utilization changed.
///
/// A zero pointer is indistinguishable from "active at epoch 0"; both resolve
/// to the cumulative value at epoch 0.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ActiveEpochPointers {
    pub last: u64,
    pub previous: u64,
    pub previous_previous: u64,
}

impl ActiveEpochPointers {
    pub fn new(last: u64, previous: u64, previous_previous: u64) -> Self {
        Self { last, previous, previous_previous }
    }

    /// Whether the account has ever recorded activity after epoch 0.
    pub fn never_active(&self) -> bool {
        self.last == 0 && self.previous == 0 && self.previous_previous == 0
    }

    /// Record activity at `epoch`, shifting older pointers down.
    pub fn record(&mut self, epoch: u64) {
        if epoch == self.last {
            return;
        }
        self.previous_previous = self.previous;
        self.previous = self.last;
        self.last = epoch;
    }
}
