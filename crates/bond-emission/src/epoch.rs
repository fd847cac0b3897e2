//! Epoch arithmetic and the engine-owned epoch configuration.
//!
//! Epoch `e` spans `[start + e * length, start + (e + 1) * length)`. Balances
//! "at the end" of an epoch are sampled [`EPOCH_END_OFFSET_SECS`] before the
//! nominal boundary.

use serde::{Deserialize, Serialize};

use bond_core::constants::{
    DEFAULT_EPOCH_LENGTH_SECS, DEFAULT_PERSONAL_LOWER_BOUND, DEFAULT_SYSTEM_LOWER_BOUND, EPOCH_END_OFFSET_SECS,
    MIN_EPOCH_LENGTH_SECS, MIN_PERSONAL_LOWER_BOUND, MIN_SYSTEM_LOWER_BOUND, RATIO_SCALE, SECONDS_PER_YEAR,
};
use bond_core::error::ConfigError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochConfig {
    start_timestamp: u64,
    epoch_length: u64,
    system_lower_bound: u64,
    personal_lower_bound: u64,
}

impl EpochConfig {
    /// Epoch schedule starting at `start_timestamp` with default lower bounds.
    pub fn new(start_timestamp: u64, epoch_length: u64) -> Result<Self, ConfigError> {
        if epoch_length < MIN_EPOCH_LENGTH_SECS {
            return Err(ConfigError::InvalidEpochLength(epoch_length));
        }
        Ok(Self {
            start_timestamp,
            epoch_length,
            system_lower_bound: DEFAULT_SYSTEM_LOWER_BOUND,
            personal_lower_bound: DEFAULT_PERSONAL_LOWER_BOUND,
        })
    }

    /// Builder-style variant of [`new`](Self::new) that also sets both bounds.
    pub fn with_bounds(mut self, system: u64, personal: u64) -> Result<Self, ConfigError> {
        self.set_system_lower_bound(system)?;
        self.set_personal_lower_bound(personal)?;
        Ok(self)
    }

    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    pub fn epoch_length(&self) -> u64 {
        self.epoch_length
    }

    pub fn system_lower_bound(&self) -> u64 {
        self.system_lower_bound
    }

    pub fn personal_lower_bound(&self) -> u64 {
        self.personal_lower_bound
    }

    pub fn set_system_lower_bound(&mut self, value: u64) -> Result<(), ConfigError> {
        check_bound(value, MIN_SYSTEM_LOWER_BOUND)?;
        self.system_lower_bound = value;
        Ok(())
    }

    pub fn set_personal_lower_bound(&mut self, value: u64) -> Result<(), ConfigError> {
        check_bound(value, MIN_PERSONAL_LOWER_BOUND)?;
        self.personal_lower_bound = value;
        Ok(())
    }

    /// Epoch containing `t`; 0 for times before the schedule starts.
    ///
    /// # Examples
    ///
    /// ```
    /// use bond_emission::epoch::EpochConfig;
    /// let cfg = EpochConfig::new(1_000, 86_400).unwrap();
    /// assert_eq!(cfg.epoch_at_timestamp(0), 0);
    /// assert_eq!(cfg.epoch_at_timestamp(1_000 + 86_400), 1);
    /// ```
    pub fn epoch_at_timestamp(&self, t: u64) -> u64 {
        t.saturating_sub(self.start_timestamp) / self.epoch_length
    }

    pub fn current_epoch(&self, now: u64) -> u64 {
        self.epoch_at_timestamp(now)
    }

    pub fn previous_epoch(&self, now: u64) -> u64 {
        self.current_epoch(now).saturating_sub(1)
    }

    /// Sampling time for balances "at the end" of `epoch`.
    pub fn epoch_timestamp_end(&self, epoch: u64) -> u64 {
        let nominal = self
            .start_timestamp
            .saturating_add(epoch.saturating_add(1).saturating_mul(self.epoch_length));
        nominal - EPOCH_END_OFFSET_SECS
    }

    /// First second of `epoch`.
    pub fn epoch_timestamp_start(&self, epoch: u64) -> u64 {
        self.start_timestamp.saturating_add(epoch.saturating_mul(self.epoch_length))
    }

    pub fn epochs_per_year(&self) -> u64 {
        SECONDS_PER_YEAR / self.epoch_length
    }
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            start_timestamp: 0,
            epoch_length: DEFAULT_EPOCH_LENGTH_SECS,
            system_lower_bound: DEFAULT_SYSTEM_LOWER_BOUND,
            personal_lower_bound: DEFAULT_PERSONAL_LOWER_BOUND,
        }
    }
}

fn check_bound(value: u64, min: u64) -> Result<(), ConfigError> {
    if !(min..=RATIO_SCALE).contains(&value) {
        return Err(ConfigError::LowerBoundOutOfRange { value, min, max: RATIO_SCALE });
    }
    Ok(())
}
