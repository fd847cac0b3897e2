//! Default emission source: a flat per-epoch budget cut by a fixed share
//! every `reduction_cliff` epochs.
//!
//! budget(e) = emissions_per_epoch * (1 - reduction_bps / 10_000)^(e / cliff)

use serde::{Deserialize, Serialize};

use bond_core::constants::{
    DEFAULT_EMISSIONS_PER_EPOCH, DEFAULT_REDUCTION_BPS, DEFAULT_REDUCTION_CLIFF, RATIO_SCALE,
};
use bond_core::error::{BondResult, ConfigError, InputError};
use bond_core::traits::EmissionSource;

use crate::math::{fixed_pow, mul_div};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionSchedule {
    emissions_per_epoch: u128,
    reduction_cliff: u64,
    reduction_bps: u64,
}

impl EmissionSchedule {
    pub fn new(emissions_per_epoch: u128, reduction_cliff: u64, reduction_bps: u64) -> Result<Self, ConfigError> {
        if reduction_cliff == 0 {
            return Err(ConfigError::Load("reduction_cliff must be positive".into()));
        }
        if reduction_bps > RATIO_SCALE {
            return Err(ConfigError::Load(format!(
                "reduction_bps {reduction_bps} exceeds {RATIO_SCALE}"
            )));
        }
        Ok(Self { emissions_per_epoch, reduction_cliff, reduction_bps })
    }

    /// Budget that never decreases.
    pub fn flat(emissions_per_epoch: u128) -> Self {
        Self { emissions_per_epoch, reduction_cliff: 1, reduction_bps: 0 }
    }

    pub fn emissions_per_epoch(&self) -> u128 {
        self.emissions_per_epoch
    }

    pub fn reduction_cliff(&self) -> u64 {
        self.reduction_cliff
    }

    pub fn reduction_bps(&self) -> u64 {
        self.reduction_bps
    }

    /// Budget for `epoch` without the future-epoch guard.
    pub fn budget_for(&self, epoch: u64) -> BondResult<u128> {
        let cliffs = epoch / self.reduction_cliff;
        let scale = u128::from(RATIO_SCALE);
        let retention = scale - u128::from(self.reduction_bps);
        let factor = fixed_pow(retention, cliffs, scale)?;
        Ok(mul_div(self.emissions_per_epoch, factor, scale)?)
    }
}

impl Default for EmissionSchedule {
    fn default() -> Self {
        Self {
            emissions_per_epoch: DEFAULT_EMISSIONS_PER_EPOCH,
            reduction_cliff: DEFAULT_REDUCTION_CLIFF,
            reduction_bps: DEFAULT_REDUCTION_BPS,
        }
    }
}

impl EmissionSource for EmissionSchedule {
    fn gross_emission_budget(&self, epoch: u64, current_epoch: u64) -> BondResult<u128> {
        if epoch > current_epoch {
            return Err(InputError::FutureEpoch { epoch, current: current_epoch }.into());
        }
        self.budget_for(epoch)
    }
}
