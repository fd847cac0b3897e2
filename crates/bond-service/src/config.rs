//! Service configuration.
//!
//! Loaded with the `config` crate from an optional TOML file, then overridden
//! by `BOND_`-prefixed environment variables (`BOND_EPOCH_LENGTH_SECS=86400`).
//! Validation turns the raw values into the typed parameters of the engine.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing_subscriber::util::TryInitError;

use bond_core::constants::{
    DEFAULT_EPOCH_LENGTH_SECS, DEFAULT_PERSONAL_LOWER_BOUND, DEFAULT_REDUCTION_BPS, DEFAULT_REDUCTION_CLIFF,
    DEFAULT_SYSTEM_LOWER_BOUND, TOKEN,
};
use bond_core::error::ConfigError;
use bond_core::types::Address;
use bond_emission::{EmissionSchedule, EpochConfig};
use bond_escrow::LedgerParams;

use crate::clock::SystemClock;
use crate::logging;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "BOND";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Hex address granted every role at startup.
    pub admin: String,
    /// Timestamp at which epoch 0 starts.
    pub epoch_start: u64,
    pub epoch_length_secs: u64,
    pub system_lower_bound: u64,
    pub personal_lower_bound: u64,
    /// Shortest accepted lock duration. Follows `epoch_length_secs` when unset.
    pub min_lock_secs: Option<u64>,
    /// Gross budget per epoch, in whole tokens.
    pub emissions_per_epoch_tokens: u64,
    pub reduction_cliff: u64,
    pub reduction_bps: u64,
    /// Average block time used by the system clock to derive block numbers.
    pub block_time_secs: u64,
    /// Log level filter string (e.g. "info", "bond_escrow=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    /// Capacity of the notification broadcast channel.
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            admin: String::new(),
            epoch_start: 0,
            epoch_length_secs: DEFAULT_EPOCH_LENGTH_SECS,
            system_lower_bound: DEFAULT_SYSTEM_LOWER_BOUND,
            personal_lower_bound: DEFAULT_PERSONAL_LOWER_BOUND,
            min_lock_secs: None,
            emissions_per_epoch_tokens: 1_000_000,
            reduction_cliff: DEFAULT_REDUCTION_CLIFF,
            reduction_bps: DEFAULT_REDUCTION_BPS,
            block_time_secs: 12,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            event_capacity: 1024,
        }
    }
}

impl ServiceConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Load from `path` (if given) and `env` instead of the process
    /// environment when `env` is `Some`.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true)
                .source(env),
        );
        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every derived parameter without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.admin_address()?;
        self.epoch_config()?;
        self.emission_schedule()?;
        if self.block_time_secs == 0 {
            return Err(ConfigError::Load("block_time_secs must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Load("event_capacity must be positive".into()));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(ConfigError::Load(format!("unknown log format {:?}", self.log_format)));
        }
        Ok(())
    }

    pub fn admin_address(&self) -> Result<Address, ConfigError> {
        let admin: Address = self
            .admin
            .parse()
            .map_err(|e| ConfigError::Load(format!("admin {:?}: {e}", self.admin)))?;
        admin
            .ensure_nonzero()
            .map_err(|_| ConfigError::Load("admin must not be the zero address".into()))?;
        Ok(admin)
    }

    pub fn epoch_config(&self) -> Result<EpochConfig, ConfigError> {
        EpochConfig::new(self.epoch_start, self.epoch_length_secs)?
            .with_bounds(self.system_lower_bound, self.personal_lower_bound)
    }

    pub fn ledger_params(&self) -> LedgerParams {
        LedgerParams { min_lock_secs: self.min_lock_secs.unwrap_or(self.epoch_length_secs) }
    }

    /// Wall clock starting now at block 0, ticking at `block_time_secs`.
    pub fn system_clock(&self) -> SystemClock {
        SystemClock::starting_now(self.block_time_secs)
    }

    /// Install the global subscriber from `log_level` and `log_format`.
    pub fn init_logging(&self) -> Result<(), TryInitError> {
        logging::init_logging(&self.log_level, &self.log_format)
    }

    pub fn emission_schedule(&self) -> Result<EmissionSchedule, ConfigError> {
        let per_epoch = u128::from(self.emissions_per_epoch_tokens) * TOKEN;
        EmissionSchedule::new(per_epoch, self.reduction_cliff, self.reduction_bps)
    }
}
