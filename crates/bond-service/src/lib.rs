//! # bond-service — Concurrency shell around the bonding engine.
//!
//! - [`service::BondingService`]: single writer over a `parking_lot::RwLock`,
//!   broadcasting engine events over `tokio::sync::broadcast`
//! - [`clock`]: wall clock (`chrono`) and a manual clock for tests
//! - [`config::ServiceConfig`]: TOML file plus `BOND_` environment overrides
//! - [`logging::init_logging`]: text or JSON `tracing` output

pub mod clock;
pub mod config;
pub mod logging;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use logging::init_logging;
pub use service::BondingService;
