//! # bond-emission — Utilization-gated epoch emissions and reward claims.
//!
//! Wires the escrow ledger from bond-escrow to the collaborator traits in
//! bond-core:
//!
//! - **Epochs**: fixed-length windows with an end-of-epoch sampling offset.
//! - **Ratios**: system and personal utilization ratios bounded below by
//!   configurable lower bounds.
//! - **Baselines**: three-deep active-epoch pointers resolving the
//!   cumulative utilization an epoch is measured against.
//! - **Engine**: emissions per epoch, eligible rewards, write-once claims,
//!   pause and role-gated configuration.

pub mod claims;
pub mod engine;
pub mod epoch;
pub mod math;
pub mod ratio;
pub mod schedule;
pub mod utilization;

pub use engine::{BondingEngine, ClaimReceipt, Collaborators, UserApy, UserInfo};
pub use epoch::EpochConfig;
pub use schedule::EmissionSchedule;
pub use utilization::{resolve_baseline, UtilizationLedger};
