//! # bond-escrow — Voting-escrow ledger of decaying bonded balances.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Checkpoint index**: append-only histories of decay lines with
//!   binary-search lookup by timestamp or block.
//! - **Slope schedule**: slopes that stop decaying at future lock-period
//!   boundaries, so the global line never has to visit every account.
//! - **Ledger**: locks, per-account and global checkpoints, and the
//!   replay of pending slope changes that precedes every mutation.

pub mod checkpoint;
pub mod ledger;
pub mod schedule;

pub use checkpoint::CheckpointHistory;
pub use ledger::{replay_pending, supply_at, EscrowLedger, LedgerParams, Replay};
pub use schedule::SlopeSchedule;
