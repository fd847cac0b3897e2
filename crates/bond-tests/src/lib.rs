//! Cross-crate test suite for trust bonding.
//!
//! Integration tests drive the escrow ledger, the emission engine and the
//! service together: the reference scenarios, claim idempotency, pause
//! behaviour, and randomized conservation and decay properties.

pub mod helpers;
