//! # bond-core
//! Foundation types, errors and collaborator traits for the bonding protocol.

pub mod access;
pub mod constants;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
