//! Notifications emitted by state transitions, for off-chain observers.

use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::types::Address;

/// Which external collaborator was replaced.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collaborator {
    EmissionSource,
    UtilizationSource,
    RewardSink,
}

/// Which utilization lower bound was updated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundKind {
    System,
    Personal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BondingEvent {
    LockCreated { account: Address, amount: u128, unlock_time: u64, ts: u64 },
    LockIncreased { account: Address, funder: Address, amount: u128, total: u128, ts: u64 },
    UnlockTimeIncreased { account: Address, unlock_time: u64, ts: u64 },
    Withdrawn { account: Address, amount: u128, ts: u64 },
    RewardsClaimed { account: Address, recipient: Address, epoch: u64, amount: u128 },
    LowerBoundUpdated { kind: BoundKind, value: u64 },
    CollaboratorUpdated { kind: Collaborator },
    RoleGranted { role: Role, account: Address },
    RoleRevoked { role: Role, account: Address },
    Paused { by: Address },
    Unpaused { by: Address },
}

impl BondingEvent {
    /// JSON encoding used by log sinks.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
