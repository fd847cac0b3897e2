//! Role-based authorization for privileged entry points.
//!
//! Each privileged operation is gated by exactly one [`Role`]. Only an
//! [`Role::Admin`] can grant or revoke roles.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::types::Address;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Replaces collaborators and manages roles.
    Admin,
    /// Updates utilization lower bounds.
    Controller,
    /// Pauses and unpauses mutations.
    Pauser,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Controller => "controller",
            Self::Pauser => "pauser",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    members: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    /// Access control with `admin` holding every role.
    pub fn with_admin(admin: Address) -> Self {
        let mut acl = Self::default();
        for role in [Role::Admin, Role::Controller, Role::Pauser] {
            acl.members.entry(role).or_default().insert(admin);
        }
        acl
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(account))
    }

    pub fn ensure_role(&self, role: Role, account: &Address) -> Result<(), StateError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(StateError::Unauthorized { account: account.to_string(), role: role.to_string() })
        }
    }

    /// Returns `false` if `account` already held the role.
    pub fn grant(&mut self, caller: &Address, role: Role, account: Address) -> Result<bool, StateError> {
        self.ensure_role(Role::Admin, caller)?;
        Ok(self.members.entry(role).or_default().insert(account))
    }

    /// Returns `false` if `account` did not hold the role.
    pub fn revoke(&mut self, caller: &Address, role: Role, account: &Address) -> Result<bool, StateError> {
        self.ensure_role(Role::Admin, caller)?;
        Ok(self.members.get_mut(&role).is_some_and(|set| set.remove(account)))
    }
}
