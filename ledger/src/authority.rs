//! # Capability Authority
//!
//! The ledger never stores role membership itself. It asks a
//! [`CapabilityAuthority`] whether a principal holds a capability before
//! every privileged operation, and asks it to record the initial grants
//! during `initialize`.
//!
//! [`InMemoryAuthority`] is the reference implementation used by tests and
//! the operator CLI.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::types::{Capability, Principal};

/// Answers "does principal P hold capability C?".
pub trait CapabilityAuthority: Send + Sync {
    /// Membership check.
    fn has_capability(&self, capability: Capability, principal: &Principal) -> bool;

    /// Records a grant. Granting twice is a no-op.
    fn grant(&self, capability: Capability, principal: &Principal);
}

/// Capability membership held in a process-local set.
#[derive(Debug, Default)]
pub struct InMemoryAuthority {
    grants: RwLock<HashSet<(Capability, Principal)>>,
}

impl InMemoryAuthority {
    /// Creates an authority with no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a grant. Returns `true` if it existed.
    pub fn revoke(&self, capability: Capability, principal: &Principal) -> bool {
        self.grants.write().remove(&(capability, principal.clone()))
    }

    /// All principals holding `capability`, sorted.
    pub fn holders(&self, capability: Capability) -> Vec<Principal> {
        let mut holders: Vec<Principal> = self
            .grants
            .read()
            .iter()
            .filter(|(c, _)| *c == capability)
            .map(|(_, p)| p.clone())
            .collect();
        holders.sort();
        holders
    }
}

impl CapabilityAuthority for InMemoryAuthority {
    fn has_capability(&self, capability: Capability, principal: &Principal) -> bool {
        self.grants.read().contains(&(capability, principal.clone()))
    }

    fn grant(&self, capability: Capability, principal: &Principal) {
        self.grants.write().insert((capability, principal.clone()));
    }
}
