//! Capability lookups consumed by the approval engine
//!
//! The engine never stores roles or permission strings itself. Whatever
//! directory the host application uses is wrapped in a [`PermissionOracle`].
use super::types::UserId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub trait PermissionOracle {
    /// Does `user` hold the capability named `capability`
    fn has_capability(&self, user: &UserId, capability: &str) -> bool;

    fn has_any_capability(&self, user: &UserId, capabilities: &[&str]) -> bool {
        capabilities
            .iter()
            .any(|capability| self.has_capability(user, capability))
    }

    fn has_all_capabilities(&self, user: &UserId, capabilities: &[&str]) -> bool {
        capabilities
            .iter()
            .all(|capability| self.has_capability(user, capability))
    }
}

impl<T: PermissionOracle + ?Sized> PermissionOracle for &T {
    fn has_capability(&self, user: &UserId, capability: &str) -> bool {
        (**self).has_capability(user, capability)
    }
}

impl<T: PermissionOracle + ?Sized> PermissionOracle for Arc<T> {
    fn has_capability(&self, user: &UserId, capability: &str) -> bool {
        (**self).has_capability(user, capability)
    }
}

/// In-memory grant table, useful for tests and for hosts that load grants up front
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    grants: HashMap<UserId, HashSet<String>>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn grant(mut self, user: &UserId, capability: &str) -> Self {
        self.insert(user, capability);
        self
    }
    pub fn insert(&mut self, user: &UserId, capability: &str) {
        self.grants
            .entry(user.clone())
            .or_default()
            .insert(capability.to_string());
    }
    pub fn revoke(&mut self, user: &UserId, capability: &str) -> bool {
        self.grants
            .get_mut(user)
            .map(|held| held.remove(capability))
            .unwrap_or(false)
    }
}

impl PermissionOracle for CapabilityTable {
    fn has_capability(&self, user: &UserId, capability: &str) -> bool {
        self.grants
            .get(user)
            .is_some_and(|held| held.contains(capability))
    }
}
