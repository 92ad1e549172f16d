//! Interfaces to the external stores the core reads, plus in-memory
//! implementations for tests and backend-less embedding.

use crate::{
    error::Result,
    overrides::PermissionOverride,
    permission::{Permission, RoleAssignment},
};
use dashmap::DashMap;
use std::sync::Arc;

/// Read access to the role/permission assignment store.
///
/// Failures are absorbed by the evaluator and treated as "no permissions
/// resolved"; implementations should not panic.
pub trait RoleStore: Send + Sync {
    /// Resolve the role assignments an actor holds, optionally narrowed to
    /// a tenant.
    fn resolve_roles(
        &self,
        actor_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<RoleAssignment>>;

    /// Resolve the permissions granted by a set of roles.
    fn resolve_permissions(&self, role_ids: &[String]) -> Result<Vec<Permission>>;
}

/// Read access to the per-actor override store.
pub trait OverrideStore: Send + Sync {
    /// Look up all overrides for an actor on a concrete resource path.
    fn lookup_overrides(
        &self,
        actor_id: &str,
        resource: &str,
    ) -> Result<Vec<PermissionOverride>>;
}

/// The durable per-tab key/value store the session manager persists into.
pub trait SessionStore: Send + Sync {
    /// Read the value under a key.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value under a key.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory role store keyed by actor id.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoleStore {
    assignments: Arc<DashMap<String, Vec<RoleAssignment>>>,
    permissions: Arc<DashMap<String, Vec<Permission>>>,
}

impl MemoryRoleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an actor to a role within a tenant.
    pub fn assign(&self, assignment: RoleAssignment) {
        self.assignments
            .entry(assignment.actor_id.clone())
            .or_default()
            .push(assignment);
    }

    /// Attach a permission to a role.
    pub fn grant(&self, role_id: impl Into<String>, permission: Permission) {
        self.permissions
            .entry(role_id.into())
            .or_default()
            .push(permission);
    }

    /// Drop every assignment an actor holds.
    pub fn revoke_all(&self, actor_id: &str) {
        self.assignments.remove(actor_id);
    }
}

impl RoleStore for MemoryRoleStore {
    fn resolve_roles(
        &self,
        actor_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<RoleAssignment>> {
        let assignments = match self.assignments.get(actor_id) {
            Some(assignments) => assignments
                .iter()
                .filter(|a| match (tenant_id, a.tenant_id.as_deref()) {
                    // A tenant-less assignment applies everywhere.
                    (_, None) => true,
                    (Some(wanted), Some(bound)) => wanted == bound,
                    (None, Some(_)) => false,
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(assignments)
    }

    fn resolve_permissions(&self, role_ids: &[String]) -> Result<Vec<Permission>> {
        let mut permissions = Vec::new();
        for role_id in role_ids {
            if let Some(granted) = self.permissions.get(role_id) {
                for permission in granted.iter() {
                    if !permissions.contains(permission) {
                        permissions.push(permission.clone());
                    }
                }
            }
        }
        Ok(permissions)
    }
}

/// In-memory override store keyed by `(actor, resource)`.
#[derive(Debug, Default, Clone)]
pub struct MemoryOverrideStore {
    overrides: Arc<DashMap<(String, String), Vec<PermissionOverride>>>,
}

impl MemoryOverrideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an override.
    pub fn add(&self, permission_override: PermissionOverride) {
        let key = (
            permission_override.actor_id.clone(),
            permission_override.resource.clone(),
        );
        self.overrides.entry(key).or_default().push(permission_override);
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn lookup_overrides(
        &self,
        actor_id: &str,
        resource: &str,
    ) -> Result<Vec<PermissionOverride>> {
        let key = (actor_id.to_string(), resource.to_string());
        Ok(self
            .overrides
            .get(&key)
            .map(|overrides| overrides.clone())
            .unwrap_or_default())
    }
}

/// In-memory key/value store standing in for the per-tab store.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    values: Arc<DashMap<String, String>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) struct FailingOverrideStore;

#[cfg(test)]
impl OverrideStore for FailingOverrideStore {
    fn lookup_overrides(
        &self,
        _actor_id: &str,
        _resource: &str,
    ) -> Result<Vec<PermissionOverride>> {
        Err(crate::error::Error::Storage(
            "override backend unreachable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_role_store_tenant_filtering() {
        let store = MemoryRoleStore::new();
        store.assign(RoleAssignment::new("agent", "u1", Some("t1".to_string())));
        store.assign(RoleAssignment::new("admin", "u1", None));
        store.assign(RoleAssignment::new("agent", "u1", Some("t2".to_string())));

        let in_t1 = store.resolve_roles("u1", Some("t1")).unwrap();
        let ids: Vec<_> = in_t1.iter().map(|a| a.role_id.as_str()).collect();
        assert_eq!(ids, vec!["agent", "admin"]);

        let anywhere = store.resolve_roles("u1", None).unwrap();
        assert_eq!(anywhere.len(), 1);
        assert_eq!(anywhere[0].role_id, "admin");

        assert!(store.resolve_roles("u2", Some("t1")).unwrap().is_empty());
    }

    #[test]
    fn test_memory_role_store_permission_dedup() {
        let store = MemoryRoleStore::new();
        let read = Permission::new("crm:contacts:*");
        store.grant("agent", read.clone());
        store.grant("manager", read.clone());
        store.grant("manager", Permission::new("crm:reports:*"));

        let permissions = store
            .resolve_permissions(&["agent".to_string(), "manager".to_string()])
            .unwrap();
        assert_eq!(permissions.len(), 2);
    }

    #[test]
    fn test_memory_session_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing an absent key is not an error.
        store.remove("k").unwrap();
    }
}
