//! Per-actor, per-resource permission overrides.
//!
//! Overrides resolve the "no pattern matched" case to an explicit grant or
//! deny. They are consulted strictly after role-based matching, so they
//! never widen or revoke what a role permission already decides.

use crate::{
    clock::{Clock, SharedClock},
    metrics::AccessMetrics,
    storage::OverrideStore,
};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Whether an override grants or denies access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideEffect {
    /// Resolve the no-match case to allowed.
    Grant,
    /// Resolve the no-match case to denied.
    Deny,
}

/// An explicit grant or deny for one actor on one concrete resource path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    /// Stable override id.
    pub id: String,
    /// The actor the override applies to.
    pub actor_id: String,
    /// The concrete element path it applies to.
    pub resource: String,
    /// Grant or deny.
    pub effect: OverrideEffect,
    /// When the override was issued; the most recent one wins.
    pub issued_at: DateTime<Utc>,
    /// Optional expiry; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl PermissionOverride {
    /// Create an override issued at the given instant.
    pub fn new(
        actor_id: impl Into<String>,
        resource: impl Into<String>,
        effect: OverrideEffect,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.into(),
            resource: resource.into(),
            effect,
            issued_at,
            expires_at: None,
        }
    }

    /// Set an expiry on the override.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check whether the override is live at the given instant.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Resolves the override fallback for an `(actor, path)` pair.
pub struct OverrideResolver<O: OverrideStore> {
    store: O,
    clock: SharedClock,
    metrics: Arc<AccessMetrics>,
}

impl<O: OverrideStore> OverrideResolver<O> {
    /// Create a resolver over the given store.
    pub fn new(store: O, clock: SharedClock, metrics: Arc<AccessMetrics>) -> Self {
        Self {
            store,
            clock,
            metrics,
        }
    }

    /// Look up the winning override effect, if any.
    ///
    /// Expired overrides are ignored; among the live ones the most recently
    /// issued wins. A store fault resolves to `None` so the caller falls
    /// through to deny.
    pub fn resolve(&self, actor_id: &str, resource: &str) -> Option<OverrideEffect> {
        let overrides = match self.store.lookup_overrides(actor_id, resource) {
            Ok(overrides) => overrides,
            Err(err) => {
                self.metrics.record_resolution_fault();
                warn!("override lookup failed for actor '{actor_id}' on '{resource}': {err}");
                return None;
            }
        };

        let now = self.clock.now();
        overrides
            .into_iter()
            .filter(|o| o.is_active_at(now))
            .max_by_key(|o| o.issued_at)
            .map(|o| o.effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::storage::MemoryOverrideStore;
    use chrono::Duration;

    fn resolver(
        store: MemoryOverrideStore,
        clock: Arc<ManualClock>,
    ) -> OverrideResolver<MemoryOverrideStore> {
        OverrideResolver::new(store, clock, Arc::new(AccessMetrics::new()))
    }

    #[test]
    fn test_absent_override_resolves_to_none() {
        let clock = Arc::new(ManualClock::starting_now());
        let resolver = resolver(MemoryOverrideStore::new(), clock);
        assert_eq!(resolver.resolve("u1", "crm:contacts:list"), None);
    }

    #[test]
    fn test_latest_issued_override_wins() {
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let store = MemoryOverrideStore::new();

        store.add(PermissionOverride::new(
            "u1",
            "crm:contacts:list",
            OverrideEffect::Grant,
            now - Duration::hours(2),
        ));
        store.add(PermissionOverride::new(
            "u1",
            "crm:contacts:list",
            OverrideEffect::Deny,
            now - Duration::hours(1),
        ));

        let resolver = resolver(store, clock);
        assert_eq!(
            resolver.resolve("u1", "crm:contacts:list"),
            Some(OverrideEffect::Deny)
        );
    }

    #[test]
    fn test_expired_override_is_ignored() {
        let clock = Arc::new(ManualClock::starting_now());
        let now = clock.now();
        let store = MemoryOverrideStore::new();

        store.add(
            PermissionOverride::new("u1", "crm:contacts:list", OverrideEffect::Grant, now)
                .expiring_at(now + Duration::minutes(30)),
        );

        let resolver = resolver(store, clock.clone());
        assert_eq!(
            resolver.resolve("u1", "crm:contacts:list"),
            Some(OverrideEffect::Grant)
        );

        clock.advance(Duration::minutes(30));
        assert_eq!(resolver.resolve("u1", "crm:contacts:list"), None);
    }

    #[test]
    fn test_store_fault_resolves_to_none() {
        let clock = Arc::new(ManualClock::starting_now());
        let metrics = Arc::new(AccessMetrics::new());
        let resolver = OverrideResolver::new(
            crate::storage::FailingOverrideStore,
            clock,
            metrics.clone(),
        );

        assert_eq!(resolver.resolve("u1", "crm:contacts:list"), None);
        assert_eq!(metrics.summary().resolution_faults, 1);
    }
}
