//! The hierarchical permission matching engine.
//!
//! `evaluate` never fails to the caller: malformed input and store faults
//! all resolve to a deny verdict, so a broken backend can only ever hide
//! UI elements, not expose them.

use crate::{
    action::Action,
    cache::{CacheKey, PermissionCache},
    clock::{system_clock, SharedClock},
    context::EvaluationContext,
    element::ElementPath,
    error::Result,
    metrics::AccessMetrics,
    overrides::{OverrideEffect, OverrideResolver},
    permission::Permission,
    storage::{MemoryOverrideStore, MemoryRoleStore, OverrideStore, RoleStore},
};
use chrono::Duration;
use log::{debug, warn};
use std::sync::Arc;

/// Configuration for the permission evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Module namespace prepended to un-namespaced element paths.
    pub namespace: String,
    /// Whether verdicts are memoized.
    pub enable_caching: bool,
    /// How long a memoized verdict stays valid.
    pub cache_ttl: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            namespace: "crm".to_string(),
            enable_caching: true,
            cache_ttl: Duration::minutes(5),
        }
    }
}

/// Element-level permission evaluator.
///
/// Candidate patterns are tried from most to least specific with OR
/// semantics across the actor's permission set; overrides are consulted
/// only when no pattern matched. That ordering is part of the contract:
/// an override resolves the no-match case and never revokes a role grant.
pub struct PermissionEvaluator<R = MemoryRoleStore, O = MemoryOverrideStore>
where
    R: RoleStore,
    O: OverrideStore,
{
    roles: R,
    overrides: OverrideResolver<O>,
    cache: PermissionCache,
    config: EvaluatorConfig,
    metrics: Arc<AccessMetrics>,
}

impl<R, O> PermissionEvaluator<R, O>
where
    R: RoleStore,
    O: OverrideStore,
{
    /// Create an evaluator with the default configuration and system clock.
    pub fn new(roles: R, overrides: O) -> Self {
        Self::with_config(roles, overrides, EvaluatorConfig::default(), system_clock())
    }

    /// Create an evaluator with explicit configuration and clock.
    pub fn with_config(
        roles: R,
        overrides: O,
        config: EvaluatorConfig,
        clock: SharedClock,
    ) -> Self {
        let metrics = Arc::new(AccessMetrics::new());
        Self {
            roles,
            overrides: OverrideResolver::new(overrides, clock.clone(), metrics.clone()),
            cache: PermissionCache::new(config.cache_ttl, clock, metrics.clone()),
            config,
            metrics,
        }
    }

    /// Decide whether `context.actor` may perform `action` on the element.
    pub fn evaluate(&self, element_path: &str, action: Action, context: &EvaluationContext) -> bool {
        let path = match ElementPath::parse(element_path, &self.config.namespace) {
            Ok(path) => path,
            Err(err) => {
                warn!("rejecting malformed element path '{element_path}': {err}");
                self.metrics.record_evaluation(false);
                return false;
            }
        };

        let key = CacheKey {
            actor_id: context.actor_id().to_string(),
            path: path.as_str().to_string(),
            action,
            context_fingerprint: context.fingerprint(),
        };

        if self.config.enable_caching {
            if let Some(verdict) = self.cache.get(&key) {
                self.metrics.record_evaluation(verdict);
                return verdict;
            }
        }

        let verdict = self.decide(&path, action, context);

        if self.config.enable_caching {
            self.cache.put(key, verdict);
        }
        self.metrics.record_evaluation(verdict);
        debug!(
            "permission {} for actor '{}' on '{}' action '{}'",
            if verdict { "GRANTED" } else { "DENIED" },
            context.actor_id(),
            path,
            action,
        );
        verdict
    }

    /// Remove every cached verdict for one actor.
    ///
    /// Call whenever the actor's role or permission assignment changes.
    pub fn invalidate_actor(&self, actor_id: &str) {
        self.cache.invalidate_actor(actor_id);
    }

    /// Remove all cached verdicts.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Evaluation metrics for this instance.
    pub fn metrics(&self) -> &AccessMetrics {
        &self.metrics
    }

    fn decide(&self, path: &ElementPath, action: Action, context: &EvaluationContext) -> bool {
        let permissions = self.resolve_permission_set(context);
        let candidates = path.candidates(action);

        for candidate in &candidates {
            for permission in &permissions {
                if permission.grants(candidate, context) {
                    return true;
                }
            }
        }

        match self.overrides.resolve(context.actor_id(), path.as_str()) {
            Some(OverrideEffect::Grant) => true,
            Some(OverrideEffect::Deny) => false,
            None => false,
        }
    }

    fn resolve_permission_set(&self, context: &EvaluationContext) -> Vec<Permission> {
        let assignments = self.absorb_fault(
            "role",
            context.actor_id(),
            self.roles.resolve_roles(context.actor_id(), context.tenant_id()),
        );
        if assignments.is_empty() {
            return Vec::new();
        }

        let role_ids: Vec<String> = assignments.into_iter().map(|a| a.role_id).collect();
        self.absorb_fault(
            "permission",
            context.actor_id(),
            self.roles.resolve_permissions(&role_ids),
        )
    }

    /// The one place resolution faults turn into fail-safe non-matches.
    fn absorb_fault<T>(&self, what: &str, actor_id: &str, result: Result<Vec<T>>) -> Vec<T> {
        match result {
            Ok(values) => values,
            Err(err) => {
                self.metrics.record_resolution_fault();
                warn!("{what} resolution failed for actor '{actor_id}', treating as empty: {err}");
                Vec::new()
            }
        }
    }
}
