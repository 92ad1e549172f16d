//! Evaluation context carried into every permission check.
//!
//! The context is a closed structure: every field scope constraints can see
//! is enumerated here, so constraint evaluation is exhaustive. Custom
//! predicates are the one open point, registered by name as hooks.

use std::collections::HashMap;
use std::sync::Arc;

/// A named predicate evaluated against the context at check time.
pub type ContextPredicate = Arc<dyn Fn(&EvaluationContext) -> bool + Send + Sync>;

/// The context a permission check is evaluated in.
#[derive(Clone, Default)]
pub struct EvaluationContext {
    /// The actor the check is for.
    actor_id: String,
    /// Tenant the actor is operating in.
    tenant_id: Option<String>,
    /// Department of the actor, if known.
    department: Option<String>,
    /// Role names the actor holds, as reported by the identity layer.
    roles: Vec<String>,
    /// Concrete record the check concerns, if any.
    record_id: Option<String>,
    /// Owner of that record, if known.
    record_owner_id: Option<String>,
    /// Named custom predicates referenced by permission scopes.
    predicates: HashMap<String, ContextPredicate>,
}

impl EvaluationContext {
    /// Create a context for the given actor.
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            ..Default::default()
        }
    }

    /// Set the tenant the check runs under.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the actor's department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Add a role name the actor holds.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Set the record the check concerns.
    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Set the owner of the record the check concerns.
    pub fn with_record_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.record_owner_id = Some(owner_id.into());
        self
    }

    /// Register a named custom predicate.
    pub fn with_predicate<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EvaluationContext) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Get the actor id.
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Get the tenant id.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Get the department.
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Get the roles the actor holds.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Get the record id.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Get the record owner id.
    pub fn record_owner_id(&self) -> Option<&str> {
        self.record_owner_id.as_deref()
    }

    /// Check whether the actor owns the record in context.
    pub fn actor_owns_record(&self) -> bool {
        match &self.record_owner_id {
            Some(owner) => *owner == self.actor_id,
            None => false,
        }
    }

    /// Run a named custom predicate; an unregistered name is not satisfied.
    pub fn evaluate_predicate(&self, name: &str) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(self),
            None => false,
        }
    }

    /// Stable serialization of the identifying fields, used in cache keys.
    ///
    /// Predicates are intentionally excluded: they are resolved by name and
    /// must not make otherwise-identical contexts cache-distinct.
    pub fn fingerprint(&self) -> String {
        let mut roles = self.roles.clone();
        roles.sort();
        format!(
            "tenant={};dept={};roles={};record={};owner={}",
            self.tenant_id.as_deref().unwrap_or(""),
            self.department.as_deref().unwrap_or(""),
            roles.join(","),
            self.record_id.as_deref().unwrap_or(""),
            self.record_owner_id.as_deref().unwrap_or(""),
        )
    }
}

impl std::fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("actor_id", &self.actor_id)
            .field("tenant_id", &self.tenant_id)
            .field("department", &self.department)
            .field("roles", &self.roles)
            .field("record_id", &self.record_id)
            .field("record_owner_id", &self.record_owner_id)
            .field("predicate_count", &self.predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = EvaluationContext::new("u1")
            .with_tenant("t1")
            .with_department("sales")
            .with_role("agent")
            .with_record("c42")
            .with_record_owner("u1");

        assert_eq!(ctx.actor_id(), "u1");
        assert_eq!(ctx.tenant_id(), Some("t1"));
        assert_eq!(ctx.department(), Some("sales"));
        assert_eq!(ctx.roles(), &["agent".to_string()]);
        assert!(ctx.actor_owns_record());
    }

    #[test]
    fn test_ownership_requires_known_owner() {
        let ctx = EvaluationContext::new("u1").with_record("c42");
        assert!(!ctx.actor_owns_record());

        let other = EvaluationContext::new("u1")
            .with_record("c42")
            .with_record_owner("u2");
        assert!(!other.actor_owns_record());
    }

    #[test]
    fn test_fingerprint_is_role_order_independent() {
        let a = EvaluationContext::new("u1")
            .with_tenant("t1")
            .with_role("manager")
            .with_role("agent");
        let b = EvaluationContext::new("u1")
            .with_tenant("t1")
            .with_role("agent")
            .with_role("manager");

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_tenants() {
        let a = EvaluationContext::new("u1").with_tenant("t1");
        let b = EvaluationContext::new("u1").with_tenant("t2");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_unregistered_predicate_is_unsatisfied() {
        let ctx = EvaluationContext::new("u1");
        assert!(!ctx.evaluate_predicate("record-owner"));

        let ctx = ctx.with_predicate("record-owner", |c| c.actor_owns_record());
        assert!(!ctx.evaluate_predicate("record-owner"));

        let owning = EvaluationContext::new("u1")
            .with_record_owner("u1")
            .with_predicate("record-owner", |c| c.actor_owns_record());
        assert!(owning.evaluate_predicate("record-owner"));
    }
}
