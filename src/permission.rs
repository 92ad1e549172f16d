//! Permission definitions and scope constraints.

use crate::{
    context::EvaluationContext,
    element::pattern_matches,
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};

/// A permission grants access to every element whose candidate patterns
/// its name matches, provided the scope constraints hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Colon-delimited path pattern; segments may be `*`.
    name: String,
    /// Optional constraints narrowing where the permission applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<Scope>,
}

impl Permission {
    /// Create an unscoped permission from a pattern.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }

    /// Attach scope constraints to this permission.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Parse a permission pattern, rejecting malformed input.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::InvalidPath(
                "permission pattern cannot be empty".to_string(),
            ));
        }
        if pattern.contains('\0') {
            return Err(Error::InvalidPath(format!(
                "permission pattern cannot contain null characters: '{pattern}'"
            )));
        }
        if pattern.split(':').any(|s| s.trim().is_empty()) {
            return Err(Error::InvalidPath(format!(
                "permission pattern cannot contain empty segments: '{pattern}'"
            )));
        }
        Ok(Self::new(pattern))
    }

    /// The pattern this permission grants.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope constraints, if any.
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Check whether this permission's pattern matches a candidate.
    pub fn matches_candidate(&self, candidate: &str) -> bool {
        pattern_matches(&self.name, candidate)
    }

    /// Check whether this permission applies: the pattern matches the
    /// candidate and the scope constraints hold in the given context.
    pub fn grants(&self, candidate: &str, context: &EvaluationContext) -> bool {
        if !self.matches_candidate(candidate) {
            return false;
        }
        match &self.scope {
            Some(scope) => scope.satisfied_by(context),
            None => true,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl std::str::FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How a scope binds the permission to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TenantMatch {
    /// No tenant restriction.
    #[default]
    Any,
    /// The evaluation context must carry exactly this tenant.
    Exact(String),
}

/// A structured predicate restricting a permission beyond its pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopePredicate {
    /// The actor must own the record in context.
    RecordOwner,
    /// A named predicate registered on the evaluation context.
    Custom(String),
}

/// Constraints narrowing where a permission applies.
///
/// Empty department and role lists mean "unrestricted"; predicates must
/// all hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scope {
    /// Tenant restriction.
    #[serde(default)]
    tenant: TenantMatch,
    /// Allowed departments; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    departments: Vec<String>,
    /// Allowed role names; empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roles: Vec<String>,
    /// Additional predicates; all must hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    predicates: Vec<ScopePredicate>,
}

impl Scope {
    /// Create an empty (always satisfied) scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a specific tenant.
    pub fn for_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant = TenantMatch::Exact(tenant_id.into());
        self
    }

    /// Restrict to a department.
    pub fn for_department(mut self, department: impl Into<String>) -> Self {
        self.departments.push(department.into());
        self
    }

    /// Restrict to holders of a role.
    pub fn for_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Require a structured predicate.
    pub fn with_predicate(mut self, predicate: ScopePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Check whether every constraint holds in the given context.
    pub fn satisfied_by(&self, context: &EvaluationContext) -> bool {
        match &self.tenant {
            TenantMatch::Any => {}
            TenantMatch::Exact(tenant) => {
                if context.tenant_id() != Some(tenant.as_str()) {
                    return false;
                }
            }
        }

        if !self.departments.is_empty() {
            match context.department() {
                Some(department) if self.departments.iter().any(|d| d == department) => {}
                _ => return false,
            }
        }

        if !self.roles.is_empty() {
            let held = context
                .roles()
                .iter()
                .any(|role| self.roles.iter().any(|allowed| allowed == role));
            if !held {
                return false;
            }
        }

        self.predicates.iter().all(|predicate| match predicate {
            ScopePredicate::RecordOwner => context.actor_owns_record(),
            ScopePredicate::Custom(name) => context.evaluate_predicate(name),
        })
    }
}

/// A resolved binding of an actor to a role within a tenant.
///
/// Read-only input from the identity layer; the core never mutates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// The role the actor holds.
    pub role_id: String,
    /// The actor holding it.
    pub actor_id: String,
    /// The tenant the assignment is valid for.
    pub tenant_id: Option<String>,
}

impl RoleAssignment {
    /// Create a role assignment.
    pub fn new(
        role_id: impl Into<String>,
        actor_id: impl Into<String>,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            actor_id: actor_id.into(),
            tenant_id,
        }
    }
}
