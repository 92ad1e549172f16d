//! # CRM Access Core
//!
//! This crate provides the access-control core of a multi-tenant CRM
//! administrative application: element-level permission evaluation with
//! verdict caching and override fallback, plus super-admin impersonation
//! sessions with a size-bounded action log flushed to an audit sink.
//!
//! ## Features
//!
//! - Hierarchical element-path matching, most-specific pattern first
//! - Scope constraints (tenant, department, role, record ownership,
//!   custom predicates)
//! - Fail-safe deny: malformed input and backend faults never grant
//! - TTL-bounded verdict cache with per-actor invalidation
//! - Per-actor grant/deny overrides with expiry for the no-match case
//! - Impersonation sessions persisted to a per-tab store, restored on
//!   reload, expired lazily against an injected clock
//! - Append-only per-session action log with ring-buffer bounds
//! - Pluggable stores and audit sink, with in-memory implementations
//!
//! ## Quick Start
//!
//! ```rust
//! use crm_access::{
//!     Action, EvaluationContext, MemoryOverrideStore, MemoryRoleStore, Permission,
//!     PermissionEvaluator, RoleAssignment,
//! };
//!
//! // Wire the evaluator to the role and override stores.
//! let roles = MemoryRoleStore::new();
//! roles.assign(RoleAssignment::new("agent", "user1", Some("tenant1".to_string())));
//! roles.grant("agent", Permission::new("crm:contacts:*"));
//!
//! let evaluator = PermissionEvaluator::new(roles, MemoryOverrideStore::new());
//!
//! // Guards ask before rendering an element.
//! let ctx = EvaluationContext::new("user1").with_tenant("tenant1");
//! assert!(evaluator.evaluate("crm:contacts:list", Action::Visible, &ctx));
//! assert!(!evaluator.evaluate("crm:billing:invoices", Action::Visible, &ctx));
//! ```
//!
//! ## Impersonation
//!
//! ```rust
//! use crm_access::{
//!     ActionTracker, ImpersonationSession, ImpersonationSessionManager, MemoryAuditSink,
//!     MemorySessionStore,
//! };
//! use std::sync::Arc;
//!
//! let tracker = Arc::new(ActionTracker::new());
//! let sink = Arc::new(MemoryAuditSink::new());
//! let manager =
//!     ImpersonationSessionManager::new(MemorySessionStore::new(), sink.clone(), tracker);
//!
//! let session = ImpersonationSession::new("s1", "admin1", "u1", "t1")
//!     .with_reason("support ticket #441");
//! manager.start(session)?;
//!
//! manager.tracker().track_page_view("s1", "crm:contacts")?;
//! manager.end();
//!
//! assert_eq!(sink.len(), 1);
//! # Ok::<(), crm_access::Error>(())
//! ```
//!
//! ## Logging
//!
//! Security-relevant events go through the standard `log` facade: session
//! lifecycle at info, absorbed backend faults and purges at warn, verdicts
//! at debug. Configure via any `log` backend, e.g. `RUST_LOG=crm_access=debug`
//! with `env_logger`.

pub mod action;
pub mod audit;
pub mod cache;
pub mod clock;
pub mod context;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod overrides;
pub mod permission;
pub mod session;
pub mod storage;
pub mod tracker;

// Re-export main types for convenience
pub use crate::{
    action::Action,
    audit::{AuditEntry, AuditSink, FailingAuditSink, LogAuditSink, MemoryAuditSink},
    cache::{CacheEntry, CacheKey, PermissionCache},
    clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock},
    context::EvaluationContext,
    element::ElementPath,
    error::Error,
    evaluator::{EvaluatorConfig, PermissionEvaluator},
    metrics::{AccessMetrics, MetricsSummary},
    overrides::{OverrideEffect, OverrideResolver, PermissionOverride},
    permission::{Permission, RoleAssignment, Scope, ScopePredicate, TenantMatch},
    session::{ImpersonationSession, ImpersonationSessionManager, SessionConfig, SessionRecord},
    storage::{
        MemoryOverrideStore, MemoryRoleStore, MemorySessionStore, OverrideStore, RoleStore,
        SessionStore,
    },
    tracker::{ActionTracker, ActionType, ImpersonationAction, DEFAULT_ACTION_CAP},
};
