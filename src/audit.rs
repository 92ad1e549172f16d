//! Audit sink interface and reference implementations.
//!
//! The core produces one [`AuditEntry`] per ended impersonation session;
//! durable storage of entries belongs to the embedder.

use crate::{
    error::{Error, Result},
    session::ImpersonationSession,
    tracker::ImpersonationAction,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// The audit record handed to the sink when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// The session that ended.
    pub session: ImpersonationSession,
    /// Everything tracked during the session, in order.
    pub actions: Vec<ImpersonationAction>,
    /// When the session ended.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ended_at: DateTime<Utc>,
}

/// Durable storage of audit entries.
///
/// A failing sink must not prevent a session from ending; the session
/// manager logs the failure and completes the teardown regardless.
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: AuditEntry) -> Result<()>;
}

/// Sink that keeps entries in memory. Intended for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries appended so far.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().unwrap().clone()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Check whether no entries were appended.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().unwrap().push(entry);
        Ok(())
    }
}

/// Sink that writes a summary line to the log and discards the entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<()> {
        info!(
            "impersonation session '{}' ended: '{}' acted as '{}' in tenant '{}', {} action(s)",
            entry.session.id,
            entry.session.super_user_id,
            entry.session.impersonated_user_id,
            entry.session.tenant_id,
            entry.actions.len(),
        );
        Ok(())
    }
}

/// Sink that always fails. Intended for failure-path tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn append(&self, _entry: AuditEntry) -> Result<()> {
        Err(Error::Audit("audit backend unreachable".to_string()))
    }
}
