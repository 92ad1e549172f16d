//! Impersonation session lifecycle.
//!
//! A platform operator temporarily acts as a tenant user. The session is
//! persisted to a per-tab store so a reload can restore it; the timeout is
//! a lazily-checked predicate over the injected clock, not a timer.

use crate::{
    audit::{AuditEntry, AuditSink},
    clock::{system_clock, Clock, SharedClock},
    error::{Error, Result},
    storage::{MemorySessionStore, SessionStore},
    tracker::ActionTracker,
};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// A super-admin acting as another user.
///
/// The four identifying fields must be non-empty; a session failing that
/// invariant is never persisted or activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationSession {
    /// Stable session id.
    pub id: String,
    /// The operator doing the impersonating.
    pub super_user_id: String,
    /// The user being impersonated.
    pub impersonated_user_id: String,
    /// The tenant the impersonated user belongs to.
    pub tenant_id: String,
    /// Support reason, kept for the audit record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ImpersonationSession {
    /// Create a session.
    pub fn new(
        id: impl Into<String>,
        super_user_id: impl Into<String>,
        impersonated_user_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            super_user_id: super_user_id.into(),
            impersonated_user_id: impersonated_user_id.into(),
            tenant_id: tenant_id.into(),
            reason: None,
        }
    }

    /// Attach a support reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check the identity-field invariant.
    pub fn validate(&self) -> Result<()> {
        for (value, field) in [
            (&self.id, "id"),
            (&self.super_user_id, "superUserId"),
            (&self.impersonated_user_id, "impersonatedUserId"),
            (&self.tenant_id, "tenantId"),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidSession(format!("{field} must be non-empty")));
            }
        }
        Ok(())
    }
}

/// The persisted `{session, startedAt}` record.
///
/// `startedAt` serializes as epoch milliseconds; the record must
/// round-trip exactly through serialize/deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The active session.
    pub session: ImpersonationSession,
    /// When impersonation started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
}

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session stays valid after `start`.
    pub timeout: Duration,
    /// The well-known key the record is persisted under.
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::hours(8),
            storage_key: "crm.impersonation.session".to_string(),
        }
    }
}

/// Owns the start / restore / validity / end lifecycle.
///
/// State machine: `NoSession -> Active -> (Ended | Expired)`. Expiry is
/// detected lazily on the next read; `end` is idempotent. Dependency
/// faults (store, sink) are absorbed and logged so a broken backend can
/// never leave a caller stuck impersonating.
pub struct ImpersonationSessionManager<S = MemorySessionStore>
where
    S: SessionStore,
{
    store: S,
    sink: Arc<dyn AuditSink>,
    tracker: Arc<ActionTracker>,
    clock: SharedClock,
    config: SessionConfig,
    active: RwLock<Option<SessionRecord>>,
}

impl<S> ImpersonationSessionManager<S>
where
    S: SessionStore,
{
    /// Create a manager with the default configuration and system clock.
    pub fn new(store: S, sink: Arc<dyn AuditSink>, tracker: Arc<ActionTracker>) -> Self {
        Self::with_config(store, sink, tracker, SessionConfig::default(), system_clock())
    }

    /// Create a manager with explicit configuration and clock.
    pub fn with_config(
        store: S,
        sink: Arc<dyn AuditSink>,
        tracker: Arc<ActionTracker>,
        config: SessionConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            sink,
            tracker,
            clock,
            config,
            active: RwLock::new(None),
        }
    }

    /// The tracker collecting actions for the active session.
    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Begin impersonating.
    ///
    /// Rejects sessions with empty identity fields; a previously active
    /// session is replaced (same single storage slot, no audit record —
    /// only `end` audits). Only validation errors propagate.
    pub fn start(&self, session: ImpersonationSession) -> Result<()> {
        session.validate()?;

        let record = SessionRecord {
            session,
            started_at: self.clock.now(),
        };
        self.persist(&record);

        info!(
            "impersonation started: '{}' acting as '{}' in tenant '{}'",
            record.session.super_user_id,
            record.session.impersonated_user_id,
            record.session.tenant_id,
        );
        *self.active.write().unwrap() = Some(record);
        Ok(())
    }

    /// Restore a persisted session after a reload.
    ///
    /// A missing, malformed, invalid, or expired record leaves the manager
    /// at `NoSession`; corruption is purged and logged, never propagated.
    pub fn restore(&self) -> Option<ImpersonationSession> {
        let raw = match self.store.get(&self.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("session store read failed, treating as no session: {err}");
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!("purging unparsable persisted session: {err}");
                self.purge_stored();
                return None;
            }
        };

        if let Err(err) = record.session.validate() {
            warn!("purging structurally invalid persisted session: {err}");
            self.purge_stored();
            return None;
        }

        let elapsed = self.clock.now() - record.started_at;
        if elapsed >= self.config.timeout {
            info!(
                "persisted impersonation session '{}' expired after {}s, purging",
                record.session.id,
                elapsed.num_seconds(),
            );
            self.purge_stored();
            return None;
        }

        let session = record.session.clone();
        *self.active.write().unwrap() = Some(record);
        Some(session)
    }

    /// Check whether a session is active and inside its timeout window.
    ///
    /// Pure: never mutates state, so guards can call it freely.
    pub fn is_valid(&self) -> bool {
        match self.active.read().unwrap().as_ref() {
            Some(record) => self.clock.now() - record.started_at < self.config.timeout,
            None => false,
        }
    }

    /// Time left in the session window, `None` when no valid session.
    pub fn remaining_time(&self) -> Option<Duration> {
        let guard = self.active.read().unwrap();
        let record = guard.as_ref()?;
        let elapsed = self.clock.now() - record.started_at;
        if elapsed < self.config.timeout {
            Some(self.config.timeout - elapsed)
        } else {
            None
        }
    }

    /// The active session, if still valid.
    ///
    /// This is the lazy timeout-detection site: an expired session found
    /// here is purged before reporting absence.
    pub fn session_details(&self) -> Option<ImpersonationSession> {
        if self.is_valid() {
            return self
                .active
                .read()
                .unwrap()
                .as_ref()
                .map(|record| record.session.clone());
        }

        let expired = self.active.write().unwrap().take();
        if let Some(record) = expired {
            info!(
                "impersonation session '{}' timed out, purging",
                record.session.id
            );
            self.purge_stored();
        }
        None
    }

    /// End impersonation.
    ///
    /// Flushes `{session, actions}` to the audit sink, clears the tracked
    /// actions and the persisted record, and returns to `NoSession`.
    /// Idempotent: ending with no active session is not an error, and a
    /// failing sink never prevents the session from ending.
    pub fn end(&self) {
        let record = self.active.write().unwrap().take();

        if let Some(record) = record {
            let entry = AuditEntry {
                actions: self.tracker.actions(&record.session.id),
                ended_at: self.clock.now(),
                session: record.session,
            };
            let session_id = entry.session.id.clone();

            if let Err(err) = self.sink.append(entry) {
                warn!("audit sink rejected entry for session '{session_id}': {err}");
            }
            self.tracker.clear(&session_id);
            info!("impersonation session '{session_id}' ended");
        }

        self.purge_stored();
    }

    fn persist(&self, record: &SessionRecord) {
        let serialized = match serde_json::to_string(record) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize session record: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(&self.config.storage_key, &serialized) {
            warn!("failed to persist session record: {err}");
        }
    }

    fn purge_stored(&self) {
        if let Err(err) = self.store.remove(&self.config.storage_key) {
            warn!("failed to purge persisted session: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{FailingAuditSink, MemoryAuditSink};
    use crate::clock::ManualClock;

    fn manager(
        clock: Arc<ManualClock>,
    ) -> (
        MemorySessionStore,
        MemoryAuditSink,
        ImpersonationSessionManager,
    ) {
        let store = MemorySessionStore::new();
        let sink = MemoryAuditSink::new();
        let tracker = Arc::new(ActionTracker::with_clock(clock.clone(), 1000));
        let manager = ImpersonationSessionManager::with_config(
            store.clone(),
            Arc::new(sink.clone()),
            tracker,
            SessionConfig::default(),
            clock,
        );
        (store, sink, manager)
    }

    fn session() -> ImpersonationSession {
        ImpersonationSession::new("s1", "admin1", "u1", "t1").with_reason("support ticket #441")
    }

    #[test]
    fn test_start_validates_identity_fields() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock);

        let invalid = ImpersonationSession::new("s1", "", "u1", "t1");
        let err = manager.start(invalid).unwrap_err();
        assert!(err.to_string().contains("superUserId"));

        assert!(!manager.is_valid());
        assert!(store.is_empty());
    }

    #[test]
    fn test_start_then_valid_with_remaining_time() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock);

        manager.start(session()).unwrap();
        assert!(manager.is_valid());
        assert_eq!(store.len(), 1);

        let remaining = manager.remaining_time().unwrap();
        assert!(remaining > Duration::zero());
        assert!(remaining <= Duration::hours(8));
    }

    #[test]
    fn test_validity_boundary() {
        let clock = Arc::new(ManualClock::starting_now());
        let (_, _, manager) = manager(clock.clone());

        manager.start(session()).unwrap();

        clock.advance(Duration::hours(8) - Duration::milliseconds(1));
        assert!(manager.is_valid());

        clock.advance(Duration::milliseconds(1));
        assert!(!manager.is_valid());
        assert_eq!(manager.remaining_time(), None);
    }

    #[test]
    fn test_restore_round_trip() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock.clone());
        manager.start(session()).unwrap();

        // Fresh manager over the same store, as after a reload.
        let sink = MemoryAuditSink::new();
        let tracker = Arc::new(ActionTracker::with_clock(clock.clone(), 1000));
        let reloaded = ImpersonationSessionManager::with_config(
            store,
            Arc::new(sink),
            tracker,
            SessionConfig::default(),
            clock,
        );

        let restored = reloaded.restore().unwrap();
        assert_eq!(restored.id, "s1");
        assert_eq!(restored.reason.as_deref(), Some("support ticket #441"));
        assert!(reloaded.is_valid());
    }

    #[test]
    fn test_restore_purges_expired_record() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock.clone());
        manager.start(session()).unwrap();

        clock.advance(Duration::hours(9));

        let tracker = Arc::new(ActionTracker::with_clock(clock.clone(), 1000));
        let reloaded = ImpersonationSessionManager::with_config(
            store.clone(),
            Arc::new(MemoryAuditSink::new()),
            tracker,
            SessionConfig::default(),
            clock,
        );

        assert_eq!(reloaded.restore(), None);
        assert!(!reloaded.is_valid());
        assert_eq!(reloaded.session_details(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_purges_corrupt_record() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock);

        store
            .set("crm.impersonation.session", "{not valid json")
            .unwrap();
        assert_eq!(manager.restore(), None);
        assert!(store.is_empty());

        // Structurally valid JSON missing required fields is also purged.
        store
            .set("crm.impersonation.session", r#"{"startedAt": 0}"#)
            .unwrap();
        assert_eq!(manager.restore(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_end_flushes_audit_and_clears_tracker() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, sink, manager) = manager(clock);

        manager.start(session()).unwrap();
        manager
            .tracker()
            .track_page_view("s1", "crm:contacts")
            .unwrap();
        manager
            .tracker()
            .track_api_call("s1", "get", "customers", Some("c1"), Some(200), None)
            .unwrap();

        manager.end();

        assert!(!manager.is_valid());
        assert!(store.is_empty());
        assert_eq!(manager.tracker().action_count("s1"), 0);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session.id, "s1");
        assert_eq!(entries[0].actions.len(), 2);
    }

    #[test]
    fn test_end_is_idempotent() {
        let clock = Arc::new(ManualClock::starting_now());
        let (_, sink, manager) = manager(clock);

        manager.end();
        assert!(!manager.is_valid());

        manager.start(session()).unwrap();
        manager.end();
        manager.end();

        assert_eq!(sink.len(), 1);
        assert!(!manager.is_valid());
    }

    #[test]
    fn test_failing_sink_does_not_block_end() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemorySessionStore::new();
        let tracker = Arc::new(ActionTracker::with_clock(clock.clone(), 1000));
        let manager = ImpersonationSessionManager::with_config(
            store.clone(),
            Arc::new(FailingAuditSink),
            tracker,
            SessionConfig::default(),
            clock,
        );

        manager.start(session()).unwrap();
        manager.tracker().track_page_view("s1", "crm:contacts").unwrap();
        manager.end();

        assert!(!manager.is_valid());
        assert!(store.is_empty());
        assert_eq!(manager.tracker().action_count("s1"), 0);
    }

    #[test]
    fn test_session_record_round_trips_as_millis() {
        let session = session();
        let record = SessionRecord {
            session,
            started_at: DateTime::from_timestamp_millis(1_722_500_000_123).unwrap(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"startedAt\":1722500000123"));
        assert!(json.contains("\"superUserId\":\"admin1\""));

        let parsed: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_expired_session_details_purges_lazily() {
        let clock = Arc::new(ManualClock::starting_now());
        let (store, _, manager) = manager(clock.clone());

        manager.start(session()).unwrap();
        assert!(manager.session_details().is_some());

        clock.advance(Duration::hours(8));
        assert_eq!(manager.session_details(), None);
        assert!(store.is_empty());
    }
}
