//! Per-session action log for impersonation auditing.

use crate::{
    clock::{system_clock, Clock, SharedClock},
    error::{Error, Result},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Default per-session log bound.
pub const DEFAULT_ACTION_CAP: usize = 1000;

/// The closed set of trackable action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// A page or view was opened.
    PageView,
    /// A backend API call was made.
    ApiCall,
    /// A record was created.
    Create,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
    /// Data was exported.
    Export,
    /// A search was run.
    Search,
    /// A record or listing was printed.
    Print,
}

impl ActionType {
    /// All tracked kinds, in summary order.
    pub const ALL: [ActionType; 8] = [
        ActionType::PageView,
        ActionType::ApiCall,
        ActionType::Create,
        ActionType::Update,
        ActionType::Delete,
        ActionType::Export,
        ActionType::Search,
        ActionType::Print,
    ];

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::PageView => "page-view",
            ActionType::ApiCall => "api-call",
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Export => "export",
            ActionType::Search => "search",
            ActionType::Print => "print",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded action. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationAction {
    /// What kind of action was taken.
    pub action_type: ActionType,
    /// The resource or page the action concerned.
    pub resource: String,
    /// Concrete record id, where applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// HTTP method, for API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Response status, for API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Duration in milliseconds, for API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Kind-specific extras (export format and count, search query).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// When the action was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Append-only, size-bounded, per-session action log.
///
/// Sessions are isolated by keying on session id; the per-session log is a
/// ring buffer capped at [`DEFAULT_ACTION_CAP`] entries, evicting oldest
/// first.
pub struct ActionTracker {
    logs: DashMap<String, VecDeque<ImpersonationAction>>,
    clock: SharedClock,
    cap: usize,
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTracker {
    /// Create a tracker with the default cap and system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock(), DEFAULT_ACTION_CAP)
    }

    /// Create a tracker with an explicit clock and per-session cap.
    pub fn with_clock(clock: SharedClock, cap: usize) -> Self {
        Self {
            logs: DashMap::new(),
            clock,
            cap,
        }
    }

    /// Record a page view.
    pub fn track_page_view(&self, session_id: &str, page: &str) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(page, "page")?;
        self.push(session_id, self.action(ActionType::PageView, page));
        Ok(())
    }

    /// Record a backend API call.
    pub fn track_api_call(
        &self,
        session_id: &str,
        method: &str,
        resource: &str,
        resource_id: Option<&str>,
        status: Option<u16>,
        duration_ms: Option<u64>,
    ) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(method, "method")?;
        Self::require(resource, "resource")?;

        let mut action = self.action(ActionType::ApiCall, resource);
        action.method = Some(method.trim().to_uppercase());
        action.resource_id = resource_id.map(str::to_string);
        action.status = status;
        action.duration_ms = duration_ms;
        self.push(session_id, action);
        Ok(())
    }

    /// Record a create, update, or delete.
    ///
    /// Rejects kinds outside the CRUD subset.
    pub fn track_crud(
        &self,
        session_id: &str,
        kind: ActionType,
        resource: &str,
        resource_id: &str,
    ) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(resource, "resource")?;
        Self::require(resource_id, "resource id")?;
        if !matches!(
            kind,
            ActionType::Create | ActionType::Update | ActionType::Delete
        ) {
            return Err(Error::InvalidAction(format!(
                "'{kind}' is not a CRUD action"
            )));
        }

        let mut action = self.action(kind, resource);
        action.resource_id = Some(resource_id.to_string());
        self.push(session_id, action);
        Ok(())
    }

    /// Record a data export.
    pub fn track_export(
        &self,
        session_id: &str,
        resource: &str,
        format: &str,
        count: usize,
    ) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(resource, "resource")?;
        Self::require(format, "format")?;

        let mut action = self.action(ActionType::Export, resource);
        action
            .metadata
            .insert("format".to_string(), format.to_string());
        action
            .metadata
            .insert("count".to_string(), count.to_string());
        self.push(session_id, action);
        Ok(())
    }

    /// Record a search.
    pub fn track_search(&self, session_id: &str, resource: &str, query: &str) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(resource, "resource")?;
        Self::require(query, "query")?;

        let mut action = self.action(ActionType::Search, resource);
        action
            .metadata
            .insert("query".to_string(), query.to_string());
        self.push(session_id, action);
        Ok(())
    }

    /// Record a print.
    pub fn track_print(
        &self,
        session_id: &str,
        resource: &str,
        resource_id: Option<&str>,
    ) -> Result<()> {
        Self::require(session_id, "session id")?;
        Self::require(resource, "resource")?;

        let mut action = self.action(ActionType::Print, resource);
        action.resource_id = resource_id.map(str::to_string);
        self.push(session_id, action);
        Ok(())
    }

    /// The chronological action log for one session.
    pub fn actions(&self, session_id: &str) -> Vec<ImpersonationAction> {
        self.logs
            .get(session_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Counts per action kind for one session, zero-filled for kinds not
    /// seen.
    pub fn summary(&self, session_id: &str) -> BTreeMap<ActionType, usize> {
        let mut counts: BTreeMap<ActionType, usize> =
            ActionType::ALL.iter().map(|kind| (*kind, 0)).collect();
        if let Some(log) = self.logs.get(session_id) {
            for action in log.iter() {
                *counts.entry(action.action_type).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of actions recorded for one session.
    pub fn action_count(&self, session_id: &str) -> usize {
        self.logs.get(session_id).map(|log| log.len()).unwrap_or(0)
    }

    /// Purge one session's log; other sessions are unaffected.
    pub fn clear(&self, session_id: &str) {
        self.logs.remove(session_id);
    }

    /// Purge every session's log.
    pub fn clear_all(&self) {
        self.logs.clear();
    }

    fn action(&self, action_type: ActionType, resource: &str) -> ImpersonationAction {
        ImpersonationAction {
            action_type,
            resource: resource.to_string(),
            resource_id: None,
            method: None,
            status: None,
            duration_ms: None,
            metadata: HashMap::new(),
            timestamp: self.clock.now(),
        }
    }

    fn push(&self, session_id: &str, action: ImpersonationAction) {
        let mut log = self.logs.entry(session_id.to_string()).or_default();
        if log.len() == self.cap {
            log.pop_front();
        }
        log.push_back(action);
    }

    fn require(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Error::InvalidAction(format!("{field} is required")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ActionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTracker")
            .field("sessions", &self.logs.len())
            .field("cap", &self.cap)
            .finish()
    }
}
