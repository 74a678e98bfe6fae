//! Per-client session state owned by the orchestrating layer.
//!
//! The rules engine reads and writes a `UserSession` it is handed but
//! never stores one. A session is only touched by its own client's
//! handler, so no locking lives here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ContentId, OperationalMode, SessionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: SessionId,
    pub current_mode: OperationalMode,
    pub scroll_position: i64,
    pub scroll_velocity: f64,
    /// Accumulated focus time per theme, in milliseconds.
    pub focus_times: HashMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_content_id: Option<ContentId>,
    /// Unix milliseconds of the last event handled for this session.
    pub last_activity: u64,
    /// Content already injected into this session's stream, in order.
    pub injected_content: Vec<ContentId>,
    pub visible_content: Vec<ContentId>,
}

impl UserSession {
    /// Create a session in mixed browsing mode.
    pub fn new(session_id: &str, now_ms: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            current_mode: OperationalMode::MixedStreamBrowsing,
            scroll_position: 0,
            scroll_velocity: 0.0,
            focus_times: HashMap::new(),
            active_content_id: None,
            last_activity: now_ms,
            injected_content: Vec::new(),
            visible_content: Vec::new(),
        }
    }

    pub fn focus_time(&self, theme: &str) -> u64 {
        self.focus_times.get(theme).copied().unwrap_or(0)
    }

    pub fn add_focus_time(&mut self, theme: &str, ms: u64) {
        *self.focus_times.entry(theme.to_string()).or_insert(0) += ms;
    }

    pub fn has_injected(&self, content_id: &str) -> bool {
        self.injected_content.iter().any(|id| id == content_id)
    }

    /// Record an injection. Repeated marks of the same id are ignored.
    pub fn mark_injected(&mut self, content_id: &str) {
        if !self.has_injected(content_id) {
            self.injected_content.push(content_id.to_string());
        }
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity = now_ms;
    }
}
