//! Per-client sessions.
//!
//! Each session sits behind its own mutex so one client's handling never
//! waits on another's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use pulse_core::{SessionId, UserSession};

#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<UserSession>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the session, creating it on first use.
    pub fn with_session<R>(
        &self,
        session_id: &str,
        now_ms: u64,
        f: impl FnOnce(&mut UserSession) -> R,
    ) -> R {
        let session = self.get_or_create(session_id, now_ms);
        let mut session = session.lock().expect("session lock");
        session.touch(now_ms);
        f(&mut session)
    }

    /// A copy of the session's current state.
    pub fn snapshot(&self, session_id: &str) -> Option<UserSession> {
        let sessions = self.sessions.read().expect("session table lock");
        sessions
            .get(session_id)
            .map(|s| s.lock().expect("session lock").clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session table lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.sessions.write().expect("session table lock").clear();
    }

    fn get_or_create(&self, session_id: &str, now_ms: u64) -> Arc<Mutex<UserSession>> {
        if let Some(session) = self.sessions.read().expect("session table lock").get(session_id) {
            return session.clone();
        }
        self.sessions
            .write()
            .expect("session table lock")
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::new(session_id, now_ms))))
            .clone()
    }
}
