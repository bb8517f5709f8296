//! The application's history host: canonical history plus editing sessions

use crate::error::HistoryError;
use crate::history::{HistoryCollection, HistoryItem, HistoryStore};
use crate::host::HistoryHost;
use crate::sessions::{Session, SessionManager};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Default cap on open sessions
pub const DEFAULT_MAX_SESSIONS: usize = 32;

pub struct Workspace {
    store: HistoryStore,
    sessions: SessionManager,
    history_open: bool,
    max_sessions: usize,
}

impl Workspace {
    /// Create a workspace with one empty session
    pub fn new(store: HistoryStore, max_sessions: usize) -> Self {
        let mut sessions = SessionManager::new();
        sessions.add_session(Session::new("Session 1"));
        Self {
            store,
            sessions,
            history_open: false,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    /// Record the current session's query into history
    pub fn run_current_query(&mut self) -> Result<Option<String>> {
        let Some(session) = self.sessions.current() else {
            return Ok(None);
        };
        let query = session.query().to_string();
        let id = self.store.add_query(query, None)?;
        if let Some(id) = &id {
            info!("Workspace: recorded query as history item {}", id);
        }
        Ok(id)
    }

    /// Open a fresh empty session
    pub fn new_session(&mut self) -> Result<usize> {
        self.ensure_session_capacity()?;
        Ok(self.sessions.add_session(Session::new(self.next_session_name())))
    }

    fn next_session_name(&self) -> String {
        format!("Session {}", self.sessions.next_session_id())
    }

    fn ensure_session_capacity(&self) -> Result<()> {
        if self.sessions.len() >= self.max_sessions {
            return Err(HistoryError::SessionLimit(self.max_sessions).into());
        }
        Ok(())
    }
}

impl HistoryHost for Workspace {
    fn is_open(&self) -> bool {
        self.history_open
    }

    fn items(&self) -> &HistoryCollection {
        self.store.items()
    }

    fn open(&mut self) {
        debug!("Workspace: history opened");
        self.history_open = true;
    }

    fn close(&mut self) {
        debug!("Workspace: history closed");
        self.history_open = false;
    }

    fn duplicate_session(&mut self, item: HistoryItem) -> Result<()> {
        self.ensure_session_capacity()?;

        let name = item
            .operation_name
            .clone()
            .unwrap_or_else(|| self.next_session_name());
        let mut session = Session::with_query(name, &item.query);
        session.history_id = Some(item.id.clone());

        let index = self.sessions.add_session(session);
        info!(
            "Workspace: duplicated history item {} into session #{}",
            item.id,
            index + 1
        );
        Ok(())
    }

    fn toggle_starring(&mut self, id: &str) {
        match self.store.toggle_starring(id) {
            Ok(starred) => debug!("Workspace: item {} starred={}", id, starred),
            Err(e) => warn!("Workspace: could not toggle star on {}: {}", id, e),
        }
    }
}
