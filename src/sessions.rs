use tui_input::Input;

/// A live query editing session (one tab in the workspace)
#[derive(Debug, Clone)]
pub struct Session {
    pub id: usize,
    pub name: String,
    pub input: Input,
    /// History item this session was duplicated from, if any
    pub history_id: Option<String>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            input: Input::default(),
            history_id: None,
        }
    }

    pub fn with_query(name: impl Into<String>, query: &str) -> Self {
        let mut session = Self::new(name);
        session.input = Input::new(query.to_string());
        session
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }
}

/// Ordered set of sessions with one current session
pub struct SessionManager {
    sessions: Vec<Session>,
    current_index: usize,
    next_session_id: usize,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            current_index: 0,
            next_session_id: 1,
        }
    }

    /// Add a session and make it current
    pub fn add_session(&mut self, mut session: Session) -> usize {
        session.id = self.next_session_id;
        self.next_session_id += 1;

        let index = self.sessions.len();
        self.sessions.push(session);
        self.current_index = index;
        index
    }

    pub fn current(&self) -> Option<&Session> {
        self.sessions.get(self.current_index)
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.sessions.get_mut(self.current_index)
    }

    /// Id the next added session will receive
    pub fn next_session_id(&self) -> usize {
        self.next_session_id
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn next_session(&mut self) {
        if !self.sessions.is_empty() {
            self.current_index = (self.current_index + 1) % self.sessions.len();
        }
    }

    pub fn prev_session(&mut self) {
        if !self.sessions.is_empty() {
            if self.current_index == 0 {
                self.current_index = self.sessions.len() - 1;
            } else {
                self.current_index -= 1;
            }
        }
    }

    /// Close the current session. The last session is never closed.
    pub fn close_current(&mut self) -> bool {
        if self.sessions.len() <= 1 {
            return false;
        }

        self.sessions.remove(self.current_index);
        if self.current_index >= self.sessions.len() {
            self.current_index = self.sessions.len() - 1;
        }
        true
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
