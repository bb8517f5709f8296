use std::fmt;

/// Failures the history browser reports to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// "Use" was triggered while nothing resolvable was selected
    NoSelection,
    /// The workspace already holds the maximum number of sessions
    SessionLimit(usize),
    /// No history item with this id
    UnknownItem(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::NoSelection => write!(f, "no history item is selected"),
            HistoryError::SessionLimit(max) => {
                write!(f, "cannot open more than {} sessions", max)
            }
            HistoryError::UnknownItem(id) => write!(f, "unknown history item '{}'", id),
        }
    }
}

impl std::error::Error for HistoryError {}
