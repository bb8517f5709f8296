//! UI widgets for the TUI application
//!
//! Reusable components rendered by the application.

pub mod history_popup;
