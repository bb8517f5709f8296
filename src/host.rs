//! Host contract for the history browser
//!
//! The browser never owns or mutates the canonical history. It reads the
//! latest snapshot through [`HistoryHost::items`] and routes every write
//! (starring, duplicating a query into a new session, closing the dialog)
//! back to the host, which applies it and hands out a fresh snapshot.

use crate::history::{HistoryCollection, HistoryItem};
use anyhow::Result;

pub trait HistoryHost {
    /// Whether the history dialog is currently shown
    fn is_open(&self) -> bool;

    /// Current snapshot of the history, newest store state
    fn items(&self) -> &HistoryCollection;

    fn open(&mut self);

    fn close(&mut self);

    /// Copy a historical query into a new active editing session
    fn duplicate_session(&mut self, item: HistoryItem) -> Result<()>;

    /// Flip the starred flag of an item. Unknown ids are ignored by the host.
    fn toggle_starring(&mut self, id: &str);
}
