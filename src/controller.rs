//! Selection and filtering state for the history browser
//!
//! [`HistorySelectionController`] owns the transient state of the dialog
//! (active filter, search term, selected id) and derives the visible list
//! from whatever snapshot the host currently holds. Both derivations are
//! pure and are recomputed on every render.

use crate::error::HistoryError;
use crate::history::{HistoryCollection, HistoryItem};
use crate::host::HistoryHost;
use anyhow::Result;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Every history item
    #[default]
    All,
    /// Only starred items
    Starred,
}

impl Filter {
    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "History",
            Filter::Starred => "Starred",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Filter::All => Filter::Starred,
            Filter::Starred => Filter::All,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub active_filter: Filter,
    pub search_term: String,
    /// `None` is the empty selection
    pub selected_id: Option<String>,
}

impl SelectionState {
    /// Seed state from the first snapshot: no filter, no search, first item selected
    pub fn initialize(items: &HistoryCollection) -> Self {
        Self {
            active_filter: Filter::All,
            search_term: String::new(),
            selected_id: items.first_id().map(str::to_string),
        }
    }
}

pub fn matches_filter(item: &HistoryItem, filter: Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Starred => item.starred,
    }
}

/// Case-insensitive substring match. An empty term matches everything.
pub fn matches_search(item: &HistoryItem, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    item.query.to_lowercase().contains(&term.to_lowercase())
}

/// Items passing both the filter and the search, in collection order
pub fn derive_visible_items<'a>(
    items: &'a HistoryCollection,
    state: &SelectionState,
) -> Vec<&'a HistoryItem> {
    items
        .iter()
        .filter(|item| {
            matches_filter(item, state.active_filter) && matches_search(item, &state.search_term)
        })
        .collect()
}

/// Resolve the selected id against the unfiltered collection
pub fn current_selection<'a>(
    items: &'a HistoryCollection,
    state: &SelectionState,
) -> Option<&'a HistoryItem> {
    state.selected_id.as_deref().and_then(|id| items.get(id))
}

pub struct HistorySelectionController {
    state: SelectionState,
}

impl HistorySelectionController {
    /// Runs once per controller lifetime; later snapshots never re-seed the selection.
    pub fn new(items: &HistoryCollection) -> Self {
        let state = SelectionState::initialize(items);
        debug!(
            "HistorySelectionController: initialized with {} items, selected={:?}",
            items.len(),
            state.selected_id
        );
        Self { state }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn set_filter(&mut self, filter: Filter) {
        debug!("HistorySelectionController: filter -> {:?}", filter);
        self.state.active_filter = filter;
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
        debug!(
            "HistorySelectionController: search term -> '{}'",
            self.state.search_term
        );
    }

    /// Not validated against the collection; the list only offers visible ids.
    pub fn select_item(&mut self, id: impl Into<String>) {
        let id = id.into();
        debug!("HistorySelectionController: selected {}", id);
        self.state.selected_id = Some(id);
    }

    pub fn visible_items<'a>(&self, items: &'a HistoryCollection) -> Vec<&'a HistoryItem> {
        derive_visible_items(items, &self.state)
    }

    pub fn current_selection<'a>(&self, items: &'a HistoryCollection) -> Option<&'a HistoryItem> {
        current_selection(items, &self.state)
    }

    /// Position of the selection inside the visible list, if it is visible
    pub fn visible_position(&self, items: &HistoryCollection) -> Option<usize> {
        let selected = self.state.selected_id.as_deref()?;
        self.visible_items(items)
            .iter()
            .position(|item| item.id == selected)
    }

    /// Move the selection by `offset` rows within the visible list, clamped at both ends.
    /// A hidden selection jumps to the first visible row.
    pub fn move_selection(&mut self, items: &HistoryCollection, offset: isize) {
        let visible = self.visible_items(items);
        if visible.is_empty() {
            return;
        }

        let target = match self.visible_position(items) {
            Some(pos) => {
                let max = visible.len() as isize - 1;
                (pos as isize + offset).clamp(0, max) as usize
            }
            None => 0,
        };
        let id = visible[target].id.clone();
        self.select_item(id);
    }

    /// Duplicate the selected item into a new session, then close the dialog.
    ///
    /// With nothing resolvable selected the host is left untouched and
    /// [`HistoryError::NoSelection`] is returned. `close` fires even when
    /// the duplicate fails; that failure is returned afterwards.
    pub fn activate_selection<H: HistoryHost + ?Sized>(&self, host: &mut H) -> Result<()> {
        let item = match self.current_selection(host.items()) {
            Some(item) => item.clone(),
            None => {
                warn!("HistorySelectionController: activate with no selection ignored");
                return Err(HistoryError::NoSelection.into());
            }
        };

        info!("HistorySelectionController: using history item {}", item.id);
        let duplicated = host.duplicate_session(item);
        host.close();

        if let Err(e) = &duplicated {
            warn!("HistorySelectionController: duplicate failed: {}", e);
        }
        duplicated
    }

    /// Forwarded as is; the starred flag changes only when the host sends a new snapshot.
    pub fn toggle_star<H: HistoryHost + ?Sized>(&self, id: &str, host: &mut H) {
        debug!("HistorySelectionController: toggle star {}", id);
        host.toggle_starring(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HistoryCollection {
        HistoryCollection::from_items(vec![
            HistoryItem::new("a", "{ users }", false),
            HistoryItem::new("b", "{ posts }", true),
            HistoryItem::new("c", "query AllPosts { Posts { id } }", true),
        ])
    }

    #[test]
    fn test_initialize_selects_first() {
        let state = SelectionState::initialize(&sample());
        assert_eq!(state.active_filter, Filter::All);
        assert_eq!(state.search_term, "");
        assert_eq!(state.selected_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_initialize_empty() {
        let state = SelectionState::initialize(&HistoryCollection::new());
        assert_eq!(state.selected_id, None);
    }

    #[test]
    fn test_predicates_are_independent() {
        let starred = HistoryItem::new("x", "{ Posts }", true);
        let plain = HistoryItem::new("y", "{ users }", false);

        assert!(matches_filter(&starred, Filter::Starred));
        assert!(!matches_filter(&plain, Filter::Starred));
        assert!(matches_filter(&plain, Filter::All));

        assert!(matches_search(&starred, "post"));
        assert!(matches_search(&starred, "POSTS"));
        assert!(matches_search(&plain, ""));
        assert!(!matches_search(&plain, "post"));
    }

    #[test]
    fn test_starred_and_search_both_apply() {
        let items = sample();
        let state = SelectionState {
            active_filter: Filter::Starred,
            search_term: "allposts".to_string(),
            selected_id: None,
        };
        let ids: Vec<&str> = derive_visible_items(&items, &state)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_search_term_is_not_trimmed() {
        let items = sample();
        let mut controller = HistorySelectionController::new(&items);
        controller.set_search_term(" posts }");
        assert_eq!(controller.state().search_term, " posts }");
        let ids: Vec<&str> = controller
            .visible_items(&items)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_move_selection_clamps_and_recovers() {
        let items = sample();
        let mut controller = HistorySelectionController::new(&items);

        controller.move_selection(&items, -1);
        assert_eq!(controller.state().selected_id.as_deref(), Some("a"));
        controller.move_selection(&items, 5);
        assert_eq!(controller.state().selected_id.as_deref(), Some("c"));

        controller.select_item("a");
        controller.set_filter(Filter::Starred);
        assert_eq!(controller.visible_position(&items), None);
        controller.move_selection(&items, 1);
        assert_eq!(controller.state().selected_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_move_selection_with_nothing_visible() {
        let items = sample();
        let mut controller = HistorySelectionController::new(&items);
        controller.set_search_term("mutation");
        controller.move_selection(&items, 1);
        assert_eq!(controller.state().selected_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_filter_toggle_and_labels() {
        assert_eq!(Filter::All.toggle(), Filter::Starred);
        assert_eq!(Filter::Starred.toggle(), Filter::All);
        assert_eq!(Filter::All.label(), "History");
        assert_eq!(Filter::Starred.label(), "Starred");
    }
}
