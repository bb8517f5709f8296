use crate::config::config::{Config, IconConfig};
use crate::controller::{Filter, HistorySelectionController};
use crate::error::HistoryError;
use crate::history::HistoryItem;
use crate::host::HistoryHost;
use crate::widget_traits::DebugInfoProvider;
use anyhow::{anyhow, Result};
use arboard::Clipboard;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use tracing::debug;
use tui_input::{backend::crossterm::EventHandler, Input};

/// Outcome of a key press inside the history dialog
#[derive(Debug, Clone, PartialEq)]
pub enum PopupAction {
    None,
    /// Dialog closed without using an item
    Closed,
    /// Selected query was duplicated into a new session and the dialog closed
    Activated,
    StarToggled(String),
    /// Selected query copied to the clipboard
    Yanked(String),
    Failed(String),
    Quit,
}

/// Modal history browser. Created once; closing and reopening keeps its state.
pub struct HistoryPopup {
    controller: HistorySelectionController,
    search_input: Input,
    search_focused: bool,
    icons: IconConfig,
    vim_mode: bool,
    show_operation_names: bool,
}

impl HistoryPopup {
    pub fn new(host: &dyn HistoryHost, config: &Config) -> Self {
        Self {
            controller: HistorySelectionController::new(host.items()),
            search_input: Input::default(),
            search_focused: false,
            icons: config.display.icons.clone(),
            vim_mode: config.keybindings.vim_mode,
            show_operation_names: config.display.show_operation_names,
        }
    }

    pub fn controller(&self) -> &HistorySelectionController {
        &self.controller
    }

    pub fn is_search_focused(&self) -> bool {
        self.search_focused
    }

    /// Handle key input while the dialog is open
    pub fn handle_key(&mut self, key: KeyEvent, host: &mut dyn HistoryHost) -> PopupAction {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return PopupAction::Quit;
        }
        if !host.is_open() {
            return PopupAction::None;
        }

        if self.search_focused {
            return self.handle_search_key(key, host);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                host.close();
                PopupAction::Closed
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let filter = self.controller.state().active_filter.toggle();
                self.controller.set_filter(filter);
                PopupAction::None
            }
            KeyCode::Char('/') => {
                self.search_focused = true;
                PopupAction::None
            }
            KeyCode::Up => self.move_selection(host, -1),
            KeyCode::Down => self.move_selection(host, 1),
            KeyCode::Char('k') if self.vim_mode => self.move_selection(host, -1),
            KeyCode::Char('j') if self.vim_mode => self.move_selection(host, 1),
            KeyCode::PageUp => self.move_selection(host, -10),
            KeyCode::PageDown => self.move_selection(host, 10),
            KeyCode::Enter => match self.controller.activate_selection(host) {
                Ok(()) => PopupAction::Activated,
                Err(e) if is_no_selection(&e) => PopupAction::None,
                Err(e) => PopupAction::Failed(e.to_string()),
            },
            KeyCode::Char('s') => self.toggle_selected_star(host),
            KeyCode::Char('y') => match self.yank_selected(&*host) {
                Ok(query) => PopupAction::Yanked(query),
                Err(e) => PopupAction::Failed(e.to_string()),
            },
            _ => PopupAction::None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, host: &mut dyn HistoryHost) -> PopupAction {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.search_focused = false;
                PopupAction::None
            }
            KeyCode::Down => {
                self.search_focused = false;
                self.move_selection(host, 1)
            }
            _ => {
                self.search_input.handle_event(&Event::Key(key));
                self.controller
                    .set_search_term(self.search_input.value().to_string());
                PopupAction::None
            }
        }
    }

    fn move_selection(&mut self, host: &dyn HistoryHost, offset: isize) -> PopupAction {
        self.controller.move_selection(host.items(), offset);
        PopupAction::None
    }

    /// Star or unstar the selected row. A selection hidden by the filter or
    /// search is not touched.
    fn toggle_selected_star(&mut self, host: &mut dyn HistoryHost) -> PopupAction {
        let items = host.items();
        if self.controller.visible_position(items).is_none() {
            return PopupAction::None;
        }
        let Some(id) = self
            .controller
            .current_selection(items)
            .map(|item| item.id.clone())
        else {
            return PopupAction::None;
        };
        self.controller.toggle_star(&id, host);
        PopupAction::StarToggled(id)
    }

    /// Copy the selected query to the system clipboard
    pub fn yank_selected(&self, host: &dyn HistoryHost) -> Result<String> {
        let item = self
            .controller
            .current_selection(host.items())
            .ok_or_else(|| anyhow!(HistoryError::NoSelection))?;

        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(item.query.clone())?;
        debug!("HistoryPopup: yanked history item {}", item.id);
        Ok(item.query.clone())
    }

    /// Render the dialog over `area` when the host reports it open
    pub fn render(&self, f: &mut Frame, area: Rect, host: &dyn HistoryHost) {
        if !host.is_open() {
            return;
        }

        let popup_area = centered_rect(85, 80, area);
        f.render_widget(Clear, popup_area);

        let outer = Block::default()
            .borders(Borders::ALL)
            .title(" Session History ")
            .title_alignment(Alignment::Center);
        let inner = outer.inner(popup_area);
        f.render_widget(outer, popup_area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(inner);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Filter tabs
                Constraint::Length(3), // Search box
                Constraint::Min(1),    // Items
            ])
            .split(columns[0]);

        self.render_filter_tabs(f, left[0]);
        self.render_search(f, left[1]);
        self.render_items(f, left[2], host);
        self.render_detail(f, columns[1], host);
    }

    fn render_filter_tabs(&self, f: &mut Frame, area: Rect) {
        let selected = match self.controller.state().active_filter {
            Filter::All => 0,
            Filter::Starred => 1,
        };
        let tabs = Tabs::new(vec![Filter::All.label(), Filter::Starred.label()])
            .select(selected)
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            );
        f.render_widget(tabs, area);
    }

    fn render_search(&self, f: &mut Frame, area: Rect) {
        let border_style = if self.search_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let width = area.width.saturating_sub(2) as usize;
        let scroll = self.search_input.visual_scroll(width);
        let search = Paragraph::new(self.search_input.value())
            .scroll((0, scroll as u16))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title("Search (/)"),
            );
        f.render_widget(search, area);

        if self.search_focused {
            let cursor = self.search_input.visual_cursor().max(scroll) - scroll;
            f.set_cursor_position((area.x + 1 + cursor as u16, area.y + 1));
        }
    }

    fn render_items(&self, f: &mut Frame, area: Rect, host: &dyn HistoryHost) {
        let items = host.items();
        let visible = self.controller.visible_items(items);
        let selected_id = self.controller.state().selected_id.as_deref();
        let term = &self.controller.state().search_term;

        let rows: Vec<ListItem> = visible
            .iter()
            .map(|item| {
                let is_selected = Some(item.id.as_str()) == selected_id;
                let marker = if is_selected {
                    self.icons.selected.as_str()
                } else {
                    " "
                };
                let star = if item.starred {
                    self.icons.star.as_str()
                } else {
                    self.icons.unstar.as_str()
                };

                let mut spans = vec![
                    Span::raw(format!("{} ", marker)),
                    Span::styled(format!("{} ", star), Style::default().fg(Color::Yellow)),
                ];
                spans.extend(highlight_matches(item.title(), term, Style::default()));
                if self.show_operation_names {
                    if let Some(name) = &item.operation_name {
                        spans.push(Span::styled(
                            format!("  {}", name),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let title = format!(
            "{} ({})",
            self.controller.state().active_filter.label(),
            visible.len()
        );
        let list = List::new(rows)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        let mut state = ListState::default();
        state.select(self.controller.visible_position(items));
        f.render_stateful_widget(list, area, &mut state);
    }

    fn render_detail(&self, f: &mut Frame, area: Rect, host: &dyn HistoryHost) {
        match self.controller.current_selection(host.items()) {
            Some(item) => render_query_view(f, area, item),
            None => {
                let empty = Paragraph::new("No History yet")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(empty, area);
            }
        }
    }
}

fn is_no_selection(err: &anyhow::Error) -> bool {
    err.downcast_ref::<HistoryError>() == Some(&HistoryError::NoSelection)
}

/// Read-only view of a query with the "Use" hint
fn render_query_view(f: &mut Frame, area: Rect, item: &HistoryItem) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let header = Line::from(vec![
        Span::styled("VIEW", Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            " Use ⏎ ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    let query = Paragraph::new(item.query.as_str())
        .block(Block::default().borders(Borders::ALL).title("Query"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(query, chunks[1]);
}

/// Split `text` into spans, emphasizing case-insensitive occurrences of `term`
pub fn highlight_matches<'a>(text: &'a str, term: &str, base: Style) -> Vec<Span<'a>> {
    let lowered = text.to_lowercase();
    let needle = term.to_lowercase();
    if needle.is_empty() || lowered.len() != text.len() {
        return vec![Span::styled(text, base)];
    }

    let highlight = base.fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut spans = Vec::new();
    let mut last = 0;
    for (start, _) in lowered.match_indices(&needle) {
        let end = start + needle.len();
        if start < last || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        if start > last {
            spans.push(Span::styled(&text[last..start], base));
        }
        spans.push(Span::styled(&text[start..end], highlight));
        last = end;
    }
    if last < text.len() {
        spans.push(Span::styled(&text[last..], base));
    }
    spans
}

/// Rect of the given percentage size centered in `r`
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

impl DebugInfoProvider for HistoryPopup {
    fn debug_info(&self) -> String {
        let state = self.controller.state();
        let mut info = String::from("=== HISTORY POPUP ===\n");
        info.push_str(&format!("Filter: {:?}\n", state.active_filter));
        info.push_str(&format!("Search Term: '{}'\n", state.search_term));
        info.push_str(&format!("Search Focused: {}\n", self.search_focused));
        info.push_str(&format!("Selected Id: {:?}\n", state.selected_id));
        info
    }

    fn debug_summary(&self) -> String {
        let state = self.controller.state();
        format!(
            "HistoryPopup: filter={:?}, search='{}', selected={:?}",
            state.active_filter, state.search_term, state.selected_id
        )
    }
}

impl std::fmt::Debug for HistoryPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.debug_summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryCollection, HistoryStore};
    use crate::workspace::Workspace;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn workspace() -> Workspace {
        let items = HistoryCollection::from_items(vec![
            HistoryItem::new("a", "{ users }", false),
            HistoryItem::new("b", "{ posts }", true),
        ]);
        let mut workspace = Workspace::new(HistoryStore::with_items(items, 100), 8);
        workspace.open();
        workspace
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_keys_ignored_while_closed() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());
        workspace.close();

        assert_eq!(
            popup.handle_key(key(KeyCode::Tab), &mut workspace),
            PopupAction::None
        );
        assert_eq!(popup.controller().state().active_filter, Filter::All);
    }

    #[test]
    fn test_typing_updates_search_term() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        popup.handle_key(key(KeyCode::Char('/')), &mut workspace);
        assert!(popup.is_search_focused());
        for c in "POST".chars() {
            popup.handle_key(key(KeyCode::Char(c)), &mut workspace);
        }
        assert_eq!(popup.controller().state().search_term, "POST");
        let visible = popup.controller().visible_items(workspace.items());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "b");

        popup.handle_key(key(KeyCode::Esc), &mut workspace);
        assert!(!popup.is_search_focused());
        assert!(workspace.is_open());
    }

    #[test]
    fn test_star_key_goes_through_host() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        let action = popup.handle_key(key(KeyCode::Char('s')), &mut workspace);
        assert_eq!(action, PopupAction::StarToggled("a".to_string()));
        assert!(workspace.items().get("a").unwrap().starred);
    }

    #[test]
    fn test_ctrl_s_toggles_star() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        let action = popup.handle_key(ctrl_s, &mut workspace);
        assert_eq!(action, PopupAction::StarToggled("a".to_string()));
        assert!(workspace.items().get("a").unwrap().starred);

        popup.handle_key(ctrl_s, &mut workspace);
        assert!(!workspace.items().get("a").unwrap().starred);
    }

    #[test]
    fn test_star_key_ignores_hidden_selection() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        // "a" stays selected but the starred tab only shows "b"
        popup.handle_key(key(KeyCode::Tab), &mut workspace);
        assert_eq!(popup.controller().state().selected_id.as_deref(), Some("a"));

        let action = popup.handle_key(key(KeyCode::Char('s')), &mut workspace);
        assert_eq!(action, PopupAction::None);
        assert!(!workspace.items().get("a").unwrap().starred);
        assert!(workspace.items().get("b").unwrap().starred);
    }

    #[test]
    fn test_esc_and_q_close_dialog() {
        for code in [KeyCode::Esc, KeyCode::Char('q')] {
            let mut workspace = workspace();
            let mut popup = HistoryPopup::new(&workspace, &Config::default());

            assert_eq!(popup.handle_key(key(code), &mut workspace), PopupAction::Closed);
            assert!(!workspace.is_open());
            assert_eq!(workspace.sessions().len(), 1);
        }
    }

    #[test]
    fn test_vim_keys_follow_config() {
        let mut workspace = workspace();
        let mut config = Config::default();
        config.keybindings.vim_mode = true;
        let mut popup = HistoryPopup::new(&workspace, &config);

        popup.handle_key(key(KeyCode::Char('j')), &mut workspace);
        assert_eq!(popup.controller().state().selected_id.as_deref(), Some("b"));
        popup.handle_key(key(KeyCode::Char('k')), &mut workspace);
        assert_eq!(popup.controller().state().selected_id.as_deref(), Some("a"));

        config.keybindings.vim_mode = false;
        let mut popup = HistoryPopup::new(&workspace, &config);
        popup.handle_key(key(KeyCode::Char('j')), &mut workspace);
        assert_eq!(popup.controller().state().selected_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_enter_uses_selection_and_closes() {
        let mut workspace = workspace();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        popup.handle_key(key(KeyCode::Down), &mut workspace);
        let action = popup.handle_key(key(KeyCode::Enter), &mut workspace);

        assert_eq!(action, PopupAction::Activated);
        assert!(!workspace.is_open());
        assert_eq!(workspace.sessions().current().unwrap().query(), "{ posts }");
    }

    #[test]
    fn test_enter_with_empty_history_does_nothing() {
        let mut workspace = Workspace::new(HistoryStore::in_memory(10), 8);
        workspace.open();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        let action = popup.handle_key(key(KeyCode::Enter), &mut workspace);
        assert_eq!(action, PopupAction::None);
        assert!(workspace.is_open());
        assert_eq!(workspace.sessions().len(), 1);
    }

    #[test]
    fn test_render_shows_empty_state() {
        let mut workspace = Workspace::new(HistoryStore::in_memory(10), 8);
        workspace.open();
        let popup = HistoryPopup::new(&workspace, &Config::default());

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                popup.render(f, area, &workspace);
            })
            .unwrap();
        assert!(buffer_text(&terminal).contains("No History yet"));
    }

    #[test]
    fn test_render_shows_selected_query() {
        let workspace = workspace();
        let popup = HistoryPopup::new(&workspace, &Config::default());

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                popup.render(f, area, &workspace);
            })
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Session History"));
        assert!(text.contains("{ users }"));
        assert!(text.contains("Use"));
    }

    #[test]
    fn test_highlight_matches_splits_spans() {
        let spans = highlight_matches("query Posts", "post", Style::default());
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["query ", "Post", "s"]);

        let spans = highlight_matches("query", "", Style::default());
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_failed_activation_reports_error() {
        let items =
            HistoryCollection::from_items(vec![HistoryItem::new("a", "{ users }", false)]);
        let mut workspace = Workspace::new(HistoryStore::with_items(items, 10), 1);
        workspace.open();
        let mut popup = HistoryPopup::new(&workspace, &Config::default());

        let action = popup.handle_key(key(KeyCode::Enter), &mut workspace);
        assert!(matches!(action, PopupAction::Failed(_)));
        assert!(!workspace.is_open());
    }
}
