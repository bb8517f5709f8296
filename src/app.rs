use crate::config::config::Config;
use crate::host::HistoryHost;
use crate::utils::logging;
use crate::widget_traits::DebugInfoProvider;
use crate::widgets::history_popup::{centered_rect, HistoryPopup, PopupAction};
use crate::workspace::Workspace;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tracing::{debug, info, warn};
use tui_input::backend::crossterm::EventHandler;

/// Log lines shown in the F5 debug view
const DEBUG_LOG_LINES: usize = 20;

/// What the event loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFlow {
    Continue,
    Quit,
}

pub struct App {
    workspace: Workspace,
    history_popup: HistoryPopup,
    status_message: String,
    record_history: bool,
    show_debug: bool,
}

impl App {
    pub fn new(workspace: Workspace, config: &Config) -> Self {
        let history_popup = HistoryPopup::new(&workspace, config);
        Self {
            workspace,
            history_popup,
            status_message: "Ready - Enter runs the query, Ctrl+R opens history".to_string(),
            record_history: config.behavior.enable_history,
            show_debug: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if self.handle_key(key) == AppFlow::Quit {
                    break;
                }
            }
        }
        info!("App: exiting");
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppFlow {
        if key.code == KeyCode::F(5) {
            self.show_debug = !self.show_debug;
            debug!("{}", self.history_popup.debug_summary());
            return AppFlow::Continue;
        }
        if self.workspace.is_open() {
            return self.handle_history_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return AppFlow::Quit,
            KeyCode::Char('r') if ctrl => {
                self.workspace.open();
                debug!("{}", self.history_popup.debug_summary());
            }
            KeyCode::Char('t') if ctrl => match self.workspace.new_session() {
                Ok(_) => self.status_message = "New session".to_string(),
                Err(e) => self.status_message = format!("Error: {}", e),
            },
            KeyCode::Char('w') if ctrl => {
                if self.workspace.sessions_mut().close_current() {
                    self.status_message = "Session closed".to_string();
                }
            }
            KeyCode::Tab => self.workspace.sessions_mut().next_session(),
            KeyCode::BackTab => self.workspace.sessions_mut().prev_session(),
            KeyCode::Enter => self.run_query(),
            _ => {
                if let Some(session) = self.workspace.sessions_mut().current_mut() {
                    session.input.handle_event(&Event::Key(key));
                }
            }
        }
        AppFlow::Continue
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> AppFlow {
        match self.history_popup.handle_key(key, &mut self.workspace) {
            PopupAction::Quit => return AppFlow::Quit,
            PopupAction::Activated => {
                self.status_message = "Query loaded from history into a new session".to_string();
            }
            PopupAction::StarToggled(id) => {
                let starred = self
                    .workspace
                    .items()
                    .get(&id)
                    .map(|item| item.starred)
                    .unwrap_or(false);
                self.status_message = if starred {
                    "Starred".to_string()
                } else {
                    "Unstarred".to_string()
                };
            }
            PopupAction::Yanked(query) => {
                let chars = query.chars().count();
                self.status_message = format!("Copied {} chars to clipboard", chars);
            }
            PopupAction::Failed(message) => {
                warn!("App: history action failed: {}", message);
                self.status_message = format!("Error: {}", message);
            }
            PopupAction::Closed | PopupAction::None => {}
        }
        AppFlow::Continue
    }

    fn run_query(&mut self) {
        if !self.record_history {
            self.status_message = "History recording is disabled".to_string();
            return;
        }
        match self.workspace.run_current_query() {
            Ok(Some(_)) => self.status_message = "Query added to history".to_string(),
            Ok(None) => self.status_message = "Nothing new to record".to_string(),
            Err(e) => {
                warn!("App: failed to record query: {}", e);
                self.status_message = format!("Error: {}", e);
            }
        }
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Session tabs
                Constraint::Min(3),    // Editor
                Constraint::Length(1), // Status
            ])
            .split(f.area());

        self.render_session_tabs(f, chunks[0]);
        self.render_editor(f, chunks[1]);
        self.render_status(f, chunks[2]);

        let area = f.area();
        self.history_popup.render(f, area, &self.workspace);
        if self.show_debug {
            self.render_debug(f, area);
        }
    }

    /// Popup state dump plus the latest log lines
    fn render_debug(&self, f: &mut Frame, area: Rect) {
        let mut text = self.history_popup.debug_info();
        text.push_str("\n=== RECENT LOGS ===\n");
        match logging::get_log_buffer() {
            Some(buffer) => {
                for entry in buffer.get_recent(DEBUG_LOG_LINES) {
                    text.push_str(&entry.format_for_display());
                    text.push('\n');
                }
            }
            None => text.push_str("Logging not initialized\n"),
        }

        let debug_area = centered_rect(80, 70, area);
        f.render_widget(Clear, debug_area);
        let debug = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(" Debug (F5) "))
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::Gray));
        f.render_widget(debug, debug_area);
    }

    fn key_hint(&self) -> &'static str {
        if !self.workspace.is_open() {
            "Enter run | Ctrl+R history | Ctrl+T new | F5 debug"
        } else if self.history_popup.is_search_focused() {
            "Type to search | Esc/Enter done"
        } else {
            "Enter use | s star | y copy | / search | Tab filter | Esc close"
        }
    }

    fn render_session_tabs(&self, f: &mut Frame, area: Rect) {
        let sessions = self.workspace.sessions();
        let titles: Vec<String> = sessions
            .sessions()
            .iter()
            .map(|session| session.name.clone())
            .collect();
        let tabs = Tabs::new(titles)
            .select(sessions.current_index())
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_widget(tabs, area);
    }

    fn render_editor(&self, f: &mut Frame, area: Rect) {
        let Some(session) = self.workspace.sessions().current() else {
            return;
        };

        let width = area.width.saturating_sub(2) as usize;
        let scroll = session.input.visual_scroll(width);
        let editor = Paragraph::new(session.query())
            .scroll((0, scroll as u16))
            .block(Block::default().borders(Borders::ALL).title("Query"));
        f.render_widget(editor, area);

        if !self.workspace.is_open() {
            let cursor = session.input.visual_cursor().max(scroll) - scroll;
            f.set_cursor_position((area.x + 1 + cursor as u16, area.y + 1));
        }
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let status = Line::from(vec![
            Span::styled(
                format!(" {} items ", self.workspace.items().len()),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ),
            Span::raw(" "),
            Span::raw(self.status_message.as_str()),
            Span::raw("  "),
            Span::styled(self.key_hint(), Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(status), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app() -> App {
        let workspace = Workspace::new(HistoryStore::in_memory(100), 8);
        App::new(workspace, &Config::default())
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_records_query() {
        let mut app = app();
        type_text(&mut app, "{ users }");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.workspace().items().len(), 1);
        assert_eq!(app.status_message(), "Query added to history");
    }

    #[test]
    fn test_history_round_trip_into_new_session() {
        let mut app = app();
        type_text(&mut app, "{ users }");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(ctrl('r'));
        assert!(app.workspace().is_open());

        // Popup was mounted before the query existed, so nothing is selected yet
        app.handle_key(key(KeyCode::Enter));
        assert!(app.workspace().is_open());
        assert_eq!(app.workspace().sessions().len(), 1);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.workspace().is_open());
        assert_eq!(app.workspace().sessions().len(), 2);
        assert_eq!(
            app.workspace().sessions().current().unwrap().query(),
            "{ users }"
        );
    }

    #[test]
    fn test_ctrl_c_quits_from_popup() {
        let mut app = app();
        app.handle_key(ctrl('r'));
        assert_eq!(app.handle_key(ctrl('c')), AppFlow::Quit);
    }

    #[test]
    fn test_f5_toggles_debug_view() {
        let mut app = app();
        app.handle_key(ctrl('r'));
        app.handle_key(key(KeyCode::F(5)));
        assert!(app.show_debug);
        // F5 is not forwarded to the open dialog
        assert!(app.workspace().is_open());

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("HISTORY POPUP"));
        assert!(text.contains("RECENT LOGS"));

        app.handle_key(key(KeyCode::F(5)));
        assert!(!app.show_debug);
    }

    #[test]
    fn test_key_hint_follows_search_focus() {
        let mut app = app();
        assert!(app.key_hint().contains("Ctrl+R"));

        app.handle_key(ctrl('r'));
        assert!(app.key_hint().contains("Esc close"));
        app.handle_key(key(KeyCode::Char('/')));
        assert!(app.key_hint().starts_with("Type to search"));
    }
}
