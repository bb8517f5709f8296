use anyhow::Result;
use crossterm::{
    execute,
    style::Stylize,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use query_history::app::App;
use query_history::config::config::Config;
use query_history::history::HistoryStore;
use query_history::utils::app_paths::AppPaths;
use query_history::utils::logging;
use query_history::workspace::Workspace;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tracing::warn;

fn print_help() {
    println!("{}", "Query History - browse and reuse past queries".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  query-history [OPTIONS]");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {} - Use this history file", "--history <FILE>".green());
    println!(
        "  {}  - Print a commented default config",
        "--generate-config".green()
    );
    println!("  {}             - Show this help", "--help".green());
    println!();
    println!("{}", "Keys:".yellow());
    println!("  {}  - Record the current query", "Enter".green());
    println!("  {} - Open history", "Ctrl+R".green());
    println!("  {} - New session / {} - close session", "Ctrl+T".green(), "Ctrl+W".green());
    println!("  {}    - Next session", "Tab".green());
    println!("  {} - Quit", "Ctrl+C".green());
    println!();
    println!("{}", "In history:".yellow());
    println!("  {}    - Switch History / Starred", "Tab".green());
    println!("  {}      - Search", "/".green());
    println!("  {}  - Use the selected query in a new session", "Enter".green());
    println!("  {}      - Star / unstar", "s".green());
    println!("  {}      - Copy query to clipboard", "y".green());
    println!("  {}    - Close", "Esc".green());
}

fn history_path(cli_override: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    match cli_override.or_else(|| config.behavior.history_file.clone()) {
        Some(path) => Ok(path),
        None => AppPaths::history_file(),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut history_override = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--generate-config" => {
                print!("{}", Config::create_default_with_comments());
                return Ok(());
            }
            "--history" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--history needs a file path"))?;
                history_override = Some(PathBuf::from(path));
                i += 1;
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_help();
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let log_dir = AppPaths::log_dir().ok();
    logging::init_tracing(log_dir.as_deref());

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Falling back to default config: {}", e);
        Config::default()
    });

    let path = history_path(history_override, &config)?;
    let store = HistoryStore::load(&path, config.behavior.max_history_entries)?;
    let workspace = Workspace::new(store, config.behavior.max_sessions);
    let mut app = App::new(workspace, &config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
