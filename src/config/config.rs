use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub keybindings: KeybindingConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs for icons
    pub use_glyphs: bool,

    /// Show the operation name next to each history entry
    pub show_operation_names: bool,

    /// Icons for different states (can be overridden)
    pub icons: IconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub star: String,
    pub unstar: String,
    pub selected: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    /// Whether j/k also move through the history list
    pub vim_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Record executed queries
    pub enable_history: bool,

    /// History file override (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<PathBuf>,

    /// Maximum history entries
    pub max_history_entries: usize,

    /// Maximum open sessions
    pub max_sessions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            keybindings: KeybindingConfig::default(),
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            show_operation_names: true,
            icons: IconConfig::default(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            star: "★".to_string(),
            unstar: "☆".to_string(),
            selected: "►".to_string(),
        }
    }
}

impl IconConfig {
    /// ASCII alternatives for terminals without glyph support
    pub fn simple() -> Self {
        Self {
            star: "*".to_string(),
            unstar: " ".to_string(),
            selected: ">".to_string(),
        }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self { vim_mode: true }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            enable_history: true,
            history_file: None,
            max_history_entries: crate::history::DEFAULT_MAX_ENTRIES,
            max_sessions: crate::workspace::DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::from_toml(&contents)
    }

    /// Parse a config document, applying ASCII icons when glyphs are off
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        if !config.display.use_glyphs {
            config.display.icons = IconConfig::simple();
        }
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("query-history").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Query History Configuration File
# Location: ~/.config/query-history/config.toml (Linux)
#           %APPDATA%\query-history\config.toml (Windows)

[display]
# Use Unicode glyphs for icons
# Set to false for ASCII-only mode (better compatibility)
use_glyphs = true

# Show the operation name next to each history entry
show_operation_names = true

# These are automatically set to ASCII when use_glyphs = false
[display.icons]
star = "★"
unstar = "☆"
selected = "►"

[keybindings]
# Also move through the history list with j/k
vim_mode = true

[behavior]
# Record executed queries
enable_history = true

# History file (leave commented to use the data directory)
# history_file = "/path/to/history.json"

# Maximum number of history entries to keep
max_history_entries = 1000

# Maximum number of open sessions
max_sessions = 32
"#
        .to_string()
    }
}
