use chrono::Local;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A log entry with timestamp and message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Format for display and for the log file
    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }

    /// Parse one line of the compact fmt output: "LEVEL target: message"
    pub fn parse_compact(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (level, rest) = [
            (Level::TRACE, "TRACE "),
            (Level::DEBUG, "DEBUG "),
            (Level::INFO, "INFO "),
            (Level::WARN, "WARN "),
            (Level::ERROR, "ERROR "),
        ]
        .iter()
        .find_map(|(level, prefix)| {
            line.strip_prefix(prefix)
                .map(|rest| (*level, rest.trim_start()))
        })
        .unwrap_or((Level::INFO, line));

        let (target, message) = match rest.find(": ") {
            Some(pos) if !rest[..pos].contains(' ') => (&rest[..pos], rest[pos + 2..].trim()),
            _ => ("general", rest),
        };

        Some(Self::new(level, target, message.to_string()))
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer feeding the ring buffer and, when available, a log file.
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
#[derive(Clone)]
pub struct RingBufferWriter {
    buffer: LogRingBuffer,
    log_file: Option<Arc<Mutex<File>>>,
}

impl RingBufferWriter {
    pub fn new(buffer: LogRingBuffer, log_file: Option<File>) -> Self {
        Self {
            buffer,
            log_file: log_file.map(|file| Arc::new(Mutex::new(file))),
        }
    }
}

impl Write for RingBufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(message) = std::str::from_utf8(buf) {
            for line in message.lines() {
                if let Some(entry) = LogEntry::parse_compact(line) {
                    if let Some(file) = &self.log_file {
                        if let Ok(mut file) = file.lock() {
                            writeln!(file, "{}", entry.format_for_display())?;
                        }
                    }
                    self.buffer.push(entry);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.log_file {
            if let Ok(mut file) = file.lock() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RingBufferWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Global log buffer accessible throughout the application
static LOG_BUFFER: OnceLock<LogRingBuffer> = OnceLock::new();

/// Get the global log buffer
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    LOG_BUFFER.get().cloned()
}

fn open_log_file(log_dir: &Path) -> Option<(File, PathBuf)> {
    let _ = std::fs::create_dir_all(log_dir);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("query-history_{}.log", timestamp));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()?;
    Some((file, log_path))
}

/// Initialize tracing into the ring buffer plus a timestamped file in `log_dir`.
/// Returns the log file path when one could be opened.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<PathBuf> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LOG_BUFFER.get_or_init(LogRingBuffer::new).clone();
    let (file, log_path) = match log_dir.and_then(open_log_file) {
        Some((file, path)) => (Some(file), Some(path)),
        None => (None, None),
    };

    let fmt_layer = fmt::layer()
        .with_writer(RingBufferWriter::new(buffer, file))
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time() // We add our own timestamps
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    tracing::info!(target: "query_history", "Logging system initialized");
    log_path
}
