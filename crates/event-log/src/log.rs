use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Entry count that triggers a trim.
///
/// Trimming in bulk keeps the common push path free of per-entry eviction.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Entries kept (newest first) when the log is trimmed.
pub const DEFAULT_RETAIN: usize = 800;

/// Event log shared between the tracing layer and the app.
pub type SharedEventLog = Arc<Mutex<EventLog>>;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl LogLevel {
    /// Lowercase name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Formats the entry as `[HH:MM:SS] [LEVEL] message` in `tz`.
    pub fn format_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let time = DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|t| t.with_timezone(tz).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".into());
        format!(
            "[{time}] [{}] {}",
            self.level.as_str().to_uppercase(),
            self.message
        )
    }
}

/// Bounded, append-only list of log entries.
///
/// Once the log grows past its capacity it is cut back to the newest
/// `retain` entries. Ids keep increasing across trims and clears.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    next_id: u64,
    capacity: usize,
    retain: usize,
}

impl EventLog {
    /// Creates an empty log with the default capacity and retain sizes.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }

    /// `retain` is clamped to `capacity`.
    pub fn with_limits(capacity: usize, retain: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Wraps a fresh log for sharing with [`EventLogLayer`](crate::EventLogLayer).
    pub fn shared() -> SharedEventLog {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Appends an entry stamped with the current time and returns its id.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> u64 {
        self.push_at(level, message, Utc::now().timestamp_millis())
    }

    /// Appends an entry with an explicit timestamp (epoch ms) and returns its id.
    pub fn push_at(&mut self, level: LogLevel, message: impl Into<String>, timestamp: i64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(LogEntry {
            id,
            timestamp,
            level,
            message: message.into(),
        });

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.retain;
            self.entries.drain(..excess);
        }
        id
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries at `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// Entries matching `level` (all when `None`) whose message contains
    /// `keyword`, case-insensitively. An empty keyword matches everything.
    pub fn filtered(&self, level: Option<LogLevel>, keyword: &str) -> Vec<&LogEntry> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|e| level.is_none_or(|l| e.level == l))
            .filter(|e| keyword.is_empty() || e.message.to_lowercase().contains(&keyword))
            .collect()
    }

    /// Drops every entry. Ids are not reused.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries as text, one `[HH:MM:SS] [LEVEL] message` line each,
    /// in local time.
    pub fn export_text(&self) -> String {
        self.export_text_in(&Local)
    }

    /// Same as [`export_text`](Self::export_text), in the given time zone.
    pub fn export_text_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.entries
            .iter()
            .map(|e| e.format_in(tz))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Writes [`export_text`](Self::export_text) to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        tokio::fs::write(path, self.export_text()).await
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Suggested file name for an exported log.
pub fn default_export_name() -> String {
    format!("patent-upload-logs-{}.txt", Utc::now().timestamp_millis())
}
