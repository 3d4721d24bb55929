//! Run log shared by every pipeline stage.
//!
//! Entries are printed to stderr as they happen and kept in memory so the
//! whole run can be written to an audit log next to the generated tables.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "OK",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Utc>,
    /// Nesting level for display
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), at: Utc::now(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// One line of the audit log file.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} - {} - {}{}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.level.label(),
            "  ".repeat(self.indent as usize),
            self.message
        )
    }
}

/// Global run log
pub static RUN_LOG: Lazy<RunLog> = Lazy::new(RunLog::new);

/// Prints entries and retains them for the audit file
pub struct RunLog {
    entries: Mutex<Vec<LogEntry>>,
    verbose: AtomicBool,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            verbose: AtomicBool::new(false),
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Record an entry, echoing it to stderr unless it is a debug entry in quiet mode
    pub fn log(&self, entry: LogEntry) {
        self.echo(&entry);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Print an entry without retaining it
    pub fn echo(&self, entry: &LogEntry) {
        if entry.level != LogLevel::Debug || self.is_verbose() {
            let prefix = match entry.level {
                LogLevel::Debug => "   ·",
                LogLevel::Info => "   ",
                LogLevel::Success => "   ✓",
                LogLevel::Warning => "   ⚠️",
                LogLevel::Error => "   ❌",
            };
            let indent = "   ".repeat(entry.indent as usize);
            eprintln!("{}{} {}", indent, prefix, entry.message);
        }
    }

    /// Drain every retained entry
    pub fn take_entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn set_verbose(verbose: bool) {
    RUN_LOG.set_verbose(verbose);
}

pub fn take_entries() -> Vec<LogEntry> {
    RUN_LOG.take_entries()
}

/// Debug line for the console only; it is not kept for the audit log.
pub fn echo_debug(msg: impl Into<String>) {
    RUN_LOG.echo(&LogEntry::new(LogLevel::Debug, msg));
}

pub fn log_debug(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Debug, msg));
}

pub fn log_info(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    RUN_LOG.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_retained_and_drained() {
        let log = RunLog::new();
        log.log(LogEntry::new(LogLevel::Info, "reading sheet"));
        log.log(LogEntry::new(LogLevel::Debug, "row 3: blank phone"));

        let entries = log.take_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].level, LogLevel::Debug);
        assert!(log.take_entries().is_empty());
    }

    #[test]
    fn test_log_line_format() {
        let line = LogEntry::new(LogLevel::Warning, "unresolved ministry").with_indent(1).to_log_line();
        assert!(line.contains(" - WARN - "));
        assert!(line.ends_with("  unresolved ministry"));
    }
}
