//! Per-run report: counts, drop reasons and row-level warnings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::OutputResult;
use crate::logs::{echo_debug, LogEntry};
use crate::models::{Dataset, Level};
use crate::output::write_atomic;

/// Warnings listed in the quality report before the remainder is summarized.
const QUALITY_REPORT_LIMIT: usize = 50;

pub const QUALITY_REPORT_FILE: &str = "quality_report.txt";
pub const AUDIT_LOG_FILE: &str = "ingest.log";

/// A recoverable problem on one row (or line) of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    pub table: String,
    /// 1-based row or line number in the source, 0 when not applicable
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl RowWarning {
    pub fn new(
        table: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.row > 0 {
            write!(f, "{} row {}: {}: {}", self.table, self.row, self.field, self.message)
        } else {
            write!(f, "{}: {}: {}", self.table, self.field, self.message)
        }
    }
}

/// Everything an operator needs to review a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub counts: BTreeMap<Level, usize>,
    pub lines_scanned: usize,
    pub lines_blank: usize,
    pub legal_clauses: usize,
    pub unclassified: usize,
    pub orphans_dropped: usize,
    pub duplicates_dropped: usize,
    pub unresolved_refs: usize,
    pub schema_failures: usize,
    pub warnings: Vec<RowWarning>,
}

impl RunReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            source: source.into(),
            counts: BTreeMap::new(),
            lines_scanned: 0,
            lines_blank: 0,
            legal_clauses: 0,
            unclassified: 0,
            orphans_dropped: 0,
            duplicates_dropped: 0,
            unresolved_refs: 0,
            schema_failures: 0,
            warnings: Vec::new(),
        }
    }

    /// Record a row-level warning. It reaches the audit log through
    /// [`RunReport::write_files`], the console only in verbose mode.
    pub fn warn(&mut self, warning: RowWarning) {
        echo_debug(warning.to_string());
        self.warnings.push(warning);
    }

    pub fn warn_all(&mut self, warnings: impl IntoIterator<Item = RowWarning>) {
        for w in warnings {
            self.warn(w);
        }
    }

    pub fn record_counts(&mut self, dataset: &Dataset) {
        for level in Level::ALL {
            self.counts.insert(level, dataset.count(level));
        }
    }

    pub fn count(&self, level: Level) -> usize {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Human-readable end-of-run summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run {} ({})\n", self.run_id, self.source));
        for level in Level::ALL {
            out.push_str(&format!("  {:<12} {}\n", level.label(), self.count(level)));
        }
        if self.lines_scanned > 0 {
            out.push_str(&format!(
                "  lines: {} scanned, {} blank, {} legal clauses, {} unclassified\n",
                self.lines_scanned, self.lines_blank, self.legal_clauses, self.unclassified
            ));
        }
        out.push_str(&format!(
            "  dropped: {} orphans, {} duplicates\n",
            self.orphans_dropped, self.duplicates_dropped
        ));
        out.push_str(&format!("  unresolved references: {}\n", self.unresolved_refs));
        out.push_str(&format!("  schema failures: {}\n", self.schema_failures));
        out.push_str(&format!("  warnings: {}\n", self.warnings.len()));
        out
    }

    /// Quality report text: counts, then the first warnings.
    pub fn quality_report(&self) -> String {
        let mut out = String::from("DATA QUALITY REPORT\n");
        out.push_str(&format!("Generated: {}\n", self.started_at.format("%Y-%m-%d %H:%M:%S UTC")));
        out.push_str(&format!("Source: {}\n\n", self.source));
        out.push_str(&self.summary());
        out.push('\n');

        if self.warnings.is_empty() {
            out.push_str("✓ No warnings\n");
            return out;
        }

        out.push_str(&format!("⚠ {} warnings:\n", self.warnings.len()));
        for w in self.warnings.iter().take(QUALITY_REPORT_LIMIT) {
            out.push_str(&format!("  - {}\n", w));
        }
        if self.warnings.len() > QUALITY_REPORT_LIMIT {
            out.push_str(&format!("  ... and {} more\n", self.warnings.len() - QUALITY_REPORT_LIMIT));
        }
        out
    }

    /// Write the quality report and the audit log into `dir`.
    pub fn write_files(&self, dir: &Path, log_entries: &[LogEntry]) -> OutputResult<()> {
        write_atomic(&dir.join(QUALITY_REPORT_FILE), self.quality_report().as_bytes())?;

        let mut log = String::new();
        for entry in log_entries {
            log.push_str(&entry.to_log_line());
            log.push('\n');
        }
        for w in &self.warnings {
            log.push_str(&format!("WARN {}\n", w));
        }
        write_atomic(&dir.join(AUDIT_LOG_FILE), log.as_bytes())
    }
}
