//! Error types for the ingestion pipeline.
//!
//! - [`SourceError`] - reading and decoding source documents
//! - [`OutputError`] - writing (and reading back) bulk-import tables
//! - [`MappingError`] - code-mapping tables used by the remap pass
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Only fatal conditions are errors. Row-level problems (bad phone, unresolved
//! parent, unclassified line) are recorded in the [`crate::report::RunReport`]
//! and never surface here.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while reading a source document.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Required input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// File exists but its content cannot be interpreted.
    #[error("Corrupt or unreadable document '{}': {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// Extension or content type not handled.
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Delimited text could not be parsed.
    #[error("Invalid delimited text: {0}")]
    Parse(#[from] crate::parser::ParseError),
}

impl SourceError {
    pub fn corrupt(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SourceError::Corrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing or re-reading generated tables.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Temporary file could not be moved into place.
    #[error("Failed to persist '{}': {message}", path.display())]
    Persist { path: PathBuf, message: String },

    /// A table the command needs was never generated.
    #[error("Generated table not found: {}", .0.display())]
    MissingTable(PathBuf),
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Errors from the code-mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid mapping table: {0}")]
    Invalid(String),

    #[error("Mapping CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Mapping IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mapping output error: {0}")]
    Output(#[from] OutputError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors. Any of these aborts the run with a non-zero exit.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Workbook without any sheet.
    #[error("Workbook has no sheets: {}", .0.display())]
    NoSheets(PathBuf),

    /// Nothing could be extracted from the document.
    #[error("No entity detected in {}: provide a structured workbook or a document with bulleted lists", .0.display())]
    EmptyInput(PathBuf),
}

impl PipelineError {
    /// Process exit code for this error: 2 when a required input is missing.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Source(SourceError::MissingInput(_))
            | PipelineError::Output(OutputError::MissingTable(_))
            | PipelineError::Mapping(MappingError::NotFound(_)) => 2,
            _ => 1,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source reading.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for table output.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
