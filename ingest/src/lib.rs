//! # snadmin - Senegal public administration ingestion
//!
//! Turns organizational charts (plain text, word-processor documents) and
//! spreadsheet workbooks into five bulk-import tables: ministries, categories,
//! directions, services and agents, linked by external identifiers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│   Parser    │────▶│  Classify / │────▶│  CSV / XML  │
//! │ txt/docx/xl │     │  (auto-enc) │     │  Extract    │     │  (5 tables) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                   ids · resolve · validation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use snadmin::{ingest, PipelineOptions};
//! use std::path::Path;
//!
//! let outcome = ingest(
//!     Path::new("organigramme.txt"),
//!     Path::new("data/generated"),
//!     &PipelineOptions::default(),
//! )?;
//! println!("{}", outcome.report.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Records of the five levels
//! - [`parser`] - Text, document, workbook and delimited readers
//! - [`text`] - Name and code normalization
//! - [`classify`] - Line classifier for organizational charts
//! - [`hierarchy`] - Ancestor stack and record emission
//! - [`ids`] - Codes and external identifiers
//! - [`resolve`] - Parent lookup and referential integrity
//! - [`validation`] - Contact fields and table schemas
//! - [`mapping`] - Ministry code remapping
//! - [`output`] - Bulk-import writers and readers
//! - [`report`] - Run report and quality report
//! - [`transform`] - Sheet extraction, pipeline and post-processing

// Core modules
pub mod error;
pub mod logs;
pub mod models;
pub mod report;

// Reading
pub mod parser;
pub mod text;

// Hierarchy
pub mod classify;
pub mod hierarchy;
pub mod ids;
pub mod resolve;

// Validation
pub mod validation;

// Output
pub mod mapping;
pub mod output;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    MappingError, OutputError, PipelineError, PipelineResult, SourceError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Agent, Category, Dataset, Direction, DirectionType, LevelRow, Level, Ministry,
    MinistryType, OrgRecord, Service, ServiceType,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, list_sheets, parse_delimited,
    read_delimited_file, read_docx, read_text_lines, read_workbook, ParseError, Sheet,
};

// =============================================================================
// Re-exports - Hierarchy
// =============================================================================

pub use classify::{classify, Classification, ClassifyContext};
pub use hierarchy::{HierarchyBuilder, ScanStats};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate_email, validate_phone, validate_record, validate_url, FixMode};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use mapping::{CodeMapping, RemapSummary};
pub use output::{read_dataset, write_dataset, OutputFormat, OutputOptions};
pub use report::{RowWarning, RunReport};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    ingest, list_source_sheets, normalize_tables, polish_tables, remap_tables,
    write_mapping_template, IngestOutcome, PipelineOptions, PolishSummary, SourceKind,
};
