//! High-level ingestion pipeline.
//!
//! Combines every stage for one source document:
//! reading, classification or sheet extraction, hierarchy assembly, optional
//! renaming and remapping, reference checks, schema checks and output.
//!
//! # Example
//!
//! ```rust,ignore
//! use snadmin::transform::{ingest, PipelineOptions};
//! use std::path::Path;
//!
//! let outcome = ingest(
//!     Path::new("organigramme.docx"),
//!     Path::new("data/generated"),
//!     &PipelineOptions::default(),
//! )?;
//! println!("{}", outcome.report.summary());
//! ```

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult, SourceError};
use crate::hierarchy::HierarchyBuilder;
use crate::logs::{log_debug, log_error, log_info, log_success, log_warning, take_entries};
use crate::mapping::CodeMapping;
use crate::models::{Dataset, Level, OrgRecord};
use crate::output::{write_dataset, OutputFormat, OutputOptions};
use crate::parser::workbook::is_workbook_path;
use crate::parser::{list_sheets, read_delimited_file, read_docx, read_text_lines, read_workbook, Sheet};
use crate::report::{RowWarning, RunReport};
use crate::resolve::enforce_referential_integrity;
use crate::text::normalize_name;
use crate::validation::{validate_record, FixMode};

use super::extract::{extract_sheets, SheetSet};
use super::levels::{is_level_dump, scan_level_dump};

/// Options for the ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// What to do with invalid contact fields
    pub fix_mode: FixMode,

    /// Apply title casing (acronyms, French function words) to every name
    pub smart_case: bool,

    /// Only write this level
    pub level: Option<Level>,

    pub format: OutputFormat,

    /// Also write the flat four-column dump
    pub with_levels: bool,

    /// Code-mapping table applied as a remap pass
    pub mapping: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.format,
            level: self.level,
            with_levels: self.with_levels,
        }
    }
}

/// How a source document is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain-text organizational chart
    Text,
    /// Word-processor document with list numbering
    Document,
    /// Spreadsheet workbook or directory of CSV sheets
    Workbook,
    /// Single delimited file (level dump or one sheet)
    Delimited,
}

impl SourceKind {
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::MissingInput(path.to_path_buf()));
        }
        if is_workbook_path(path) {
            return Ok(SourceKind::Workbook);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "text" => Ok(SourceKind::Text),
            "docx" => Ok(SourceKind::Document),
            "csv" | "tsv" => Ok(SourceKind::Delimited),
            "" => Err(SourceError::UnsupportedFormat(format!("{} (no extension)", path.display()))),
            other => Err(SourceError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Result of a complete ingestion run
#[derive(Debug)]
pub struct IngestOutcome {
    pub report: RunReport,
    pub dataset: Dataset,
    /// Files written, tables first
    pub written: Vec<PathBuf>,
}

// =============================================================================
// Stages
// =============================================================================

fn scan_sheets(sheets: Vec<Sheet>, mode: FixMode, report: &mut RunReport) -> Dataset {
    let set = SheetSet::select(sheets);
    if let Some(dump) = set.level_dump() {
        log_info(format!("📋 Sheet '{}' is a level dump", dump.name));
        let (dataset, stats) = scan_level_dump(dump);
        stats.merge_into(report);
        return dataset;
    }
    extract_sheets(&set, mode, report)
}

/// Read a source document into a dataset. Row-level problems go to `report`.
pub fn extract(path: &Path, options: &PipelineOptions, report: &mut RunReport) -> PipelineResult<Dataset> {
    let kind = SourceKind::detect(path)?;
    log_info(format!("📖 Reading {} ({:?})", path.display(), kind));

    let dataset = match kind {
        SourceKind::Text => {
            let lines = read_text_lines(path)?;
            log_success(format!("Read {} lines", lines.len()));
            let mut builder = HierarchyBuilder::new();
            builder.scan_lines(&lines);
            let (dataset, stats) = builder.finish();
            stats.merge_into(report);
            dataset
        }
        SourceKind::Document => {
            let paragraphs = read_docx(path)?;
            log_success(format!("Read {} paragraphs", paragraphs.len()));
            let mut builder = HierarchyBuilder::new();
            builder.scan_paragraphs(&paragraphs);
            let (dataset, stats) = builder.finish();
            stats.merge_into(report);
            dataset
        }
        SourceKind::Workbook => {
            let sheets = read_workbook(path)?;
            if sheets.is_empty() {
                return Err(PipelineError::NoSheets(path.to_path_buf()));
            }
            log_success(format!("Read {} sheets", sheets.len()));
            scan_sheets(sheets, options.fix_mode, report)
        }
        SourceKind::Delimited => {
            let sheet = read_delimited_file(path)?;
            log_success(format!("Read {} rows", sheet.rows.len()));
            log_debug(format!("Columns: {}", sheet.headers.join(", ")));
            if is_level_dump(&sheet) {
                let (dataset, stats) = scan_level_dump(&sheet);
                stats.merge_into(report);
                dataset
            } else {
                scan_sheets(vec![sheet], options.fix_mode, report)
            }
        }
    };
    Ok(dataset)
}

fn retitle<R: OrgRecord>(records: &mut [R]) {
    for record in records {
        let name = normalize_name(record.name());
        *record.name_mut() = name;
    }
}

/// Rename every record (and dump row) with the title-casing rules.
pub fn apply_smart_case(dataset: &mut Dataset) {
    retitle(&mut dataset.ministries);
    retitle(&mut dataset.categories);
    retitle(&mut dataset.directions);
    retitle(&mut dataset.services);
    retitle(&mut dataset.agents);
    for row in &mut dataset.level_rows {
        for cell in [&mut row.level1, &mut row.level2, &mut row.level3, &mut row.level4] {
            *cell = normalize_name(cell);
        }
    }
}

fn check_table<R: OrgRecord>(records: &[R], report: &mut RunReport) {
    for (i, record) in records.iter().enumerate() {
        if let Err(errors) = validate_record(record) {
            report.schema_failures += 1;
            report.warn(RowWarning::new(R::LEVEL.prefix(), i + 1, "schema", errors.join("; ")));
        }
    }
}

/// Check every record against its table schema. Failures are reported only.
pub fn check_schemas(dataset: &Dataset, report: &mut RunReport) {
    check_table(&dataset.ministries, report);
    check_table(&dataset.categories, report);
    check_table(&dataset.directions, report);
    check_table(&dataset.services, report);
    check_table(&dataset.agents, report);
}

/// Sheet names of a tabular source (dry run).
pub fn list_source_sheets(path: &Path) -> PipelineResult<Vec<String>> {
    match SourceKind::detect(path)? {
        SourceKind::Workbook => Ok(list_sheets(path)?),
        SourceKind::Delimited => Ok(vec![read_delimited_file(path)?.name]),
        _ => Err(SourceError::UnsupportedFormat(format!("{} has no sheets", path.display())).into()),
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Ingest one source document into bulk-import tables under `output_dir`.
///
/// 1. Loads the code mapping, when given (before any work, so a bad path fails fast)
/// 2. Extracts the dataset
/// 3. Renames (smart case) and remaps codes
/// 4. Clears dangling references and checks schemas
/// 5. Writes the tables, the quality report and the audit log
pub fn ingest(input: &Path, output_dir: &Path, options: &PipelineOptions) -> PipelineResult<IngestOutcome> {
    let mapping = options.mapping.as_deref().map(CodeMapping::load).transpose()?;
    let mut report = RunReport::new(input.display().to_string());

    let mut dataset = extract(input, options, &mut report)?;
    if dataset.is_empty() {
        log_error(format!("Nothing extracted: {}", report.summary().trim_end()));
        return Err(PipelineError::EmptyInput(input.to_path_buf()));
    }

    if options.smart_case {
        apply_smart_case(&mut dataset);
    }
    if let Some(mapping) = mapping {
        log_info(format!("🔁 Applying code mapping ({} entries)", mapping.len()));
        let summary = dataset.apply_code_mapping(&mapping);
        log_success(format!(
            "{} ministries remapped, {} references updated",
            summary.remapped, summary.references_updated
        ));
        report.warn_all(summary.conflicts);
    }

    enforce_referential_integrity(&mut dataset, &mut report);
    check_schemas(&dataset, &mut report);
    report.record_counts(&dataset);
    if report.schema_failures > 0 {
        log_warning(format!("{} records failed schema validation", report.schema_failures));
    }

    let written = write_dataset(output_dir, &dataset, &options.output_options())?;
    for path in &written {
        log_success(format!("Wrote {}", path.display()));
    }
    report.write_files(output_dir, &take_entries())?;

    Ok(IngestOutcome { report, dataset, written })
}
