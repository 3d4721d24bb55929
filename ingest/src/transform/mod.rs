//! Transformation module.
//!
//! This module turns source documents into bulk-import tables:
//! - Extract: workbook sheets to level tables
//! - Levels: four-column level dumps
//! - Pipeline: main ingestion pipeline
//! - Postprocess: commands over generated tables (mapping template, remap,
//!   polish, normalize)

pub mod extract;
pub mod levels;
pub mod pipeline;
pub mod postprocess;

pub use extract::{extract_sheets, SheetExtractor, SheetSet};
pub use levels::{is_level_dump, level_rows, scan_level_dump};
pub use pipeline::*;
pub use postprocess::{
    normalize_dataset, normalize_tables, polish_dataset, polish_tables, remap_tables,
    write_mapping_template, PolishSummary,
};
