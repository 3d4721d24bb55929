//! Bulk-import writers and readers.
//!
//! One table per level, as CSV (`ministry.csv`, …) or as record XML
//! (`sn_ministry_data.xml`, …). Every file goes through [`write_atomic`]:
//! written to a temporary file in the target directory, then renamed.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{OutputError, OutputResult};
use crate::models::{Dataset, Level, LevelRow, OrgRecord};
use crate::text::name_key;

/// Flat four-column dump file.
pub const LEVELS_FILE: &str = "orgadmin.csv";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Xml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(format!("unknown output format '{}' (expected csv or xml)", other)),
        }
    }
}

/// Which tables to write and how.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Only this level; `None` writes every level.
    pub level: Option<Level>,
    pub with_levels: bool,
}

// =============================================================================
// Files
// =============================================================================

/// Write `bytes` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| OutputError::Persist {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;
    Ok(())
}

/// Sort by parent reference, then name key, then external id.
pub fn sort_canonical<R: OrgRecord>(records: &mut [R]) {
    records.sort_by_cached_key(|r| {
        (r.parent_ref().to_string(), name_key(r.name()), r.external_id().to_string())
    });
}

// =============================================================================
// CSV
// =============================================================================

/// Serialize records as CSV (header from the record fields).
pub fn table_to_csv<R: OrgRecord>(records: &[R]) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

fn levels_to_csv(rows: &[LevelRow]) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

// =============================================================================
// Record XML
// =============================================================================

/// Serialize records as `<odoo><data>` record XML.
///
/// Columns ending in `/id` become `ref` fields; blank values are omitted.
pub fn table_to_xml<R: OrgRecord>(records: &[R]) -> OutputResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("odoo")))?;
    writer.write_event(Event::Start(BytesStart::new("data").with_attributes([("noupdate", "0")])))?;

    for record in records {
        let row = serde_json::to_value(record)?;
        let record_start = BytesStart::new("record")
            .with_attributes([("id", record.external_id()), ("model", R::LEVEL.model())]);
        writer.write_event(Event::Start(record_start))?;

        if let Value::Object(fields) = row {
            for (key, value) in fields.iter() {
                let text = value.as_str().unwrap_or("");
                if key == "external_id" || text.is_empty() {
                    continue;
                }
                match key.strip_suffix("/id") {
                    Some(field) => {
                        let reference = BytesStart::new("field").with_attributes([("name", field), ("ref", text)]);
                        writer.write_event(Event::Empty(reference))?;
                    }
                    None => {
                        writer.write_event(Event::Start(
                            BytesStart::new("field").with_attributes([("name", key.as_str())]),
                        ))?;
                        writer.write_event(Event::Text(BytesText::new(text)))?;
                        writer.write_event(Event::End(BytesEnd::new("field")))?;
                    }
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("record")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("data")))?;
    writer.write_event(Event::End(BytesEnd::new("odoo")))?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

// =============================================================================
// Tables
// =============================================================================

/// Delete a file left by an earlier run; a missing file is fine.
fn remove_stale(path: &Path) -> OutputResult<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Write one table. An empty table writes nothing and removes the file an
/// earlier run left for it. Returns the path written.
pub fn write_table<R: OrgRecord>(
    dir: &Path,
    records: &[R],
    format: OutputFormat,
) -> OutputResult<Option<PathBuf>> {
    let path = match format {
        OutputFormat::Csv => dir.join(R::LEVEL.csv_file()),
        OutputFormat::Xml => dir.join(R::LEVEL.xml_file()),
    };
    if records.is_empty() {
        remove_stale(&path)?;
        return Ok(None);
    }
    let mut sorted = records.to_vec();
    sort_canonical(&mut sorted);

    let bytes = match format {
        OutputFormat::Csv => table_to_csv(&sorted)?,
        OutputFormat::Xml => table_to_xml(&sorted)?,
    };
    write_atomic(&path, &bytes)?;
    Ok(Some(path))
}

/// Write every requested table of a dataset.
pub fn write_dataset(dir: &Path, dataset: &Dataset, options: &OutputOptions) -> OutputResult<Vec<PathBuf>> {
    let wanted = |level: Level| options.level.map_or(true, |l| l == level);
    let mut written = Vec::new();

    if wanted(Level::Ministry) {
        written.extend(write_table(dir, &dataset.ministries, options.format)?);
    }
    if wanted(Level::Category) {
        written.extend(write_table(dir, &dataset.categories, options.format)?);
    }
    if wanted(Level::Direction) {
        written.extend(write_table(dir, &dataset.directions, options.format)?);
    }
    if wanted(Level::Service) {
        written.extend(write_table(dir, &dataset.services, options.format)?);
    }
    if wanted(Level::Agent) {
        written.extend(write_table(dir, &dataset.agents, options.format)?);
    }
    if options.with_levels {
        let path = dir.join(LEVELS_FILE);
        if dataset.level_rows.is_empty() {
            remove_stale(&path)?;
        } else {
            write_atomic(&path, &levels_to_csv(&dataset.level_rows)?)?;
            written.push(path);
        }
    }
    Ok(written)
}

/// Read a generated CSV table back; a missing file is an empty table.
pub fn read_table<R: OrgRecord>(dir: &Path) -> OutputResult<Vec<R>> {
    let path = dir.join(R::LEVEL.csv_file());
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(&path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Read every generated CSV table; the ministry table is required.
pub fn read_dataset(dir: &Path) -> OutputResult<Dataset> {
    let ministry_path = dir.join(Level::Ministry.csv_file());
    if !ministry_path.exists() {
        return Err(OutputError::MissingTable(ministry_path));
    }
    Ok(Dataset {
        ministries: read_table(dir)?,
        categories: read_table(dir)?,
        directions: read_table(dir)?,
        services: read_table(dir)?,
        agents: read_table(dir)?,
        level_rows: Vec::new(),
    })
}
