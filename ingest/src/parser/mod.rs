//! Source readers with encoding and delimiter auto-detection.
//!
//! Every tabular source (delimited file, workbook sheet, directory of CSV
//! files) ends up as a [`Sheet`]: normalized column names plus one JSON
//! object per row. Line-oriented sources (plain text, word-processor
//! documents) end up as [`docx::Paragraph`] lists.

pub mod docx;
pub mod workbook;

use serde_json::{json, Map, Value};
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::text::normalize_column_name;

pub use docx::{read_docx, Paragraph};
pub use workbook::{list_sheets, read_workbook};

/// Delimited-text parsing error with its line
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
        ParseError::new(line, err.to_string())
    }
}

// =============================================================================
// Tabular sources
// =============================================================================

/// One table of a source: a workbook sheet or a delimited file.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    /// Sheet name (file stem for delimited files)
    pub name: String,
    /// Normalized column names, in source order
    pub headers: Vec<String>,
    /// Row objects keyed by normalized column name
    pub rows: Vec<Value>,
}

impl Sheet {
    /// Build a sheet from a raw header row and raw value rows.
    ///
    /// Headers are normalized; when two headers normalize to the same name the
    /// first column wins. Rows with no non-blank cell are skipped.
    pub fn from_rows<I>(name: impl Into<String>, raw_headers: &[String], rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let headers: Vec<String> = raw_headers.iter().map(|h| normalize_column_name(h)).collect();
        let mut records = Vec::new();

        for values in rows {
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            let mut obj = Map::new();
            for (i, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let raw_value = values.get(i).map(|s| s.trim()).unwrap_or("");
                obj.entry(header.clone()).or_insert_with(|| json!(raw_value));
            }
            records.push(Value::Object(obj));
        }

        Self {
            name: name.into(),
            headers,
            rows: records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// String value of a row cell, blank when absent.
pub fn cell<'a>(row: &'a Value, column: &str) -> &'a str {
    row.get(column).and_then(Value::as_str).unwrap_or("").trim()
}

/// First non-blank value among candidate columns.
pub fn first_cell<'a>(row: &'a Value, candidates: &[&str]) -> &'a str {
    candidates
        .iter()
        .map(|c| cell(row, c))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

// =============================================================================
// Encoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding, dropping any BOM.
///
/// Valid UTF-8 is always taken as UTF-8: detection on short French samples
/// regularly reports a Latin charset for UTF-8 input.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            // Undetected legacy input is nearly always cp1252 in office exports
            None => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        },
    }
}

/// Read a whole text file with encoding auto-detection.
pub fn read_text_file(path: &Path) -> SourceResult<String> {
    if !path.exists() {
        return Err(SourceError::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let encoding = detect_encoding(&bytes);
    Ok(decode_content(&bytes, &encoding))
}

/// Lines of a plain-text organizational chart.
pub fn read_text_lines(path: &Path) -> SourceResult<Vec<String>> {
    Ok(read_text_file(path)?.lines().map(str::to_string).collect())
}

// =============================================================================
// Delimited text
// =============================================================================

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text into a sheet with an explicit delimiter.
pub fn parse_delimited(name: &str, content: &str, delimiter: char) -> Result<Sheet, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::new(1, "Empty delimited file"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if raw_headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::new(1, "No headers found"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(Sheet::from_rows(name, &raw_headers, rows))
}

/// Parse a delimited file with auto-detection of encoding and delimiter.
pub fn read_delimited_file(path: &Path) -> SourceResult<Sheet> {
    let content = read_text_file(path)?;
    let delimiter = detect_delimiter(&content);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parse_delimited(&name, &content, delimiter)?)
}
