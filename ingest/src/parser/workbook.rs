//! Workbook reader: spreadsheet files through calamine, or a directory whose
//! `.csv` files are the sheets.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};

use super::{read_delimited_file, Sheet};
use crate::error::{SourceError, SourceResult};

/// Extensions opened through calamine.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_workbook_path(path: &Path) -> bool {
    path.is_dir()
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

fn csv_files(dir: &Path) -> SourceResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sheet names of a workbook, in workbook order.
pub fn list_sheets(path: &Path) -> SourceResult<Vec<String>> {
    if !path.exists() {
        return Err(SourceError::MissingInput(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(csv_files(path)?.iter().map(|p| sheet_name(p)).collect());
    }
    let workbook = open_workbook_auto(path).map_err(|e| SourceError::corrupt(path, e))?;
    Ok(workbook.sheet_names())
}

/// Every sheet of a workbook as row objects.
pub fn read_workbook(path: &Path) -> SourceResult<Vec<Sheet>> {
    if !path.exists() {
        return Err(SourceError::MissingInput(path.to_path_buf()));
    }
    if path.is_dir() {
        return csv_files(path)?.iter().map(|p| read_delimited_file(p)).collect();
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| SourceError::corrupt(path, e))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| SourceError::corrupt(path, format!("sheet '{}': {}", name, e)))?;

        let mut rows = range.rows().map(|row| row.iter().map(render_cell).collect::<Vec<_>>());
        let headers = match rows.next() {
            Some(headers) => headers,
            None => {
                sheets.push(Sheet { name, ..Default::default() });
                continue;
            }
        };
        sheets.push(Sheet::from_rows(name, &headers, rows));
    }
    Ok(sheets)
}

/// Cell text; whole floats lose their `.0` so codes and phone numbers survive.
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => render_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
