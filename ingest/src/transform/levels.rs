//! Four-column level dumps (`Niveau 1..4` / `level1..4`).
//!
//! Each row names a ministry, an optional category, a direction and a service.
//! Rows feed the same [`HierarchyBuilder`] as the text scanner.

use crate::hierarchy::{HierarchyBuilder, ScanStats};
use crate::models::{Dataset, LevelRow};
use crate::parser::{cell, Sheet};

const LEVEL_COLUMN_PREFIXES: &[&str] = &["niveau_", "niveau", "level_", "level"];

/// Normalized column names of levels 1 to 4, when the sheet has all four.
pub fn level_columns(sheet: &Sheet) -> Option<[String; 4]> {
    LEVEL_COLUMN_PREFIXES.iter().find_map(|prefix| {
        let columns = [1, 2, 3, 4].map(|n| format!("{}{}", prefix, n));
        columns.iter().all(|c| sheet.has_column(c)).then_some(columns)
    })
}

pub fn is_level_dump(sheet: &Sheet) -> bool {
    level_columns(sheet).is_some()
}

/// Rows of a level dump. Empty when the sheet is not one.
pub fn level_rows(sheet: &Sheet) -> Vec<LevelRow> {
    let Some([c1, c2, c3, c4]) = level_columns(sheet) else {
        return Vec::new();
    };
    sheet
        .rows
        .iter()
        .map(|row| LevelRow {
            level1: cell(row, &c1).to_string(),
            level2: cell(row, &c2).to_string(),
            level3: cell(row, &c3).to_string(),
            level4: cell(row, &c4).to_string(),
        })
        .collect()
}

/// Build the hierarchy from a level dump.
pub fn scan_level_dump(sheet: &Sheet) -> (Dataset, ScanStats) {
    let mut builder = HierarchyBuilder::new();
    for row in level_rows(sheet) {
        builder.push_level_row(&row);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_delimited;

    const DUMP: &str = "\
Niveau 1;Niveau 2;Niveau 3;Niveau 4
MINISTÈRE DE LA SANTÉ;Cabinet;Direction générale de la Santé;Service des Ressources Humaines;
MINISTÈRE DE LA SANTÉ;Cabinet;Direction générale de la Santé;Bureau du Courrier
MINISTÈRE DE LA SANTÉ;;;Service orphelin
;;;
";

    #[test]
    fn test_detects_level_columns() {
        let sheet = parse_delimited("orgadmin", DUMP, ';').unwrap();
        assert!(is_level_dump(&sheet));

        let other = parse_delimited("x", "level1,level2,level3,level4\nA,B,C,D\n", ',').unwrap();
        assert_eq!(level_columns(&other).unwrap()[0], "level1");

        let plain = parse_delimited("x", "nom;code\nSanté;MSAS\n", ';').unwrap();
        assert!(!is_level_dump(&plain));
        assert!(level_rows(&plain).is_empty());
    }

    #[test]
    fn test_dump_builds_nested_tables() {
        let sheet = parse_delimited("orgadmin", DUMP, ';').unwrap();
        let (data, stats) = scan_level_dump(&sheet);

        assert_eq!(data.ministries.len(), 1);
        assert_eq!(data.ministries[0].name, "Ministère De La Santé");
        assert_eq!(data.categories.len(), 1);
        assert_eq!(data.directions.len(), 1);
        assert_eq!(data.directions[0].category_ref, data.categories[0].external_id);
        assert_eq!(data.services.len(), 2);
        assert_eq!(data.services[0].name, "Service Des Ressources Humaines");
        assert!(data.services.iter().all(|s| s.direction_ref == data.directions[0].external_id));
        // a service with no direction is an orphan
        assert_eq!(stats.orphans_dropped, 1);
    }
}
