//! Ministry code mapping - operator-chosen codes applied over generated ones.
//!
//! The template lists every ministry with its current code; an operator fills
//! `desired_code` and the remap pass rewrites code, identifier and every
//! reference to the old identifier.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{MappingError, MappingResult};
use crate::ids::{external_id, prefix};
use crate::logs::log_info_indent;
use crate::models::{Dataset, Ministry};
use crate::output::write_atomic;
use crate::report::RowWarning;
use crate::text::{name_key, normalize_code};

/// Default file name of the mapping table.
pub const MAPPING_FILE: &str = "ministry_codes.csv";

/// One row of the mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_code: String,
    #[serde(default)]
    pub desired_code: String,
    #[serde(default)]
    pub notes: String,
}

/// Desired code per ministry name key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMapping {
    codes: HashMap<String, String>,
}

/// What a remap pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapSummary {
    pub remapped: usize,
    pub references_updated: usize,
    pub conflicts: Vec<RowWarning>,
}

impl CodeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (name or key, desired code). Blank codes are ignored.
    pub fn insert(&mut self, name: &str, desired_code: &str) {
        let code = normalize_code(desired_code);
        let key = name_key(name);
        if !code.is_empty() && !key.is_empty() {
            self.codes.insert(key, code);
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn desired_code(&self, name: &str) -> Option<&str> {
        self.codes.get(&name_key(name)).map(String::as_str)
    }

    /// Template rows: one per distinct ministry key, sorted by name.
    pub fn template(ministries: &[Ministry]) -> Vec<MappingRow> {
        let mut seen = HashSet::new();
        let mut rows: Vec<MappingRow> = ministries
            .iter()
            .filter(|m| seen.insert(name_key(&m.name)))
            .map(|m| MappingRow {
                key: name_key(&m.name),
                name: m.name.clone(),
                current_code: m.code.clone(),
                desired_code: String::new(),
                notes: String::new(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Write the template table. Returns the number of rows.
    pub fn write_template(path: &Path, ministries: &[Ministry]) -> MappingResult<usize> {
        let rows = Self::template(ministries);
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| MappingError::Invalid(e.to_string()))?;
        write_atomic(path, &bytes)?;
        Ok(rows.len())
    }

    /// Load a filled-in mapping table. Rows without `desired_code` are skipped.
    pub fn load(path: &Path) -> MappingResult<Self> {
        if !path.exists() {
            return Err(MappingError::NotFound(path.to_path_buf()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        for required in ["key", "desired_code"] {
            if !headers.iter().any(|h| h.trim() == required) {
                return Err(MappingError::Invalid(format!(
                    "{}: missing column '{}'",
                    path.display(),
                    required
                )));
            }
        }

        let mut mapping = Self::new();
        for row in reader.deserialize::<MappingRow>() {
            let row = row?;
            let key = if row.key.trim().is_empty() { &row.name } else { &row.key };
            mapping.insert(key, &row.desired_code);
        }
        Ok(mapping)
    }
}

impl Dataset {
    /// Rewrite ministry codes from a mapping, keeping every reference consistent.
    ///
    /// The new code and identifier replace the old ones together; category and
    /// direction references and the direction `ministry_code` column follow.
    /// A desired code already held by another ministry is refused.
    pub fn apply_code_mapping(&mut self, mapping: &CodeMapping) -> RemapSummary {
        let mut summary = RemapSummary::default();
        let mut renamed_ids: HashMap<String, (String, String)> = HashMap::new();

        for i in 0..self.ministries.len() {
            let Some(desired) = mapping.desired_code(&self.ministries[i].name) else {
                continue;
            };
            let ministry = &self.ministries[i];
            if desired == ministry.code {
                continue;
            }
            let held_elsewhere = self
                .ministries
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.code == desired);
            if held_elsewhere {
                summary.conflicts.push(RowWarning::new(
                    "ministry",
                    i + 1,
                    "code",
                    format!(
                        "'{}' keeps {}: desired code {} is already used",
                        ministry.name, ministry.code, desired
                    ),
                ));
                continue;
            }

            let new_id = external_id(&prefix::ministry(), desired, &ministry.name);
            let old_id = ministry.external_id.clone();
            let desired = desired.to_string();
            log_info_indent(format!("{} → {} ({})", ministry.code, desired, ministry.name), 1);

            let ministry = &mut self.ministries[i];
            ministry.code = desired.clone();
            ministry.external_id = new_id.clone();
            renamed_ids.insert(old_id, (new_id, desired));
            summary.remapped += 1;
        }

        if renamed_ids.is_empty() {
            return summary;
        }

        for category in &mut self.categories {
            if let Some((new_id, _)) = renamed_ids.get(&category.ministry_ref) {
                category.ministry_ref = new_id.clone();
                summary.references_updated += 1;
            }
        }
        for direction in &mut self.directions {
            if let Some((new_id, new_code)) = renamed_ids.get(&direction.ministry_ref) {
                direction.ministry_ref = new_id.clone();
                direction.ministry_code = new_code.clone();
                summary.references_updated += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Direction};

    fn dataset() -> Dataset {
        let mut data = Dataset::new();
        for (id, name, code) in [
            ("ministry_mdls", "Ministère De La Santé", "MDLS"),
            ("ministry_mdf", "Ministère Des Finances", "MDF"),
        ] {
            data.ministries.push(Ministry {
                external_id: id.into(),
                name: name.into(),
                code: code.into(),
                ..Default::default()
            });
        }
        data.categories.push(Category {
            external_id: "category_mdls_cabinet".into(),
            name: "Cabinet".into(),
            ministry_ref: "ministry_mdls".into(),
        });
        data.directions.push(Direction {
            external_id: "direction_mdls_dgdls".into(),
            name: "Direction Générale De La Santé".into(),
            code: "DGDLS".into(),
            ministry_code: "MDLS".into(),
            ministry_ref: "ministry_mdls".into(),
            ..Default::default()
        });
        data
    }

    #[test]
    fn test_template_rows() {
        let mut ministries = dataset().ministries;
        ministries.push(ministries[0].clone());
        let rows = CodeMapping::template(&ministries);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ministère De La Santé");
        assert_eq!(rows[0].key, "ministere-de-la-sante");
        assert_eq!(rows[0].current_code, "MDLS");
        assert_eq!(rows[0].desired_code, "");
    }

    #[test]
    fn test_remap_propagates_to_children() {
        let mut data = dataset();
        let mut mapping = CodeMapping::new();
        mapping.insert("ministere de la sante", "msas");

        let summary = data.apply_code_mapping(&mapping);

        assert_eq!(summary.remapped, 1);
        assert_eq!(summary.references_updated, 2);
        assert_eq!(data.ministries[0].code, "MSAS");
        assert_eq!(data.ministries[0].external_id, "ministry_msas");
        assert_eq!(data.categories[0].ministry_ref, "ministry_msas");
        assert_eq!(data.directions[0].ministry_ref, "ministry_msas");
        assert_eq!(data.directions[0].ministry_code, "MSAS");
        // child identifiers are not rewritten
        assert_eq!(data.directions[0].external_id, "direction_mdls_dgdls");
    }

    #[test]
    fn test_remap_refuses_taken_code() {
        let mut data = dataset();
        let mut mapping = CodeMapping::new();
        mapping.insert("Ministère De La Santé", "MDF");

        let summary = data.apply_code_mapping(&mapping);

        assert_eq!(summary.remapped, 0);
        assert_eq!(summary.conflicts.len(), 1);
        assert_eq!(data.ministries[0].code, "MDLS");
    }

    #[test]
    fn test_remap_is_idempotent() {
        let mut data = dataset();
        let mut mapping = CodeMapping::new();
        mapping.insert("Ministère Des Finances", "MFB");

        data.apply_code_mapping(&mapping);
        let once = data.clone();
        let summary = data.apply_code_mapping(&mapping);

        assert_eq!(summary.remapped, 0);
        assert_eq!(data, once);
    }

    #[test]
    fn test_template_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE);
        assert_eq!(CodeMapping::write_template(&path, &dataset().ministries).unwrap(), 2);

        let filled = std::fs::read_to_string(&path)
            .unwrap()
            .replace("MDLS,,", "MDLS,MSAS,");
        std::fs::write(&path, filled).unwrap();

        let mapping = CodeMapping::load(&path).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.desired_code("MINISTÈRE DE LA SANTÉ"), Some("MSAS"));
    }

    #[test]
    fn test_load_two_column_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        std::fs::write(&path, "key,desired_code
ministere-de-la-sante,msas
primature,
").unwrap();

        let mapping = CodeMapping::load(&path).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.desired_code("Ministère de la Santé"), Some("MSAS"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = CodeMapping::load(&dir.path().join("none.csv")).unwrap_err();
        assert!(matches!(missing, MappingError::NotFound(_)));

        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "name,code\nX,Y\n").unwrap();
        assert!(matches!(CodeMapping::load(&bad).unwrap_err(), MappingError::Invalid(_)));
    }
}
