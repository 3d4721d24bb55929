//! Commands run over tables already generated in an output directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::PipelineResult;
use crate::logs::{log_info, log_success, take_entries};
use crate::mapping::{CodeMapping, RemapSummary, MAPPING_FILE};
use crate::models::{Dataset, OrgRecord};
use crate::output::{read_dataset, write_dataset, OutputOptions};
use crate::report::{RowWarning, RunReport};
use crate::text::{name_key, normalize_code, normalize_name};
use crate::validation::{validate_email, validate_phone, validate_url, FixMode};

/// Write the code-mapping template for the generated ministries.
pub fn write_mapping_template(dir: &Path, out: Option<&Path>) -> PipelineResult<(PathBuf, usize)> {
    let dataset = read_dataset(dir)?;
    let path = out.map(Path::to_path_buf).unwrap_or_else(|| dir.join(MAPPING_FILE));
    let rows = CodeMapping::write_template(&path, &dataset.ministries)?;
    Ok((path, rows))
}

/// Apply a code mapping to generated tables and rewrite them.
pub fn remap_tables(dir: &Path, mapping: &Path) -> PipelineResult<RemapSummary> {
    let mapping = CodeMapping::load(mapping)?;
    let mut dataset = read_dataset(dir)?;
    log_info(format!("🔁 Applying {} mapping entries", mapping.len()));

    let summary = dataset.apply_code_mapping(&mapping);
    if summary.remapped > 0 {
        write_dataset(dir, &dataset, &OutputOptions::default())?;
    }
    Ok(summary)
}

// =============================================================================
// Polish
// =============================================================================

/// What a polish pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolishSummary {
    pub renamed: usize,
    pub codes_fixed: usize,
    pub duplicates_removed: usize,
    pub references_moved: usize,
}

fn polish_names<R: OrgRecord>(records: &mut [R], summary: &mut PolishSummary) {
    for record in records.iter_mut() {
        let name = normalize_name(record.name());
        if name != record.name() {
            *record.name_mut() = name;
            summary.renamed += 1;
        }
        if let Some(code) = record.code_mut() {
            let fixed = normalize_code(code);
            if fixed != *code {
                *code = fixed;
                summary.codes_fixed += 1;
            }
        }
    }
}

/// Drop later records with the same parent and name. Returns dropped id → kept id.
fn dedup_table<R: OrgRecord>(records: &mut Vec<R>) -> HashMap<String, String> {
    let mut kept: HashMap<(String, String), String> = HashMap::new();
    let mut moved = HashMap::new();
    records.retain(|r| {
        let key = (r.parent_ref().to_string(), name_key(r.name()));
        match kept.get(&key) {
            Some(first) => {
                moved.insert(r.external_id().to_string(), first.clone());
                false
            }
            None => {
                kept.insert(key, r.external_id().to_string());
                true
            }
        }
    });
    moved
}

fn move_ref(reference: &mut String, moved: &HashMap<String, String>, count: &mut usize) {
    if let Some(kept) = moved.get(reference.as_str()) {
        *reference = kept.clone();
        *count += 1;
    }
}

/// Title-case names, re-normalize codes and drop duplicates in memory.
pub fn polish_dataset(dataset: &mut Dataset) -> PolishSummary {
    let mut summary = PolishSummary::default();
    polish_names(&mut dataset.ministries, &mut summary);
    polish_names(&mut dataset.categories, &mut summary);
    polish_names(&mut dataset.directions, &mut summary);
    polish_names(&mut dataset.services, &mut summary);
    polish_names(&mut dataset.agents, &mut summary);

    // parents first, so children are compared under their final parent
    let refs = &mut summary.references_moved;
    let ministries = dedup_table(&mut dataset.ministries);
    for c in &mut dataset.categories {
        move_ref(&mut c.ministry_ref, &ministries, refs);
    }
    let categories = dedup_table(&mut dataset.categories);
    for d in &mut dataset.directions {
        move_ref(&mut d.ministry_ref, &ministries, refs);
        move_ref(&mut d.category_ref, &categories, refs);
    }
    let directions = dedup_table(&mut dataset.directions);
    for s in &mut dataset.services {
        move_ref(&mut s.direction_ref, &directions, refs);
    }
    let services = dedup_table(&mut dataset.services);
    for a in &mut dataset.agents {
        move_ref(&mut a.service_ref, &services, refs);
    }
    let agents = dedup_table(&mut dataset.agents);

    summary.duplicates_removed =
        ministries.len() + categories.len() + directions.len() + services.len() + agents.len();
    summary
}

/// Polish generated tables in place.
pub fn polish_tables(dir: &Path) -> PipelineResult<PolishSummary> {
    let mut dataset = read_dataset(dir)?;
    let summary = polish_dataset(&mut dataset);
    write_dataset(dir, &dataset, &OutputOptions::default())?;
    Ok(summary)
}

// =============================================================================
// Normalize
// =============================================================================

type Validator = fn(&str, FixMode) -> (String, Option<String>);

fn revalidate(field: &mut String, validator: Validator, mode: FixMode, warning: RowWarning, report: &mut RunReport) {
    let (value, problem) = validator(field, mode);
    if let Some(message) = problem {
        report.warn(RowWarning { message, ..warning });
    }
    *field = value;
}

/// Re-validate every contact field of a dataset.
pub fn normalize_dataset(dataset: &mut Dataset, mode: FixMode, report: &mut RunReport) {
    let w = |table: &str, row: usize, field: &str| RowWarning::new(table, row + 1, field, "");

    for (i, m) in dataset.ministries.iter_mut().enumerate() {
        revalidate(&mut m.phone, validate_phone, mode, w("ministry", i, "phone"), report);
        revalidate(&mut m.email, validate_email, mode, w("ministry", i, "email"), report);
        revalidate(&mut m.website, validate_url, mode, w("ministry", i, "website"), report);
    }
    for (i, d) in dataset.directions.iter_mut().enumerate() {
        revalidate(&mut d.phone, validate_phone, mode, w("direction", i, "phone"), report);
        revalidate(&mut d.email, validate_email, mode, w("direction", i, "email"), report);
    }
    for (i, s) in dataset.services.iter_mut().enumerate() {
        revalidate(&mut s.phone, validate_phone, mode, w("service", i, "phone"), report);
        revalidate(&mut s.email, validate_email, mode, w("service", i, "email"), report);
    }
    for (i, a) in dataset.agents.iter_mut().enumerate() {
        revalidate(&mut a.work_phone, validate_phone, mode, w("agent", i, "work_phone"), report);
        revalidate(&mut a.mobile_phone, validate_phone, mode, w("agent", i, "mobile_phone"), report);
        revalidate(&mut a.work_email, validate_email, mode, w("agent", i, "work_email"), report);
    }
}

/// Re-validate contact fields of generated tables, rewrite them and write
/// the quality report.
pub fn normalize_tables(dir: &Path, mode: FixMode) -> PipelineResult<RunReport> {
    let mut dataset = read_dataset(dir)?;
    let mut report = RunReport::new(dir.display().to_string());

    normalize_dataset(&mut dataset, mode, &mut report);
    report.record_counts(&dataset);
    write_dataset(dir, &dataset, &OutputOptions::default())?;
    log_success(format!("{} warnings", report.warnings.len()));
    report.write_files(dir, &take_entries())?;
    Ok(report)
}
