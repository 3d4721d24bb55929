//! Cross-reference resolution between tables.
//!
//! A [`ParentIndex`] is built once per parent table; child rows look their
//! parent up by code first, then by name. Misses leave the reference blank
//! and are reported, never fatal.

use std::collections::{HashMap, HashSet};

use crate::models::{Dataset, Level, OrgRecord};
use crate::report::{RowWarning, RunReport};
use crate::text::{name_key, normalize_code};

/// Lookup of a parent table by normalized code and by name key.
#[derive(Debug, Default, Clone)]
pub struct ParentIndex {
    level: Option<Level>,
    by_code: HashMap<String, String>,
    by_name: HashMap<String, String>,
    /// Codes carried by more than one record.
    shared_codes: HashSet<String>,
}

impl ParentIndex {
    /// Index a parent table. The first record wins on duplicate keys.
    pub fn build<R: OrgRecord>(records: &[R]) -> Self {
        let mut index = Self { level: Some(R::LEVEL), ..Default::default() };
        for record in records {
            let id = record.external_id().to_string();
            let code = normalize_code(record.code());
            if !code.is_empty() {
                match index.by_code.get(&code) {
                    Some(first) if *first != id => {
                        index.shared_codes.insert(code);
                    }
                    Some(_) => {}
                    None => {
                        index.by_code.insert(code, id.clone());
                    }
                }
            }
            let key = name_key(record.name());
            if !key.is_empty() {
                index.by_name.entry(key).or_insert(id);
            }
        }
        index
    }

    /// One index per scope, e.g. the directions of each ministry.
    pub fn by_scope<R: OrgRecord>(records: &[R], scope: impl Fn(&R) -> &str) -> HashMap<String, ParentIndex> {
        let mut groups: HashMap<String, Vec<R>> = HashMap::new();
        for record in records {
            groups.entry(scope(record).to_string()).or_default().push(record.clone());
        }
        groups.into_iter().map(|(key, group)| (key, Self::build(&group))).collect()
    }

    /// Whether more than one record carries this code.
    pub fn is_shared_code(&self, code: &str) -> bool {
        self.shared_codes.contains(&normalize_code(code))
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty() && self.by_name.is_empty()
    }

    /// Parent external id for a (code, name) reference.
    pub fn resolve(&self, code: &str, name: &str) -> Option<&str> {
        let code = normalize_code(code);
        if !code.is_empty() {
            if let Some(id) = self.by_code.get(&code) {
                return Some(id.as_str());
            }
        }
        let key = name_key(name);
        if key.is_empty() {
            return None;
        }
        self.by_name.get(&key).map(String::as_str)
    }

    /// Resolve, recording a warning and counting the miss when nothing matches.
    pub fn resolve_or_warn(
        &self,
        code: &str,
        name: &str,
        warning: RowWarning,
        report: &mut RunReport,
    ) -> String {
        match self.resolve(code, name) {
            Some(id) => id.to_string(),
            None => {
                let parent = self.level.map(|l| l.prefix()).unwrap_or("parent");
                let target = if code.trim().is_empty() { name.trim() } else { code.trim() };
                report.unresolved_refs += 1;
                report.warn(RowWarning {
                    message: format!("{}: unresolved {} '{}'", warning.message, parent, target),
                    ..warning
                });
                String::new()
            }
        }
    }
}

fn ids<R: OrgRecord>(records: &[R]) -> HashSet<String> {
    records.iter().map(|r| r.external_id().to_string()).collect()
}

fn check_ref(
    reference: &mut String,
    known: &HashSet<String>,
    table: Level,
    row: usize,
    field: &str,
    report: &mut RunReport,
) {
    if reference.is_empty() || known.contains(reference.as_str()) {
        return;
    }
    report.unresolved_refs += 1;
    report.warn(RowWarning::new(
        table.prefix(),
        row,
        field,
        format!("reference '{}' does not exist, cleared", reference),
    ));
    reference.clear();
}

/// Blank every reference that does not name an existing record, so no
/// emitted row ever points at a missing identifier.
pub fn enforce_referential_integrity(dataset: &mut Dataset, report: &mut RunReport) {
    let ministries = ids(&dataset.ministries);
    let categories = ids(&dataset.categories);
    let directions = ids(&dataset.directions);
    let services = ids(&dataset.services);

    for (i, c) in dataset.categories.iter_mut().enumerate() {
        check_ref(&mut c.ministry_ref, &ministries, Level::Category, i + 1, "ministry_id/id", report);
    }
    for (i, d) in dataset.directions.iter_mut().enumerate() {
        check_ref(&mut d.ministry_ref, &ministries, Level::Direction, i + 1, "ministry_id/id", report);
        check_ref(&mut d.category_ref, &categories, Level::Direction, i + 1, "category_id/id", report);
    }
    for (i, s) in dataset.services.iter_mut().enumerate() {
        check_ref(&mut s.direction_ref, &directions, Level::Service, i + 1, "direction_id/id", report);
    }
    for (i, a) in dataset.agents.iter_mut().enumerate() {
        check_ref(&mut a.service_ref, &services, Level::Agent, i + 1, "service_id/id", report);
    }
}
