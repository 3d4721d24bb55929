//! Hierarchy assembly from a linear scan.
//!
//! [`HierarchyBuilder`] threads a [`ScanState`] (active ministry, category and
//! direction) through a sequence of headings and leaves. A heading resets every
//! slot below it; a leaf is emitted only when its required ancestor is active.
//! The same builder serves plain-text charts, word-processor documents and
//! four-column level dumps.

use std::collections::{HashMap, HashSet};

use crate::classify::{classify, Classification, ClassifyContext};
use crate::ids::{external_id, generate_code, ministry_code, prefix, CodeAllocator, IdRegistry};
use crate::models::{
    Category, Dataset, Direction, DirectionType, LevelRow, Ministry, MinistryType, Service,
    ServiceType,
};
use crate::parser::Paragraph;
use crate::report::{RowWarning, RunReport};
use crate::text::{display_name, name_key};

/// Active ancestors during a scan (indices into the dataset tables).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub ministry: Option<usize>,
    pub category: Option<usize>,
    pub direction: Option<usize>,
    pub direction_is_general: bool,
}

impl ScanState {
    fn enter_ministry(&mut self, index: usize) {
        *self = ScanState { ministry: Some(index), ..Default::default() };
    }

    fn enter_category(&mut self, index: usize) {
        self.category = Some(index);
        self.direction = None;
        self.direction_is_general = false;
    }

    fn enter_direction(&mut self, index: usize, is_general: bool) {
        self.direction = Some(index);
        self.direction_is_general = is_general;
    }
}

/// Line and drop counters collected while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub lines_scanned: usize,
    pub lines_blank: usize,
    pub legal_clauses: usize,
    pub unclassified: usize,
    pub orphans_dropped: usize,
    pub duplicates_dropped: usize,
    pub warnings: Vec<RowWarning>,
}

impl ScanStats {
    /// Move the counters and warnings into a run report.
    pub fn merge_into(self, report: &mut RunReport) {
        report.lines_scanned += self.lines_scanned;
        report.lines_blank += self.lines_blank;
        report.legal_clauses += self.legal_clauses;
        report.unclassified += self.unclassified;
        report.orphans_dropped += self.orphans_dropped;
        report.duplicates_dropped += self.duplicates_dropped;
        report.warn_all(self.warnings);
    }
}

/// Builds the ministry / category / direction / service tables.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    state: ScanState,
    dataset: Dataset,
    codes: CodeAllocator,
    /// (parent scope, name key) → index, per level
    ministries: HashMap<String, usize>,
    categories: HashMap<(String, String), usize>,
    directions: HashMap<(String, String), usize>,
    services: HashSet<(String, String)>,
    ids: IdRegistry,
    row: usize,
    stats: ScanStats,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn finish(self) -> (Dataset, ScanStats) {
        (self.dataset, self.stats)
    }

    fn orphan(&mut self, table: &str, field: &str, name: &str) {
        self.stats.orphans_dropped += 1;
        self.stats.warnings.push(RowWarning::new(
            table,
            self.row,
            field,
            format!("'{}' dropped: no active parent", name),
        ));
    }

    // -------------------------------------------------------------------------
    // Headings and leaves
    // -------------------------------------------------------------------------

    /// Open (or re-enter) a ministry. Clears category and direction context.
    pub fn ministry(&mut self, name: &str) -> usize {
        let key = name_key(name);
        if let Some(&index) = self.ministries.get(&key) {
            self.state.enter_ministry(index);
            return index;
        }

        let code = self.codes.claim_generated("", &ministry_code(name, ""));
        let id = self.ids.claim(external_id(&prefix::ministry(), &code, name));
        self.dataset.ministries.push(Ministry {
            external_id: id,
            name: name.to_string(),
            code,
            kind: MinistryType::from_name(name),
            ..Default::default()
        });
        let index = self.dataset.ministries.len() - 1;
        self.ministries.insert(key, index);
        self.state.enter_ministry(index);
        index
    }

    /// Open (or re-enter) a category under the active ministry.
    pub fn category(&mut self, name: &str) -> Option<usize> {
        let Some(m) = self.state.ministry else {
            self.orphan("category", "ministry_id/id", name);
            return None;
        };
        let ministry = &self.dataset.ministries[m];
        let scope = (ministry.external_id.clone(), name_key(name));
        if let Some(&index) = self.categories.get(&scope) {
            self.state.enter_category(index);
            return Some(index);
        }

        let ministry_ref = ministry.external_id.clone();
        let id = external_id(&prefix::category(&ministry.code), "", name);
        let id = self.ids.claim(id);
        self.dataset.categories.push(Category {
            external_id: id,
            name: name.to_string(),
            ministry_ref,
        });
        let index = self.dataset.categories.len() - 1;
        self.categories.insert(scope, index);
        self.state.enter_category(index);
        Some(index)
    }

    /// Open (or re-enter) a direction under the active ministry, attached to
    /// the active category when there is one.
    pub fn direction(&mut self, name: &str, is_general: bool) -> Option<usize> {
        let Some(m) = self.state.ministry else {
            self.orphan("direction", "ministry_id/id", name);
            return None;
        };
        let ministry = &self.dataset.ministries[m];
        let scope = (ministry.external_id.clone(), name_key(name));
        if let Some(&index) = self.directions.get(&scope) {
            self.state.enter_direction(index, is_general);
            return Some(index);
        }

        let ministry_ref = ministry.external_id.clone();
        let ministry_code = ministry.code.clone();
        let category_ref = self
            .state
            .category
            .map(|c| self.dataset.categories[c].external_id.clone())
            .unwrap_or_default();

        let code = self.codes.claim_generated(&ministry_ref, &generate_code(name));
        let id = external_id(&prefix::direction(&ministry_code), &code, name);
        let id = self.ids.claim(id);
        self.dataset.directions.push(Direction {
            external_id: id,
            name: name.to_string(),
            code,
            kind: DirectionType::from_name(name),
            ministry_code,
            ministry_ref,
            category_ref,
            ..Default::default()
        });
        let index = self.dataset.directions.len() - 1;
        self.directions.insert(scope, index);
        self.state.enter_direction(index, is_general);
        Some(index)
    }

    /// Emit a service under the active direction. Returns false when the
    /// service was dropped (no direction, or already present).
    pub fn service(&mut self, name: &str) -> bool {
        let Some(d) = self.state.direction else {
            self.orphan("service", "direction_id/id", name);
            return false;
        };
        let direction = &self.dataset.directions[d];
        let scope = (direction.external_id.clone(), name_key(name));
        if self.services.contains(&scope) {
            self.stats.duplicates_dropped += 1;
            return false;
        }

        let direction_ref = direction.external_id.clone();
        let direction_code = direction.code.clone();
        let ministry_code = direction.ministry_code.clone();
        let code = self.codes.claim_generated(&direction_ref, &generate_code(name));
        let id = external_id(&prefix::service(&ministry_code, &direction_code), &code, name);
        let id = self.ids.claim(id);

        let level_row = self.level_row(name);
        self.dataset.services.push(Service {
            external_id: id,
            name: name.to_string(),
            code,
            kind: ServiceType::from_name(name),
            direction_code,
            direction_ref,
            ..Default::default()
        });
        self.dataset.level_rows.push(level_row);
        self.services.insert(scope);
        true
    }

    fn level_row(&self, service: &str) -> LevelRow {
        let data = &self.dataset;
        LevelRow {
            level1: self.state.ministry.map(|i| data.ministries[i].name.clone()).unwrap_or_default(),
            level2: self.state.category.map(|i| data.categories[i].name.clone()).unwrap_or_default(),
            level3: self.state.direction.map(|i| data.directions[i].name.clone()).unwrap_or_default(),
            level4: service.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Drivers
    // -------------------------------------------------------------------------

    /// Apply one classified line.
    pub fn apply(&mut self, classification: Classification) {
        match classification {
            Classification::Blank => self.stats.lines_blank += 1,
            Classification::LegalClause => self.stats.legal_clauses += 1,
            Classification::Unclassified => self.stats.unclassified += 1,
            Classification::Ministry { name } => {
                self.ministry(&name);
            }
            Classification::Category { name } => {
                self.category(&name);
            }
            Classification::DirectionHeading { name, is_general } => {
                self.direction(&name, is_general);
            }
            Classification::Services { names } => {
                for name in names {
                    self.service(&name);
                }
            }
        }
    }

    /// Classify a line in the current context and apply it.
    pub fn scan_line(&mut self, raw: &str, depth: Option<u8>) {
        self.row += 1;
        self.stats.lines_scanned += 1;
        let ctx = ClassifyContext::at_depth(depth).under_general(self.state.direction_is_general);
        let classification = classify(raw, &ctx);
        self.apply(classification);
    }

    pub fn scan_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.scan_line(line.as_ref(), None);
        }
    }

    pub fn scan_paragraphs(&mut self, paragraphs: &[Paragraph]) {
        for p in paragraphs {
            self.scan_line(&p.text, p.depth);
        }
    }

    /// Apply one row of a four-column level dump. Blank cells leave the
    /// corresponding slot empty.
    pub fn push_level_row(&mut self, row: &LevelRow) {
        self.row += 1;
        let cells = [&row.level1, &row.level2, &row.level3, &row.level4];
        let [l1, l2, l3, l4] = cells.map(|c| display_name(c));

        if l1.is_empty() {
            let leaf = [&l4, &l3, &l2].into_iter().find(|n| !n.is_empty());
            match leaf {
                Some(name) => self.orphan("ministry", "Niveau 1", name),
                None => self.stats.lines_blank += 1,
            }
            return;
        }

        self.ministry(&l1);
        if !l2.is_empty() && self.category(&l2).is_none() {
            return;
        }
        if !l3.is_empty() {
            let is_general = name_key(&l3).starts_with("direction-generale");
            if self.direction(&l3, is_general).is_none() {
                return;
            }
        }
        if !l4.is_empty() {
            self.service(&l4);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: [&str; 4] = [
        "MINISTÈRE DE LA SANTÉ",
        "1° Cabinet",
        "Direction générale de la Santé :",
        "- Service des Ressources Humaines;",
    ];

    fn build(lines: &[&str]) -> (Dataset, ScanStats) {
        let mut builder = HierarchyBuilder::new();
        builder.scan_lines(lines.iter().copied());
        builder.finish()
    }

    #[test]
    fn test_scenario_nesting() {
        let (data, stats) = build(&SCENARIO);

        assert_eq!(data.ministries.len(), 1);
        assert_eq!(data.categories.len(), 1);
        assert_eq!(data.directions.len(), 1);
        assert_eq!(data.services.len(), 1);

        let ministry = &data.ministries[0];
        let category = &data.categories[0];
        let direction = &data.directions[0];
        let service = &data.services[0];

        assert_eq!(ministry.name, "Ministère De La Santé");
        assert_eq!(category.name, "Cabinet");
        assert_eq!(direction.name, "Direction Générale De La Santé");
        assert_eq!(service.name, "Service Des Ressources Humaines");

        assert_eq!(category.ministry_ref, ministry.external_id);
        assert_eq!(direction.ministry_ref, ministry.external_id);
        assert_eq!(direction.category_ref, category.external_id);
        assert_eq!(service.direction_ref, direction.external_id);
        assert_eq!(stats.orphans_dropped, 0);
    }

    #[test]
    fn test_scan_is_deterministic() {
        assert_eq!(build(&SCENARIO).0, build(&SCENARIO).0);
    }

    #[test]
    fn test_legal_lines_dropped_and_counted() {
        let mut lines = vec!["Vu la loi n°...", "DÉCRÈTE :"];
        lines.extend(SCENARIO);
        lines.push("Article 2. - Le présent décret sera publié.");
        let (data, stats) = build(&lines);

        assert_eq!(stats.legal_clauses, 3);
        assert_eq!(data.ministries.len(), 1);
        assert!(data.services.iter().all(|s| !s.name.contains("Vu")));
    }

    #[test]
    fn test_service_without_direction_is_dropped() {
        let (data, stats) = build(&["MINISTÈRE DES FINANCES", "- Bureau du courrier;"]);
        assert!(data.services.is_empty());
        assert_eq!(stats.orphans_dropped, 1);
        assert_eq!(stats.warnings[0].table, "service");
    }

    #[test]
    fn test_new_ministry_resets_lower_context() {
        let (data, stats) = build(&[
            "MINISTÈRE DES FINANCES",
            "Direction générale du Budget :",
            "MINISTÈRE DE LA JUSTICE",
            "- Bureau du courrier;",
        ]);
        assert_eq!(data.ministries.len(), 2);
        assert!(data.services.is_empty());
        assert_eq!(stats.orphans_dropped, 1);
    }

    #[test]
    fn test_new_category_resets_direction() {
        let mut builder = HierarchyBuilder::new();
        builder.scan_lines(["MINISTÈRE DES FINANCES", "Direction générale du Budget :", "2° Autres administrations"]);
        assert!(builder.state().direction.is_none());
        assert!(builder.state().category.is_some());
    }

    #[test]
    fn test_direction_without_category_attaches_to_ministry() {
        let (data, _) = build(&["PRIMATURE", "Pôle Économie :"]);
        assert_eq!(data.directions[0].category_ref, "");
        assert_eq!(data.directions[0].ministry_ref, "ministry_pm");
        assert_eq!(data.ministries[0].code, "PM");
    }

    #[test]
    fn test_duplicates_first_wins() {
        let (data, stats) = build(&[
            "MINISTÈRE DES FINANCES",
            "Direction générale du Budget :",
            "- Bureau du courrier;",
            "- BUREAU DU COURRIER.",
            "MINISTÈRE DES FINANCES",
            "Direction générale du Budget :",
            "- Bureau des archives;",
        ]);
        assert_eq!(data.ministries.len(), 1);
        assert_eq!(data.directions.len(), 1);
        assert_eq!(data.services.len(), 2);
        assert_eq!(stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_codes_unique_within_scope() {
        let (data, _) = build(&[
            "MINISTÈRE DES FINANCES",
            "Direction générale des Impôts :",
            "- Bureau de la Comptabilité;",
            "- Bureau de la Communication;",
        ]);
        let codes: HashSet<_> = data.services.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes.len(), 2);
        let ids: HashSet<_> = data.services.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_general_direction_accepts_direction_leaves() {
        let (data, _) = build(&[
            "MINISTÈRE DE L'AGRICULTURE",
            "Direction générale de la Production agricole :",
            "Direction de l'Horticulture",
        ]);
        assert_eq!(data.services.len(), 1);
        assert_eq!(data.services[0].name, "Direction De L'horticulture");
    }

    #[test]
    fn test_docx_depth_driven_scan() {
        let mut builder = HierarchyBuilder::new();
        builder.scan_paragraphs(&[
            Paragraph::plain("MINISTÈRE DES PÊCHES"),
            Paragraph::list_item("Direction des Pêches maritimes", 0),
            Paragraph::list_item("Division de la Pêche artisanale", 1),
            Paragraph::list_item("DPM", 1),
        ]);
        let (data, _) = builder.finish();

        assert_eq!(data.directions.len(), 1);
        assert_eq!(data.services.len(), 2);
        assert_eq!(data.services[0].kind, ServiceType::Division);
    }

    #[test]
    fn test_level_dump_driver_and_level_rows() {
        let mut builder = HierarchyBuilder::new();
        for (l1, l2, l3, l4) in [
            ("MINISTÈRE DE LA SANTÉ", "Cabinet", "Direction générale de la Santé", "Service des soins;"),
            ("MINISTÈRE DE LA SANTÉ", "", "Direction de la Pharmacie", "Bureau des licences"),
            ("", "", "", "Cellule orpheline"),
            ("MINISTÈRE DE LA SANTÉ", "Cabinet", "", "Bureau sans direction"),
        ] {
            builder.push_level_row(&LevelRow {
                level1: l1.into(),
                level2: l2.into(),
                level3: l3.into(),
                level4: l4.into(),
            });
        }
        let (data, stats) = builder.finish();

        assert_eq!(data.ministries.len(), 1);
        assert_eq!(data.categories.len(), 1);
        assert_eq!(data.directions.len(), 2);
        assert_eq!(data.services.len(), 2);
        assert_eq!(stats.orphans_dropped, 2);
        assert_eq!(data.level_rows[0].level2, "Cabinet");
        assert_eq!(data.level_rows[0].level4, "Service Des Soins");
        assert_eq!(data.directions[0].category_ref, data.categories[0].external_id);
    }
}
