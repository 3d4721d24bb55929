//! Table extraction from workbook sheets.
//!
//! Sheets are picked by name (one per level), columns by candidate names.
//! Parents are resolved through [`ParentIndex`]: code first, then name.

use std::collections::{HashMap, HashSet};

use crate::ids::{external_id, generate_code, ministry_code, prefix, Allocation, CodeAllocator, IdRegistry};
use crate::logs::{log_info, log_info_indent, log_success};
use crate::models::{
    Agent, Category, Dataset, Direction, DirectionType, Level, Ministry, MinistryType, Service,
    ServiceType,
};
use crate::parser::{first_cell, Sheet};
use crate::report::{RowWarning, RunReport};
use crate::resolve::ParentIndex;
use crate::text::{display_name, name_key, normalize_code, normalize_column_name};
use crate::validation::{validate_email, validate_phone, validate_url, FixMode};

use super::levels::is_level_dump;

// =============================================================================
// Column maps (normalized source column names, first non-blank wins)
// =============================================================================

pub mod columns {
    pub mod ministry {
        pub const NAME: &[&str] = &["nom_ministere", "nom_du_ministere", "ministere", "name", "nom"];
        pub const CODE: &[&str] = &["code_ministere", "code"];
        pub const TYPE: &[&str] = &["type_ministere", "type"];
        pub const ADDRESS: &[&str] = &["adresse", "address"];
        pub const PHONE: &[&str] = &["telephone", "phone"];
        pub const EMAIL: &[&str] = &["email"];
        pub const WEBSITE: &[&str] = &["site_web", "website"];
        pub const DESCRIPTION: &[&str] = &["description"];
    }

    pub mod category {
        pub const NAME: &[&str] = &["nom_categorie", "categorie", "category", "name"];
        pub const MINISTRY_CODE: &[&str] = &["code_ministere", "ministere_code", "ministry_code"];
        pub const MINISTRY_NAME: &[&str] = &["ministere", "ministry", "ministry_name"];
    }

    pub mod direction {
        pub const NAME: &[&str] = &["nom_direction", "direction", "name", "nom"];
        pub const CODE: &[&str] = &["code_direction", "code"];
        pub const TYPE: &[&str] = &["type_direction", "type"];
        pub const MINISTRY_CODE: &[&str] = &["code_ministere", "ministere_code", "ministry_code"];
        pub const MINISTRY_NAME: &[&str] = &["ministere", "ministry", "ministry_name"];
        pub const CATEGORY: &[&str] = &["categorie", "category"];
        pub const REGION: &[&str] = &["region"];
        pub const MANAGER: &[&str] = &["responsable", "nom_responsable", "manager_name"];
        pub const PHONE: &[&str] = &["telephone", "phone"];
        pub const EMAIL: &[&str] = &["email"];
        pub const ADDRESS: &[&str] = &["adresse", "address"];
        pub const DESCRIPTION: &[&str] = &["description"];
    }

    pub mod service {
        pub const NAME: &[&str] = &["nom_service", "service", "name", "nom"];
        pub const CODE: &[&str] = &["code_service", "code"];
        pub const TYPE: &[&str] = &["type_service", "type"];
        pub const DIRECTION_CODE: &[&str] = &["code_direction", "direction_code"];
        pub const DIRECTION_NAME: &[&str] = &["direction", "direction_name"];
        pub const MINISTRY_CODE: &[&str] = &["code_ministere", "ministere_code", "ministry_code"];
        pub const MINISTRY_NAME: &[&str] = &["ministere", "ministry", "ministry_name"];
        pub const MANAGER: &[&str] = &["responsable", "chef_service", "manager_name"];
        pub const PHONE: &[&str] = &["telephone", "phone"];
        pub const EMAIL: &[&str] = &["email"];
        pub const ADDRESS: &[&str] = &["adresse", "address"];
        pub const DESCRIPTION: &[&str] = &["description"];
    }

    pub mod agent {
        pub const NAME: &[&str] = &["nom_complet", "name"];
        pub const FIRST_NAME: &[&str] = &["prenom", "first_name"];
        pub const LAST_NAME: &[&str] = &["nom", "last_name"];
        pub const FUNCTION: &[&str] = &["fonction", "poste", "function"];
        pub const SERVICE_CODE: &[&str] = &["code_service", "service_code"];
        pub const SERVICE_NAME: &[&str] = &["service", "service_name"];
        pub const MATRICULE: &[&str] = &["matricule"];
        pub const WORK_PHONE: &[&str] = &["telephone_bureau", "work_phone"];
        pub const MOBILE_PHONE: &[&str] = &["telephone_mobile", "mobile_phone"];
        pub const WORK_EMAIL: &[&str] = &["email", "email_professionnel", "work_email"];
        pub const NOMINATION_DATE: &[&str] = &["date_prise_service", "nomination_date"];
        pub const NOMINATION_DECREE: &[&str] = &["nomination_decree", "numero_decret"];
        pub const INTERIM: &[&str] = &["interim", "is_interim"];
    }
}

// =============================================================================
// Sheet selection
// =============================================================================

const MINISTRY_SHEETS: &[&str] = &["Ministères", "Ministries", "Ministry", "sn.ministry"];
const CATEGORY_SHEETS: &[&str] = &["Catégories", "Categories", "sn.category"];
const DIRECTION_SHEETS: &[&str] = &["Directions", "sn.direction"];
const SERVICE_SHEETS: &[&str] = &["Services", "sn.service"];
const AGENT_SHEETS: &[&str] = &["Agents", "sn.agent", "Employés", "Employees"];
const ORGANIGRAM_SHEETS: &[&str] = &["Organigramme", "Orgchart"];

fn sheet_matches(sheet: &Sheet, candidates: &[&str]) -> bool {
    let name = normalize_column_name(&sheet.name);
    candidates.iter().any(|c| normalize_column_name(c) == name)
}

/// Sheets of a workbook assigned to levels.
#[derive(Debug, Default)]
pub struct SheetSet {
    pub ministries: Option<Sheet>,
    pub categories: Option<Sheet>,
    pub directions: Option<Sheet>,
    pub services: Option<Sheet>,
    pub agents: Option<Sheet>,
    pub organigram: Option<Sheet>,
}

impl SheetSet {
    /// Assign sheets by name. The first sheet no level claimed stands in for
    /// the ministries when no sheet is named after them.
    pub fn select(sheets: Vec<Sheet>) -> Self {
        let first = sheets
            .iter()
            .find(|s| {
                ![MINISTRY_SHEETS, CATEGORY_SHEETS, DIRECTION_SHEETS, SERVICE_SHEETS, AGENT_SHEETS, ORGANIGRAM_SHEETS]
                    .iter()
                    .any(|names| sheet_matches(s, names))
            })
            .cloned();
        let mut set = Self::default();
        for sheet in sheets {
            let slot = if sheet_matches(&sheet, MINISTRY_SHEETS) {
                &mut set.ministries
            } else if sheet_matches(&sheet, CATEGORY_SHEETS) {
                &mut set.categories
            } else if sheet_matches(&sheet, DIRECTION_SHEETS) {
                &mut set.directions
            } else if sheet_matches(&sheet, SERVICE_SHEETS) {
                &mut set.services
            } else if sheet_matches(&sheet, AGENT_SHEETS) {
                &mut set.agents
            } else if sheet_matches(&sheet, ORGANIGRAM_SHEETS) {
                &mut set.organigram
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(sheet);
            }
        }
        if set.ministries.is_none() {
            set.ministries = first;
        }
        set
    }

    /// A four-column level dump standing in for the whole workbook.
    pub fn level_dump(&self) -> Option<&Sheet> {
        if self.directions.is_some() || self.services.is_some() {
            return None;
        }
        [&self.organigram, &self.ministries]
            .into_iter()
            .flatten()
            .find(|s| is_level_dump(s))
    }
}

// =============================================================================
// Extractor
// =============================================================================

fn parse_interim(raw: &str) -> String {
    match name_key(raw).as_str() {
        "" => String::new(),
        "oui" | "yes" | "true" | "1" | "x" | "o" => "true".to_string(),
        _ => "false".to_string(),
    }
}

/// Builds the dataset from level sheets, one level at a time (parents first).
pub struct SheetExtractor<'r> {
    mode: FixMode,
    report: &'r mut RunReport,
    codes: CodeAllocator,
    ids: IdRegistry,
    dataset: Dataset,
}

impl<'r> SheetExtractor<'r> {
    pub fn new(mode: FixMode, report: &'r mut RunReport) -> Self {
        Self {
            mode,
            report,
            codes: CodeAllocator::new(),
            ids: IdRegistry::new(),
            dataset: Dataset::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn finish(self) -> Dataset {
        self.dataset
    }

    fn warn(&mut self, level: Level, row: usize, field: &str, message: impl Into<String>) {
        self.report.warn(RowWarning::new(level.prefix(), row, field, message));
    }

    fn drop_duplicate(&mut self, level: Level, row: usize, field: &str, message: String) {
        self.report.duplicates_dropped += 1;
        self.warn(level, row, field, message);
    }

    fn drop_orphan(&mut self, level: Level, row: usize, field: &str, name: &str) {
        self.report.orphans_dropped += 1;
        self.warn(level, row, field, format!("'{}' dropped: no parent given", name));
    }

    /// Run a contact validator and record its warning.
    fn contact(
        &mut self,
        level: Level,
        row: usize,
        field: &str,
        raw: &str,
        validator: fn(&str, FixMode) -> (String, Option<String>),
    ) -> String {
        let (value, warning) = validator(raw, self.mode);
        if let Some(message) = warning {
            self.warn(level, row, field, message);
        }
        value
    }

    /// Code for a new record in `scope`: the source code when given (a
    /// duplicate returns `None`), else a generated one.
    fn claim_code(&mut self, level: Level, row: usize, scope: &str, source: &str, generated: String) -> Option<String> {
        let explicit = normalize_code(source);
        if explicit.is_empty() {
            return Some(self.codes.claim_generated(scope, &generated));
        }
        match self.codes.claim_explicit(scope, &explicit) {
            Allocation::Assigned(code) => Some(code),
            Allocation::Duplicate(code) => {
                self.drop_duplicate(level, row, "code", format!("duplicate code {}, row dropped", code));
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Levels
    // -------------------------------------------------------------------------

    pub fn ministries(&mut self, sheet: &Sheet) -> usize {
        use columns::ministry as col;
        let before = self.dataset.ministries.len();
        let mut seen: HashSet<String> = self.dataset.ministries.iter().map(|m| name_key(&m.name)).collect();

        for (i, row) in sheet.rows.iter().enumerate() {
            let n = i + 1;
            let name = display_name(first_cell(row, col::NAME));
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name_key(&name)) {
                self.drop_duplicate(Level::Ministry, n, "name", format!("duplicate ministry '{}'", name));
                continue;
            }
            let Some(code) = self.claim_code(Level::Ministry, n, "", first_cell(row, col::CODE), ministry_code(&name, "")) else {
                continue;
            };
            let kind = MinistryType::from_label(first_cell(row, col::TYPE))
                .unwrap_or_else(|| MinistryType::from_name(&name));

            let phone = self.contact(Level::Ministry, n, "phone", first_cell(row, col::PHONE), validate_phone);
            let email = self.contact(Level::Ministry, n, "email", first_cell(row, col::EMAIL), validate_email);
            let website = self.contact(Level::Ministry, n, "website", first_cell(row, col::WEBSITE), validate_url);

            let external_id = self.ids.claim(external_id(&prefix::ministry(), &code, &name));
            self.dataset.ministries.push(Ministry {
                external_id,
                name,
                code,
                kind,
                address: first_cell(row, col::ADDRESS).to_string(),
                phone,
                email,
                website,
                description: first_cell(row, col::DESCRIPTION).to_string(),
            });
        }
        self.dataset.ministries.len() - before
    }

    /// Existing category of a ministry by name, or a new one.
    fn category_for(&mut self, ministry: usize, name: &str) -> String {
        let ministry_ref = self.dataset.ministries[ministry].external_id.clone();
        let key = name_key(name);
        if let Some(existing) = self
            .dataset
            .categories
            .iter()
            .find(|c| c.ministry_ref == ministry_ref && name_key(&c.name) == key)
        {
            return existing.external_id.clone();
        }
        let code = self.dataset.ministries[ministry].code.clone();
        let external_id = self.ids.claim(external_id(&prefix::category(&code), "", name));
        self.dataset.categories.push(Category {
            external_id: external_id.clone(),
            name: name.to_string(),
            ministry_ref,
        });
        external_id
    }

    fn ministry_position(&self, external_id: &str) -> Option<usize> {
        self.dataset.ministries.iter().position(|m| m.external_id == external_id)
    }

    pub fn categories(&mut self, sheet: &Sheet) -> usize {
        use columns::category as col;
        let before = self.dataset.categories.len();
        let index = ParentIndex::build(&self.dataset.ministries);

        for (i, row) in sheet.rows.iter().enumerate() {
            let n = i + 1;
            let name = display_name(first_cell(row, col::NAME));
            let (mcode, mname) = (first_cell(row, col::MINISTRY_CODE), first_cell(row, col::MINISTRY_NAME));
            if name.is_empty() {
                continue;
            }
            if mcode.is_empty() && mname.is_empty() {
                self.drop_orphan(Level::Category, n, "ministry_id/id", &name);
                continue;
            }
            let ministry_ref = index.resolve_or_warn(
                mcode,
                mname,
                RowWarning::new(Level::Category.prefix(), n, "ministry_id/id", name.clone()),
                self.report,
            );
            // a category cannot exist without its ministry
            let Some(m) = self.ministry_position(&ministry_ref) else {
                self.report.orphans_dropped += 1;
                continue;
            };
            let count = self.dataset.categories.len();
            self.category_for(m, &name);
            if self.dataset.categories.len() == count {
                self.drop_duplicate(Level::Category, n, "name", format!("duplicate category '{}'", name));
            }
        }
        self.dataset.categories.len() - before
    }

    pub fn directions(&mut self, sheet: &Sheet) -> usize {
        use columns::direction as col;
        let before = self.dataset.directions.len();
        let index = ParentIndex::build(&self.dataset.ministries);
        let mut seen: HashSet<(String, String)> = self
            .dataset
            .directions
            .iter()
            .map(|d| (d.ministry_ref.clone(), name_key(&d.name)))
            .collect();

        for (i, row) in sheet.rows.iter().enumerate() {
            let n = i + 1;
            let name = display_name(first_cell(row, col::NAME));
            let (mcode, mname) = (first_cell(row, col::MINISTRY_CODE), first_cell(row, col::MINISTRY_NAME));
            if name.is_empty() {
                continue;
            }
            if mcode.is_empty() && mname.is_empty() {
                self.drop_orphan(Level::Direction, n, "ministry_id/id", &name);
                continue;
            }

            let ministry_ref = index.resolve_or_warn(
                mcode,
                mname,
                RowWarning::new(Level::Direction.prefix(), n, "ministry_id/id", name.clone()),
                self.report,
            );
            if !seen.insert((ministry_ref.clone(), name_key(&name))) {
                self.drop_duplicate(Level::Direction, n, "name", format!("duplicate direction '{}'", name));
                continue;
            }
            let ministry = self.ministry_position(&ministry_ref);
            let ministry_code = match ministry {
                Some(m) => self.dataset.ministries[m].code.clone(),
                None => normalize_code(mcode),
            };
            let scope = if ministry_ref.is_empty() { format!("?{}", ministry_code) } else { ministry_ref.clone() };
            let Some(code) = self.claim_code(Level::Direction, n, &scope, first_cell(row, col::CODE), generate_code(&name)) else {
                continue;
            };

            let category = display_name(first_cell(row, col::CATEGORY));
            let category_ref = match ministry {
                Some(m) if !category.is_empty() => self.category_for(m, &category),
                _ => String::new(),
            };
            let kind = DirectionType::from_label(first_cell(row, col::TYPE))
                .unwrap_or_else(|| DirectionType::from_name(&name));
            let phone = self.contact(Level::Direction, n, "phone", first_cell(row, col::PHONE), validate_phone);
            let email = self.contact(Level::Direction, n, "email", first_cell(row, col::EMAIL), validate_email);

            let external_id = self.ids.claim(external_id(&prefix::direction(&ministry_code), &code, &name));
            self.dataset.directions.push(Direction {
                external_id,
                name,
                code,
                kind,
                ministry_code,
                ministry_ref,
                category_ref,
                region: first_cell(row, col::REGION).to_string(),
                manager_name: display_name(first_cell(row, col::MANAGER)),
                phone,
                email,
                address: first_cell(row, col::ADDRESS).to_string(),
                description: first_cell(row, col::DESCRIPTION).to_string(),
            });
        }
        self.dataset.directions.len() - before
    }

    pub fn services(&mut self, sheet: &Sheet) -> usize {
        use columns::service as col;
        let before = self.dataset.services.len();
        let index = ParentIndex::build(&self.dataset.directions);
        let ministries = ParentIndex::build(&self.dataset.ministries);
        let by_ministry = ParentIndex::by_scope(&self.dataset.directions, |d| d.ministry_ref.as_str());
        let directions: HashMap<String, (String, String)> = self
            .dataset
            .directions
            .iter()
            .map(|d| (d.external_id.clone(), (d.ministry_code.clone(), d.code.clone())))
            .collect();
        let mut seen: HashSet<(String, String)> = self
            .dataset
            .services
            .iter()
            .map(|s| (s.direction_ref.clone(), name_key(&s.name)))
            .collect();

        for (i, row) in sheet.rows.iter().enumerate() {
            let n = i + 1;
            let name = display_name(first_cell(row, col::NAME));
            let (dcode, dname) = (first_cell(row, col::DIRECTION_CODE), first_cell(row, col::DIRECTION_NAME));
            if name.is_empty() {
                continue;
            }
            if dcode.is_empty() && dname.is_empty() {
                self.drop_orphan(Level::Service, n, "direction_id/id", &name);
                continue;
            }

            // the directions of the row's ministry, when it names one
            let scoped = ministries
                .resolve(first_cell(row, col::MINISTRY_CODE), first_cell(row, col::MINISTRY_NAME))
                .and_then(|m| by_ministry.get(m));
            let direction_index = match scoped {
                Some(scoped) => scoped,
                None => {
                    if index.is_shared_code(dcode) {
                        self.warn(
                            Level::Service,
                            n,
                            "direction_id/id",
                            format!("direction code {} is used by several ministries, first one taken", normalize_code(dcode)),
                        );
                    }
                    &index
                }
            };
            let direction_ref = direction_index.resolve_or_warn(
                dcode,
                dname,
                RowWarning::new(Level::Service.prefix(), n, "direction_id/id", name.clone()),
                self.report,
            );
            if !seen.insert((direction_ref.clone(), name_key(&name))) {
                self.drop_duplicate(Level::Service, n, "name", format!("duplicate service '{}'", name));
                continue;
            }
            let (ministry_code, direction_code) = match directions.get(&direction_ref) {
                Some((m, d)) => (m.clone(), d.clone()),
                None => (String::new(), normalize_code(dcode)),
            };
            let scope = if direction_ref.is_empty() { format!("?{}", direction_code) } else { direction_ref.clone() };
            let Some(code) = self.claim_code(Level::Service, n, &scope, first_cell(row, col::CODE), generate_code(&name)) else {
                continue;
            };

            let kind = ServiceType::from_label(first_cell(row, col::TYPE))
                .unwrap_or_else(|| ServiceType::from_name(&name));
            let phone = self.contact(Level::Service, n, "phone", first_cell(row, col::PHONE), validate_phone);
            let email = self.contact(Level::Service, n, "email", first_cell(row, col::EMAIL), validate_email);

            let id_prefix = prefix::service(&ministry_code, &direction_code);
            let external_id = self.ids.claim(external_id(&id_prefix, &code, &name));
            self.dataset.services.push(Service {
                external_id,
                name,
                code,
                kind,
                direction_code,
                direction_ref,
                manager_name: display_name(first_cell(row, col::MANAGER)),
                phone,
                email,
                address: first_cell(row, col::ADDRESS).to_string(),
                description: first_cell(row, col::DESCRIPTION).to_string(),
            });
        }
        self.dataset.services.len() - before
    }

    pub fn agents(&mut self, sheet: &Sheet) -> usize {
        use columns::agent as col;
        let before = self.dataset.agents.len();
        let index = ParentIndex::build(&self.dataset.services);
        let mut matricules: HashSet<String> = HashSet::new();

        for (i, row) in sheet.rows.iter().enumerate() {
            let n = i + 1;
            let first_name = display_name(first_cell(row, col::FIRST_NAME));
            let last_name = display_name(first_cell(row, col::LAST_NAME));
            let mut name = display_name(first_cell(row, col::NAME));
            if name.is_empty() {
                name = format!("{} {}", first_name, last_name).trim().to_string();
            }
            let (scode, sname) = (first_cell(row, col::SERVICE_CODE), first_cell(row, col::SERVICE_NAME));
            if name.is_empty() {
                continue;
            }
            if scode.is_empty() && sname.is_empty() {
                self.drop_orphan(Level::Agent, n, "service_id/id", &name);
                continue;
            }
            let matricule = first_cell(row, col::MATRICULE).to_string();
            if !matricule.is_empty() && !matricules.insert(normalize_code(&matricule)) {
                self.drop_duplicate(Level::Agent, n, "matricule", format!("duplicate matricule {}", matricule));
                continue;
            }

            let service_ref = index.resolve_or_warn(
                scode,
                sname,
                RowWarning::new(Level::Agent.prefix(), n, "service_id/id", name.clone()),
                self.report,
            );
            let function = match display_name(first_cell(row, col::FUNCTION)) {
                f if f.is_empty() => "Agent".to_string(),
                f => f,
            };
            let work_phone = self.contact(Level::Agent, n, "work_phone", first_cell(row, col::WORK_PHONE), validate_phone);
            let mobile_phone =
                self.contact(Level::Agent, n, "mobile_phone", first_cell(row, col::MOBILE_PHONE), validate_phone);
            let work_email = self.contact(Level::Agent, n, "work_email", first_cell(row, col::WORK_EMAIL), validate_email);

            let external_id = self.ids.claim(external_id(&prefix::agent(), &matricule, &name));
            self.dataset.agents.push(Agent {
                external_id,
                name,
                first_name,
                last_name,
                function,
                service_code: normalize_code(scode),
                service_ref,
                matricule,
                work_phone,
                mobile_phone,
                work_email,
                nomination_date: first_cell(row, col::NOMINATION_DATE).to_string(),
                nomination_decree: first_cell(row, col::NOMINATION_DECREE).to_string(),
                is_interim: parse_interim(first_cell(row, col::INTERIM)),
            });
        }
        self.dataset.agents.len() - before
    }
}

/// Extract every level from a set of sheets, falling back to the organigram
/// sheet for any of ministries, directions or services left empty.
pub fn extract_sheets(set: &SheetSet, mode: FixMode, report: &mut RunReport) -> Dataset {
    let mut extractor = SheetExtractor::new(mode, report);

    let steps: [(Level, &Option<Sheet>); 5] = [
        (Level::Ministry, &set.ministries),
        (Level::Category, &set.categories),
        (Level::Direction, &set.directions),
        (Level::Service, &set.services),
        (Level::Agent, &set.agents),
    ];
    for (level, sheet) in steps {
        let sheet = match (sheet, &set.organigram) {
            (Some(sheet), _) => sheet,
            (None, Some(org)) if matches!(level, Level::Ministry | Level::Direction | Level::Service) => org,
            _ => continue,
        };
        extract_level(&mut extractor, level, sheet);

        if extractor.dataset().count(level) == 0 && level != Level::Agent {
            if let Some(org) = set.organigram.as_ref().filter(|org| org.name != sheet.name) {
                log_info_indent(format!("{} empty, trying sheet '{}'", level.label(), org.name), 1);
                extract_level(&mut extractor, level, org);
            }
        }
    }
    extractor.finish()
}

fn extract_level(extractor: &mut SheetExtractor<'_>, level: Level, sheet: &Sheet) {
    log_info(format!("📄 Sheet '{}' → {} ({} rows)", sheet.name, level.label(), sheet.rows.len()));
    let count = match level {
        Level::Ministry => extractor.ministries(sheet),
        Level::Category => extractor.categories(sheet),
        Level::Direction => extractor.directions(sheet),
        Level::Service => extractor.services(sheet),
        Level::Agent => extractor.agents(sheet),
    };
    log_success(format!("{} {}", count, level.label()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_delimited;

    fn sheet(name: &str, content: &str) -> Sheet {
        parse_delimited(name, content, ';').unwrap()
    }

    fn ministries() -> Sheet {
        sheet(
            "Ministères",
            "Nom du ministère;Code;Type;Téléphone;Email;Site web\n\
             MINISTÈRE DE LA SANTÉ;MSAS;;771234567;Contact@Sante.gouv.sn;www.sante.gouv.sn\n\
             Présidence de la République;;Présidence;;;\n\
             Ministère des Finances;MSAS;;;;\n\
             ministère de la santé;;;;;\n\
             Ministère de la Culture;;;12345;pas-un-email;\n",
        )
    }

    #[test]
    fn test_select_sheets_by_name() {
        let set = SheetSet::select(vec![
            sheet("Lisez-moi", "a;b\n1;2\n"),
            sheet("Directions", "nom_direction;code_ministere\nDGS;MSAS\n"),
            sheet("EMPLOYÉS", "nom;prenom\nDiop;Awa\n"),
        ]);
        assert_eq!(set.ministries.as_ref().unwrap().name, "Lisez-moi");
        assert_eq!(set.directions.as_ref().unwrap().name, "Directions");
        assert_eq!(set.agents.as_ref().unwrap().name, "EMPLOYÉS");
        assert!(set.services.is_none());
        assert!(set.level_dump().is_none());
    }

    #[test]
    fn test_ministry_fallback_skips_claimed_sheets() {
        let set = SheetSet::select(vec![
            sheet("Directions", "nom_direction;code_ministere
DGS;MSAS
"),
            sheet("Feuil2", "nom;code
Ministère de la Santé;MSAS
"),
        ]);
        assert_eq!(set.ministries.as_ref().unwrap().name, "Feuil2");
        assert_eq!(set.directions.as_ref().unwrap().name, "Directions");

        let only_claimed = SheetSet::select(vec![sheet("Services", "nom_service
Bureau
")]);
        assert!(only_claimed.ministries.is_none());
    }

    #[test]
    fn test_level_dump_workbook() {
        let set = SheetSet::select(vec![sheet("Feuil1", "Niveau 1;Niveau 2;Niveau 3;Niveau 4\nA;B;C;D\n")]);
        assert_eq!(set.level_dump().unwrap().name, "Feuil1");
    }

    #[test]
    fn test_ministry_rows() {
        let mut report = RunReport::new("test");
        let mut extractor = SheetExtractor::new(FixMode::Fix, &mut report);
        assert_eq!(extractor.ministries(&ministries()), 3);
        let data = extractor.finish();

        let sante = &data.ministries[0];
        assert_eq!(sante.name, "Ministère De La Santé");
        assert_eq!(sante.external_id, "ministry_msas");
        assert_eq!(sante.phone, "+221 77 123 45 67");
        assert_eq!(sante.email, "contact@sante.gouv.sn");
        assert_eq!(sante.website, "http://www.sante.gouv.sn");

        let pr = &data.ministries[1];
        assert_eq!(pr.code, "PR");
        assert_eq!(pr.kind, MinistryType::Presidency);

        // explicit duplicate code and duplicate name are both dropped
        assert!(data.ministries.iter().all(|m| m.name != "Ministère Des Finances"));
        assert_eq!(report.duplicates_dropped, 2);

        let culture = &data.ministries[2];
        assert_eq!(culture.phone, "");
        assert_eq!(culture.email, "");
        assert_eq!(report.warnings.iter().filter(|w| w.table == "ministry" && w.field != "code" && w.field != "name").count(), 2);
    }

    #[test]
    fn test_strict_mode_keeps_raw_contacts() {
        let mut report = RunReport::new("test");
        let mut extractor = SheetExtractor::new(FixMode::Strict, &mut report);
        extractor.ministries(&ministries());
        let data = extractor.finish();
        assert_eq!(data.ministries[2].phone, "12345");
        assert_eq!(data.ministries[2].email, "pas-un-email");
    }

    #[test]
    fn test_directions_services_agents_resolve_parents() {
        let mut report = RunReport::new("test");
        let mut extractor = SheetExtractor::new(FixMode::Fix, &mut report);
        extractor.ministries(&ministries());
        extractor.directions(&sheet(
            "Directions",
            "Nom direction;Code direction;Code ministère;Ministère;Catégorie;Type\n\
             Direction générale de la Santé;DGS;msas;;Secrétariat général;\n\
             Direction régionale de Dakar;;;Ministère de la Santé;;\n\
             Direction du Patrimoine;DPC;MCULT;;;Technique\n\
             Direction sans tutelle;;;;;\n",
        ));
        extractor.services(&sheet(
            "Services",
            "Nom service;Code direction;Direction\n\
             Bureau du Courrier;DGS;\n\
             Service des Ressources Humaines;;Direction générale de la Santé\n\
             Bureau du Courrier;DGS;\n",
        ));
        extractor.agents(&sheet(
            "Agents",
            "Prénom;Nom;Matricule;Code service;Fonction;Téléphone mobile;Intérim\n\
             Awa;Diop;MAT-001;;;0771234567;Oui\n\
             Moussa;Fall;MAT-002;XYZ;Chef de bureau;;\n",
        ));
        let data = extractor.finish();

        assert_eq!(data.directions.len(), 3);
        let dgs = &data.directions[0];
        assert_eq!(dgs.external_id, "direction_msas_dgs");
        assert_eq!(dgs.ministry_ref, "ministry_msas");
        assert_eq!(data.categories.len(), 1);
        assert_eq!(dgs.category_ref, data.categories[0].external_id);

        let regional = &data.directions[1];
        assert_eq!(regional.ministry_ref, "ministry_msas");
        assert_eq!(regional.kind, DirectionType::Regionale);
        assert_eq!(regional.ministry_code, "MSAS");

        // unknown ministry: kept with a blank reference
        let patrimoine = &data.directions[2];
        assert_eq!(patrimoine.ministry_ref, "");
        assert_eq!(patrimoine.kind, DirectionType::Technique);

        assert_eq!(data.services.len(), 2);
        assert_eq!(data.services[0].direction_ref, "direction_msas_dgs");
        assert_eq!(data.services[0].kind, ServiceType::Bureau);
        assert!(data.services[0].external_id.starts_with("service_msas_dgs_"));
        assert_eq!(data.services[1].direction_ref, "direction_msas_dgs");

        // the first agent has no service reference at all and is dropped
        assert_eq!(data.agents.len(), 1);
        let fall = &data.agents[0];
        assert_eq!(fall.name, "Moussa Fall");
        assert_eq!(fall.external_id, "agent_mat002");
        assert_eq!(fall.service_ref, "");
        assert_eq!(fall.function, "Chef De Bureau");

        assert_eq!(report.unresolved_refs, 2);
        assert_eq!(report.orphans_dropped, 2);
        assert_eq!(report.duplicates_dropped, 3);
    }

    #[test]
    fn test_service_direction_code_scoped_to_ministry() {
        let mut report = RunReport::new("test");
        let mut extractor = SheetExtractor::new(FixMode::Fix, &mut report);
        extractor.ministries(&sheet(
            "Ministères",
            "Nom;Code
Ministère de la Santé;MSAS
Ministère des Finances;MFB
",
        ));
        extractor.directions(&sheet(
            "Directions",
            "Nom direction;Code direction;Code ministère
             Direction de l'Administration générale;DAG;MSAS
             Direction de l'Administration générale et de l'Équipement;DAG;MFB
",
        ));
        extractor.services(&sheet(
            "Services",
            "Nom service;Code direction;Code ministère
             Bureau du Budget;DAG;MFB
             Bureau du Personnel;DAG;
",
        ));
        let data = extractor.finish();

        assert_eq!(data.directions.len(), 2);
        assert_eq!(data.services[0].name, "Bureau Du Budget");
        assert_eq!(data.services[0].direction_ref, "direction_mfb_dag");
        assert!(data.services[0].external_id.starts_with("service_mfb_dag_"));
        // no ministry on the row: first direction taken, with a warning
        assert_eq!(data.services[1].direction_ref, "direction_msas_dag");
        let shared: Vec<_> = report.warnings.iter().filter(|w| w.message.contains("several ministries")).collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].row, 2);
    }

    #[test]
    fn test_agent_defaults() {
        let mut report = RunReport::new("test");
        let mut extractor = SheetExtractor::new(FixMode::Fix, &mut report);
        extractor.agents(&sheet(
            "Agents",
            "Nom complet;Service;Intérim\nAwa Diop;Bureau du Courrier;non\n",
        ));
        let data = extractor.finish();
        assert_eq!(data.agents[0].function, "Agent");
        assert_eq!(data.agents[0].is_interim, "false");
        assert_eq!(data.agents[0].external_id, "agent_awa_diop");
        assert_eq!(report.unresolved_refs, 1);
    }

    #[test]
    fn test_organigram_fallback() {
        let set = SheetSet::select(vec![
            sheet("Ministères", "nom_ministere;code\nMinistère de la Santé;MSAS\n"),
            sheet("Organigramme", "Direction;Code ministère\nDirection générale de la Santé;MSAS\n"),
        ]);
        let mut report = RunReport::new("test");
        let data = extract_sheets(&set, FixMode::Fix, &mut report);
        assert_eq!(data.directions.len(), 1);
        assert_eq!(data.directions[0].ministry_ref, "ministry_msas");
    }
}
