//! Records produced by the pipeline, one type per hierarchy level.
//!
//! - [`Ministry`] - top-level body (ministry, presidency, prime minister's office)
//! - [`Category`] - optional grouping under a ministry ("Cabinet", "Directions")
//! - [`Direction`] - directorate under a ministry, optionally under a category
//! - [`Service`] - bureau / cell / division under a direction
//! - [`Agent`] - staff member assigned to a service
//!
//! Parent links are plain external identifiers (columns ending in `/id`),
//! never object references. Blank strings mean "no value".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::text::fold_accents;

// =============================================================================
// Hierarchy Level
// =============================================================================

/// Level of the administrative hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ministry,
    Category,
    Direction,
    Service,
    Agent,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Ministry,
        Level::Category,
        Level::Direction,
        Level::Service,
        Level::Agent,
    ];

    /// Prefix of external identifiers at this level.
    pub fn prefix(&self) -> &'static str {
        match self {
            Level::Ministry => "ministry",
            Level::Category => "category",
            Level::Direction => "direction",
            Level::Service => "service",
            Level::Agent => "agent",
        }
    }

    /// Model name in the record-management system.
    pub fn model(&self) -> &'static str {
        match self {
            Level::Ministry => "sn.ministry",
            Level::Category => "sn.category",
            Level::Direction => "sn.direction",
            Level::Service => "sn.service",
            Level::Agent => "sn.agent",
        }
    }

    /// Delimited output file name.
    pub fn csv_file(&self) -> String {
        format!("{}.csv", self.prefix())
    }

    /// Structured-record output file name.
    pub fn xml_file(&self) -> String {
        format!("sn_{}_data.xml", self.prefix())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Ministry => "ministries",
            Level::Category => "categories",
            Level::Direction => "directions",
            Level::Service => "services",
            Level::Agent => "agents",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ministry" | "ministries" | "ministere" => Ok(Level::Ministry),
            "category" | "categories" | "categorie" => Ok(Level::Category),
            "direction" | "directions" => Ok(Level::Direction),
            "service" | "services" => Ok(Level::Service),
            "agent" | "agents" => Ok(Level::Agent),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

fn folded_lower(s: &str) -> String {
    fold_accents(s.trim()).to_lowercase()
}

// =============================================================================
// Entity Types
// =============================================================================

/// Kind of top-level body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinistryType {
    Presidency,
    Primature,
    #[default]
    Ministry,
}

impl MinistryType {
    /// Infer from the body's name.
    pub fn from_name(name: &str) -> Self {
        let n = folded_lower(name);
        if n.starts_with("presidence") {
            Self::Presidency
        } else if n.starts_with("primature") {
            Self::Primature
        } else {
            Self::Ministry
        }
    }

    /// Parse a free-text type column ("Présidence", "ministère", "presidency").
    pub fn from_label(label: &str) -> Option<Self> {
        match folded_lower(label).as_str() {
            "presidence" | "presidency" => Some(Self::Presidency),
            "primature" => Some(Self::Primature),
            "ministere" | "ministry" => Some(Self::Ministry),
            _ => None,
        }
    }
}

/// Kind of directorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionType {
    #[default]
    Generale,
    Regionale,
    Technique,
}

impl DirectionType {
    pub fn from_name(name: &str) -> Self {
        let n = folded_lower(name);
        if n.contains("regional") {
            Self::Regionale
        } else if n.contains("general") {
            Self::Generale
        } else if n.starts_with("inspection") || n.starts_with("secretariat") || n.contains("technique") {
            Self::Technique
        } else {
            Self::Generale
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match folded_lower(label).as_str() {
            "generale" => Some(Self::Generale),
            "regionale" => Some(Self::Regionale),
            "technique" | "inspection" | "secretariat" => Some(Self::Technique),
            _ => None,
        }
    }
}

/// Kind of leaf unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Service,
    Bureau,
    Cellule,
    Division,
}

impl ServiceType {
    /// Infer from the leading noun of the unit's name.
    pub fn from_name(name: &str) -> Self {
        let n = folded_lower(name);
        match n.split_whitespace().next().unwrap_or("") {
            "bureau" => Self::Bureau,
            "cellule" => Self::Cellule,
            "division" => Self::Division,
            _ => Self::Service,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match folded_lower(label).as_str() {
            "service" => Some(Self::Service),
            "bureau" => Some(Self::Bureau),
            "cellule" => Some(Self::Cellule),
            "division" => Some(Self::Division),
            _ => None,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Common view over the per-level records.
pub trait OrgRecord: Serialize + DeserializeOwned + Clone {
    const LEVEL: Level;

    fn external_id(&self) -> &str;
    fn name(&self) -> &str;
    fn name_mut(&mut self) -> &mut String;

    fn code(&self) -> &str {
        ""
    }

    fn code_mut(&mut self) -> Option<&mut String> {
        None
    }

    /// Main parent reference (blank for ministries).
    fn parent_ref(&self) -> &str {
        ""
    }
}

/// A ministry, the presidency or the prime minister's office.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ministry {
    pub external_id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: MinistryType,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
}

impl OrgRecord for Ministry {
    const LEVEL: Level = Level::Ministry;

    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn code_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.code)
    }
}

/// Optional second-level grouping under a ministry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub external_id: String,
    pub name: String,
    #[serde(rename = "ministry_id/id")]
    pub ministry_ref: String,
}

impl OrgRecord for Category {
    const LEVEL: Level = Level::Category;

    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
    fn parent_ref(&self) -> &str {
        &self.ministry_ref
    }
}

/// A directorate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub external_id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DirectionType,
    #[serde(default)]
    pub ministry_code: String,
    #[serde(rename = "ministry_id/id")]
    pub ministry_ref: String,
    #[serde(rename = "category_id/id", default)]
    pub category_ref: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub manager_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl OrgRecord for Direction {
    const LEVEL: Level = Level::Direction;

    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn code_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.code)
    }
    fn parent_ref(&self) -> &str {
        &self.ministry_ref
    }
}

/// A service, bureau, cell or division.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub external_id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: ServiceType,
    #[serde(default)]
    pub direction_code: String,
    #[serde(rename = "direction_id/id")]
    pub direction_ref: String,
    #[serde(default)]
    pub manager_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl OrgRecord for Service {
    const LEVEL: Level = Level::Service;

    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn code_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.code)
    }
    fn parent_ref(&self) -> &str {
        &self.direction_ref
    }
}

/// A staff member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub function: String,
    #[serde(default)]
    pub service_code: String,
    #[serde(rename = "service_id/id")]
    pub service_ref: String,
    #[serde(default)]
    pub matricule: String,
    #[serde(default)]
    pub work_phone: String,
    #[serde(default)]
    pub mobile_phone: String,
    #[serde(default)]
    pub work_email: String,
    #[serde(default)]
    pub nomination_date: String,
    #[serde(default)]
    pub nomination_decree: String,
    #[serde(default)]
    pub is_interim: String,
}

impl OrgRecord for Agent {
    const LEVEL: Level = Level::Agent;

    fn external_id(&self) -> &str {
        &self.external_id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn name_mut(&mut self) -> &mut String {
        &mut self.name
    }
    fn parent_ref(&self) -> &str {
        &self.service_ref
    }
}

/// One row of the flat four-column dump: ancestor names of an emitted service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelRow {
    #[serde(rename = "Niveau 1")]
    pub level1: String,
    #[serde(rename = "Niveau 2")]
    pub level2: String,
    #[serde(rename = "Niveau 3")]
    pub level3: String,
    #[serde(rename = "Niveau 4")]
    pub level4: String,
}

// =============================================================================
// Dataset
// =============================================================================

/// Every table produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub ministries: Vec<Ministry>,
    pub categories: Vec<Category>,
    pub directions: Vec<Direction>,
    pub services: Vec<Service>,
    pub agents: Vec<Agent>,
    pub level_rows: Vec<LevelRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, level: Level) -> usize {
        match level {
            Level::Ministry => self.ministries.len(),
            Level::Category => self.categories.len(),
            Level::Direction => self.directions.len(),
            Level::Service => self.services.len(),
            Level::Agent => self.agents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Level::ALL.iter().all(|l| self.count(*l) == 0)
    }
}
