//! Heuristic line classifier.
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! 0. legal clauses (`Vu …`, `Décrète`, `Article …`, `Considérant …`) are dropped
//! 1. ministry headings (institutional keyword, or an all-caps line)
//! 2. category headings (`1° …`, `2) …`, `3. …`, or `…:` with a category keyword)
//! 3. direction headings (hint token, trailing `:`, or a depth-0 list item
//!    naming a direction)
//! 4. leaves (bullet, trailing `;`/`.`, organizational noun, ` ; ` separator,
//!    nested list item), split into one service per `;` clause
//! 5. anything else is unclassified
//!
//! Unclassified lines are dropped: a missed unit is cheaper than a misfiled one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{capitalize_words, clean_line, fold_accents, strip_trailing_punct};

/// Structural context of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyContext {
    /// List depth from the source format, `None` when it has no list structure.
    pub depth: Option<u8>,
    /// The active direction heading is a "direction générale".
    pub under_general_direction: bool,
}

impl ClassifyContext {
    pub fn at_depth(depth: Option<u8>) -> Self {
        Self { depth, ..Default::default() }
    }

    pub fn under_general(mut self, under: bool) -> Self {
        self.under_general_direction = under;
        self
    }
}

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Blank,
    LegalClause,
    Ministry { name: String },
    Category { name: String },
    DirectionHeading { name: String, is_general: bool },
    /// One or more leaf services (one per `;` clause).
    Services { names: Vec<String> },
    Unclassified,
}

impl Classification {
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Blank => "blank",
            Classification::LegalClause => "legal",
            Classification::Ministry { .. } => "ministry",
            Classification::Category { .. } => "category",
            Classification::DirectionHeading { .. } => "direction",
            Classification::Services { .. } => "service",
            Classification::Unclassified => "unclassified",
        }
    }
}

// =============================================================================
// Vocabulary
// =============================================================================

/// Leading keywords of ministry-level bodies (accent-folded, lower case).
const MINISTRY_KEYWORDS: &[&str] = &["presidence", "primature", "ministere"];

/// Category keywords for colon-terminated headings (accent-folded, lower case).
const CATEGORY_KEYWORDS: &[&str] = &[
    "cabinet",
    "secretariat general",
    "services du palais",
    "autres administrations",
    "directions",
    "services propres",
    "services rattaches",
];

/// Keywords making a depth-0 list item a direction heading.
const DIRECTION_KEYWORDS: &[&str] = &["direction", "inspection", "secretariat general"];

/// Organizational nouns that open a leaf line.
const LEAF_NOUNS: &[&str] = &[
    "service", "bureau", "cellule", "division", "commission", "comite", "conseil", "agence",
    "autorite", "fonds", "centre", "observatoire", "office", "inspection", "delegation",
    "grande chancellerie", "unite", "paierie", "recette", "tresorerie", "ecole", "institut",
    "fondation",
];

const BULLETS: &[char] = &['-', '•', '➢', '>', '–', '—', '*', '▪', '◦', '●'];

static LEGAL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(vu|decrete|article|considerant)\b").expect("valid legal marker regex")
});

static NUMBERED_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\s*(?:[°º]\s*\)?|\)|\.)\s*(\S.*)$").expect("valid numbered prefix regex")
});

static DIRECTION_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(pole|direction generale|etat[- ]major|haute autorite|secretariat)\b")
        .expect("valid direction hint regex")
});

static LEAF_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\s*[-.)]\s*").expect("valid leaf number regex"));

// =============================================================================
// Helpers
// =============================================================================

fn folded(s: &str) -> String {
    fold_accents(s).to_lowercase()
}

fn is_bulleted(line: &str) -> bool {
    line.starts_with(BULLETS)
}

fn is_legal_clause(line: &str) -> bool {
    LEGAL_MARKER.is_match(&folded(line))
}

fn is_upper_heading(line: &str) -> bool {
    let t = strip_trailing_punct(line);
    t.chars().count() >= 4
        && t.chars().any(char::is_alphabetic)
        && t.chars().all(|c| {
            (c.is_alphabetic() && !c.is_lowercase()) || matches!(c, ' ' | '-' | '\'' | '’')
        })
}

/// `"MINISTÈRE DE LA SANTÉ :"` → `"Ministère De La Santé"`
fn heading_name(text: &str) -> String {
    capitalize_words(&strip_trailing_punct(text))
}

/// Strip bullets, a leading item number and trailing separators.
pub fn clean_leaf(text: &str) -> String {
    let t = text.trim_start_matches(|c: char| BULLETS.contains(&c) || c.is_whitespace());
    let t = LEAF_NUMBER.replace(t, "");
    strip_trailing_punct(t.trim())
}

fn starts_with_leaf_noun(lower: &str) -> bool {
    LEAF_NOUNS.iter().any(|noun| {
        lower
            .strip_prefix(noun)
            .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with('\''))
    })
}

// =============================================================================
// Rules
// =============================================================================

fn ministry_rule(line: &str, lower: &str, ctx: &ClassifyContext) -> Option<Classification> {
    let keyword = MINISTRY_KEYWORDS.iter().any(|k| lower.starts_with(k));
    let nested = is_bulleted(line) || ctx.depth.is_some();
    if keyword || (!nested && is_upper_heading(line)) {
        return Some(Classification::Ministry { name: heading_name(line) });
    }
    None
}

fn category_rule(line: &str, lower: &str) -> Option<Classification> {
    if let Some(caps) = NUMBERED_PREFIX.captures(line) {
        let name = heading_name(&caps[1]);
        if !name.is_empty() {
            return Some(Classification::Category { name });
        }
    }
    if line.ends_with(':') && CATEGORY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(Classification::Category { name: heading_name(line) });
    }
    None
}

fn direction_rule(line: &str, lower: &str, ctx: &ClassifyContext) -> Option<Classification> {
    let hinted = !is_bulleted(line) && DIRECTION_HINT.is_match(lower);
    let colon = line.ends_with(':');
    let top_list_item = ctx.depth == Some(0) && DIRECTION_KEYWORDS.iter().any(|k| lower.contains(k));

    if hinted || colon || top_list_item {
        let name = heading_name(&clean_leaf(line));
        if name.is_empty() {
            return None;
        }
        let is_general = folded(&name).starts_with("direction generale");
        return Some(Classification::DirectionHeading { name, is_general });
    }
    None
}

fn leaf_rule(line: &str, ctx: &ClassifyContext) -> Option<Classification> {
    let body = clean_leaf(line);
    let body_lower = folded(&body);

    let is_leaf = is_bulleted(line)
        || line.ends_with(';')
        || line.ends_with('.')
        || starts_with_leaf_noun(&body_lower)
        || (ctx.under_general_direction && body_lower.starts_with("direction "))
        || line.contains(" ; ")
        || ctx.depth.is_some_and(|d| d >= 1);
    if !is_leaf {
        return None;
    }

    let names: Vec<String> = line
        .split(';')
        .map(clean_leaf)
        .filter(|clause| !clause.is_empty())
        .map(|clause| capitalize_words(&clause))
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(Classification::Services { names })
}

/// Classify one raw line.
pub fn classify(raw: &str, ctx: &ClassifyContext) -> Classification {
    let line = clean_line(raw);
    if line.is_empty() {
        return Classification::Blank;
    }
    if is_legal_clause(&line) {
        return Classification::LegalClause;
    }
    let lower = folded(&line);

    ministry_rule(&line, &lower, ctx)
        .or_else(|| category_rule(&line, &lower))
        .or_else(|| direction_rule(&line, &lower, ctx))
        .or_else(|| leaf_rule(&line, ctx))
        .unwrap_or(Classification::Unclassified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &str) -> Classification {
        classify(line, &ClassifyContext::default())
    }

    #[test]
    fn test_scenario_lines() {
        assert_eq!(
            plain("MINISTÈRE DE LA SANTÉ"),
            Classification::Ministry { name: "Ministère De La Santé".into() }
        );
        assert_eq!(plain("1° Cabinet"), Classification::Category { name: "Cabinet".into() });
        assert_eq!(
            plain("Direction générale de la Santé :"),
            Classification::DirectionHeading {
                name: "Direction Générale De La Santé".into(),
                is_general: true
            }
        );
        assert_eq!(
            plain("- Service des Ressources Humaines;"),
            Classification::Services { names: vec!["Service Des Ressources Humaines".into()] }
        );
    }

    #[test]
    fn test_decomposed_accents_classify_like_composed() {
        let decomposed = "Ministe\u{300}re de la Sante\u{301} et de l'Action sociale";
        let composed = "Ministère de la Santé et de l'Action sociale";
        assert_eq!(plain(decomposed), plain(composed));
        assert_eq!(
            plain(decomposed),
            Classification::Ministry { name: "Ministère De La Santé Et De L'action Sociale".into() }
        );
        assert_eq!(plain("De\u{301}cre\u{300}te :"), Classification::LegalClause);
    }

    #[test]
    fn test_legal_clauses_never_classified() {
        for line in [
            "Vu la loi n°...",
            "VU LA CONSTITUTION",
            "Vu le décret n° 2019-910 du 15 mai 2019 ;",
            "DÉCRÈTE :",
            "Article premier. - Le Ministère de la Santé comprend :",
            "Considérant la nécessité de réorganiser les services.",
        ] {
            assert_eq!(plain(line), Classification::LegalClause, "{line}");
        }
    }

    #[test]
    fn test_ministry_keyword_variants() {
        assert!(matches!(plain("Présidence de la République"), Classification::Ministry { .. }));
        assert!(matches!(plain("Primature"), Classification::Ministry { .. }));
        assert!(matches!(plain("Ministere des Finances et du Budget"), Classification::Ministry { .. }));
    }

    #[test]
    fn test_uppercase_rule_threshold_and_nesting() {
        // three letters is too short
        assert_eq!(plain("DRH"), Classification::Unclassified);
        assert!(matches!(plain("MSAS"), Classification::Ministry { .. }));
        // nested items never open a ministry through the uppercase rule
        assert!(matches!(plain("- DAGE ;"), Classification::Services { .. }));
        let nested = ClassifyContext::at_depth(Some(1));
        assert!(matches!(classify("DAGE", &nested), Classification::Services { .. }));
    }

    #[test]
    fn test_category_rules() {
        assert_eq!(plain("2) Secrétariat général"), Classification::Category { name: "Secrétariat Général".into() });
        assert_eq!(plain("3. Autres administrations"), Classification::Category { name: "Autres Administrations".into() });
        assert_eq!(plain("Services du Palais :"), Classification::Category { name: "Services Du Palais".into() });
    }

    #[test]
    fn test_direction_heading_rules() {
        assert_eq!(
            plain("Pôle Économie et Finances"),
            Classification::DirectionHeading { name: "Pôle Économie Et Finances".into(), is_general: false }
        );
        assert!(matches!(plain("État-Major particulier"), Classification::DirectionHeading { .. }));
        assert!(matches!(plain("Services techniques :"), Classification::DirectionHeading { .. }));
        // métropole is not a pôle
        assert_eq!(plain("Aménagement de la métropole"), Classification::Unclassified);
    }

    #[test]
    fn test_depth_zero_direction_item() {
        let top = ClassifyContext::at_depth(Some(0));
        assert!(matches!(
            classify("Inspection des Affaires administratives", &top),
            Classification::DirectionHeading { is_general: false, .. }
        ));
        assert!(matches!(
            classify("Direction générale du Budget", &top),
            Classification::DirectionHeading { is_general: true, .. }
        ));
    }

    #[test]
    fn test_leaf_rules_and_clause_splitting() {
        assert_eq!(
            plain("Bureau du courrier ; Bureau des archives ; Cellule juridique"),
            Classification::Services {
                names: vec!["Bureau Du Courrier".into(), "Bureau Des Archives".into(), "Cellule Juridique".into()]
            }
        );
        assert_eq!(
            plain("• 1- Agence comptable."),
            Classification::Services { names: vec!["Agence Comptable".into()] }
        );
        assert_eq!(
            plain("Commission nationale des contrats"),
            Classification::Services { names: vec!["Commission Nationale Des Contrats".into()] }
        );
    }

    #[test]
    fn test_direction_leaf_only_under_general_direction() {
        assert_eq!(plain("Direction de la Pêche continentale"), Classification::Unclassified);
        let under_dg = ClassifyContext::default().under_general(true);
        assert_eq!(
            classify("Direction de la Pêche continentale", &under_dg),
            Classification::Services { names: vec!["Direction De La Pêche Continentale".into()] }
        );
    }

    #[test]
    fn test_blank_and_unclassified() {
        assert_eq!(plain("  \u{00A0} "), Classification::Blank);
        assert_eq!(plain("Le présent organigramme est indicatif"), Classification::Unclassified);
    }

    #[test]
    fn test_clean_leaf() {
        assert_eq!(clean_leaf("➢ 2. Bureau d'ordre ;"), "Bureau d'ordre");
        assert_eq!(clean_leaf("– Cellule de communication."), "Cellule de communication");
    }
}
