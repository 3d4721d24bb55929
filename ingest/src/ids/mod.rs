//! Codes and external identifiers.
//!
//! [`generate_code`] and [`external_id`] are pure functions: the same inputs
//! always give the same output, which keeps bulk imports idempotent across
//! runs. [`CodeAllocator`] enforces per-scope code uniqueness.

use std::collections::{HashMap, HashSet};

use crate::text::{fold_accents, name_key, normalize_code, slugify, MAX_CODE_LEN};

/// Maximum slug length used in name-derived identifiers.
const ID_SLUG_MAX: usize = 30;

/// Codes fixed by convention for the two institutions above the ministries.
const SPECIAL_CODES: &[(&str, &str)] = &[
    ("presidence-de-la-republique", "PR"),
    ("primature", "PM"),
];

/// Conventional code of a ministry-level body, if it has one.
pub fn special_code(name: &str) -> Option<&'static str> {
    let key = name_key(name);
    SPECIAL_CODES.iter().find(|(k, _)| *k == key).map(|(_, code)| *code)
}

/// Derive a short code from a name.
///
/// Up to three tokens: first three letters of each. More: first letter of
/// every token that starts with a letter.
pub fn generate_code(name: &str) -> String {
    let folded = fold_accents(name);
    let tokens: Vec<String> = folded
        .split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect();

    let raw: String = if tokens.len() <= 3 {
        tokens.iter().map(|t| t.chars().take(3).collect::<String>()).collect()
    } else {
        tokens
            .iter()
            .filter_map(|t| t.chars().next())
            .filter(|c| c.is_ascii_alphabetic())
            .collect()
    };
    normalize_code(&raw)
}

/// Ministry code: source code when given, conventional code, else generated.
pub fn ministry_code(name: &str, source_code: &str) -> String {
    let explicit = normalize_code(source_code);
    if !explicit.is_empty() {
        return explicit;
    }
    match special_code(name) {
        Some(code) => code.to_string(),
        None => generate_code(name),
    }
}

/// `{prefix}_{code}` / `{prefix}_{slug}` / `{prefix}_unknown`.
pub fn external_id(prefix: &str, code: &str, name: &str) -> String {
    let code: String = fold_accents(code)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if !code.is_empty() {
        return format!("{}_{}", prefix, code);
    }
    let slug: String = slugify(name).replace('-', "_").chars().take(ID_SLUG_MAX).collect();
    let slug = slug.trim_end_matches('_');
    if !slug.is_empty() {
        return format!("{}_{}", prefix, slug);
    }
    format!("{}_unknown", prefix)
}

/// Identifier prefixes of every level, scoped so ids stay globally unique.
/// Blank scope parts are left out.
pub mod prefix {
    fn scoped(level: &str, parts: &[&str]) -> String {
        let mut out = level.to_string();
        for part in parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            out.push('_');
            out.push_str(&part.to_lowercase());
        }
        out
    }

    pub fn ministry() -> String {
        scoped("ministry", &[])
    }

    pub fn category(ministry_code: &str) -> String {
        scoped("category", &[ministry_code])
    }

    pub fn direction(ministry_code: &str) -> String {
        scoped("direction", &[ministry_code])
    }

    pub fn service(ministry_code: &str, direction_code: &str) -> String {
        scoped("service", &[ministry_code, direction_code])
    }

    pub fn agent() -> String {
        scoped("agent", &[])
    }
}

// =============================================================================
// Per-scope uniqueness
// =============================================================================

/// Outcome of registering a code in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Code is free (possibly after suffixing a generated code).
    Assigned(String),
    /// Source-provided code already taken in this scope.
    Duplicate(String),
}

/// Tracks the codes used inside each scope (a parent external id, or `""`
/// for top-level ministries).
#[derive(Debug, Default)]
pub struct CodeAllocator {
    used: HashMap<String, HashSet<String>>,
}

impl CodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_taken(&self, scope: &str, code: &str) -> bool {
        self.used.get(scope).is_some_and(|codes| codes.contains(code))
    }

    /// Register a source-provided code; a second use in the scope is a duplicate.
    pub fn claim_explicit(&mut self, scope: &str, code: &str) -> Allocation {
        let codes = self.used.entry(scope.to_string()).or_default();
        if codes.insert(code.to_string()) {
            Allocation::Assigned(code.to_string())
        } else {
            Allocation::Duplicate(code.to_string())
        }
    }

    /// Register a generated code, suffixing `2`, `3`, … on collision while
    /// staying within the maximum code length.
    pub fn claim_generated(&mut self, scope: &str, code: &str) -> String {
        let codes = self.used.entry(scope.to_string()).or_default();
        let base = if code.is_empty() { "X".to_string() } else { code.to_string() };
        if codes.insert(base.clone()) {
            return base;
        }
        let mut n: usize = 2;
        loop {
            let suffix = n.to_string();
            let keep = MAX_CODE_LEN.saturating_sub(suffix.len());
            let candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            if codes.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Forget a code (used when a remap moves a ministry to a new code).
    pub fn release(&mut self, scope: &str, code: &str) {
        if let Some(codes) = self.used.get_mut(scope) {
            codes.remove(code);
        }
    }
}

/// Set of external identifiers already handed out in a run.
#[derive(Debug, Default)]
pub struct IdRegistry {
    ids: HashSet<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identifier, appending `_2`, `_3`, … when it is already taken.
    pub fn claim(&mut self, id: String) -> String {
        if self.ids.insert(id.clone()) {
            return id;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", id, n);
            if self.ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_short_names() {
        assert_eq!(generate_code("Cabinet"), "CAB");
        assert_eq!(generate_code("Direction du Budget"), "DIRDUBUD");
        assert_eq!(generate_code("Santé Publique"), "SANPUB");
    }

    #[test]
    fn test_generate_code_long_names() {
        assert_eq!(generate_code("Direction Générale de la Santé"), "DGDLS");
        assert_eq!(
            generate_code("Ministère de la Santé et de l'Action sociale"),
            "MDLSEDLS"
        );
        assert!(generate_code("a b c d e f g h i j k l m").len() <= MAX_CODE_LEN);
    }

    #[test]
    fn test_ministry_code_precedence() {
        assert_eq!(ministry_code("Présidence de la République", ""), "PR");
        assert_eq!(ministry_code("PRIMATURE", ""), "PM");
        assert_eq!(ministry_code("Ministère des Finances", "m.f.b"), "MFB");
        assert_eq!(ministry_code("Ministère des Forces Armées", ""), "MDFA");
    }

    #[test]
    fn test_external_id_is_pure() {
        let a = external_id("ministry", "MSAS", "Ministère de la Santé");
        let b = external_id("ministry", "MSAS", "Ministère de la Santé");
        assert_eq!(a, "ministry_msas");
        assert_eq!(a, b);
    }

    #[test]
    fn test_external_id_fallbacks() {
        assert_eq!(external_id("category_msas", "", "Cabinet du Ministre"), "category_msas_cabinet_du_ministre");
        assert_eq!(external_id("agent", "", "  "), "agent_unknown");
        assert_eq!(external_id("agent", "MAT-2021/0457", "Awa Diop"), "agent_mat20210457");
        let long = external_id("service", "", "Service de la gestion administrative et financière des projets");
        assert!(long.len() <= "service_".len() + ID_SLUG_MAX);
        assert!(!long.ends_with('_'));
    }

    #[test]
    fn test_scoped_prefixes() {
        assert_eq!(prefix::category("MSAS"), "category_msas");
        assert_eq!(prefix::service("MSAS", "DGS"), "service_msas_dgs");
        assert_eq!(prefix::direction(""), "direction");
    }

    #[test]
    fn test_allocator_suffixes_generated_codes() {
        let mut alloc = CodeAllocator::new();
        assert_eq!(alloc.claim_generated("ministry_msas", "DGS"), "DGS");
        assert_eq!(alloc.claim_generated("ministry_msas", "DGS"), "DGS2");
        assert_eq!(alloc.claim_generated("ministry_msas", "DGS"), "DGS3");
        // other scope is independent
        assert_eq!(alloc.claim_generated("ministry_mfb", "DGS"), "DGS");
    }

    #[test]
    fn test_allocator_suffix_stays_within_max_len() {
        let mut alloc = CodeAllocator::new();
        alloc.claim_generated("", "ABCDEFGHIJ");
        let second = alloc.claim_generated("", "ABCDEFGHIJ");
        assert_eq!(second, "ABCDEFGHI2");
        assert!(second.len() <= MAX_CODE_LEN);
    }

    #[test]
    fn test_allocator_explicit_duplicates() {
        let mut alloc = CodeAllocator::new();
        assert_eq!(alloc.claim_explicit("", "MSAS"), Allocation::Assigned("MSAS".into()));
        assert_eq!(alloc.claim_explicit("", "MSAS"), Allocation::Duplicate("MSAS".into()));
        assert!(alloc.is_taken("", "MSAS"));
        alloc.release("", "MSAS");
        assert!(!alloc.is_taken("", "MSAS"));
    }
}
