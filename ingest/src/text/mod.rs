//! Text normalization shared by every stage.
//!
//! Two display forms exist for names:
//!
//! - [`capitalize_words`]: what the extractors emit (every token capitalized),
//!   e.g. `"MINISTÈRE DE LA SANTÉ"` → `"Ministère De La Santé"`.
//! - [`normalize_name`]: the canonical form used by the polish pass, which
//!   keeps short acronyms and lower-cases French function words,
//!   e.g. `"Ministère De La Santé"` → `"Ministère de la Santé"`.
//!
//! Keys used for deduplication and lookups go through [`name_key`], which is
//! insensitive to case, accents and punctuation.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum length of any generated or normalized code.
pub const MAX_CODE_LEN: usize = 10;

/// Tokens of at most this many characters written in capitals are acronyms.
pub const ACRONYM_MAX: usize = 6;

/// Function words kept in lower case unless they open the name.
const FUNCTION_WORDS: &[&str] = &[
    "de", "du", "des", "la", "le", "les", "et", "en", "au", "aux", "à", "pour", "avec", "sur",
    "dans", "par",
];

static TRAILING_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s;.:,]*[;.:,]\s*$").expect("valid trailing punctuation regex"));

/// Compose accents (NFC), replace NBSP, drop soft hyphens, turn line breaks
/// into spaces, collapse whitespace and trim. Punctuation is left alone.
pub fn clean_line(raw: &str) -> String {
    let replaced: String = raw
        .nfc()
        .filter(|c| *c != '\u{00AD}')
        .map(|c| match c {
            '\u{00A0}' | '\u{202F}' | '\r' | '\n' | '\t' => ' ',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove any run of trailing `;`, `.`, `:`, `,` (and the spaces around them).
pub fn strip_trailing_punct(s: &str) -> String {
    TRAILING_PUNCT.replace(s, "").trim().to_string()
}

/// Upper-case the first letter of a token and lower-case the rest.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_acronym(token: &str) -> bool {
    token.chars().count() <= ACRONYM_MAX
        && token.chars().any(char::is_alphabetic)
        && !token.chars().any(char::is_lowercase)
}

/// Extractor display form: every whitespace-separated token capitalized.
pub fn capitalize_words(s: &str) -> String {
    s.split_whitespace().map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Display form of an extracted name: cleaned, punctuation-trimmed, capitalized.
pub fn display_name(raw: &str) -> String {
    capitalize_words(&strip_trailing_punct(&clean_line(raw)))
}

/// Title casing with acronym and function-word handling.
///
/// A capitalized function word in non-first position is lower-cased rather than
/// kept as an acronym.
pub fn smart_title(s: &str) -> String {
    s.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            let lower = token.to_lowercase();
            if i > 0 && FUNCTION_WORDS.contains(&lower.as_str()) {
                lower
            } else if is_acronym(token) {
                token.to_string()
            } else {
                capitalize(token)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical display form of a raw name. Idempotent.
pub fn normalize_name(raw: &str) -> String {
    smart_title(&strip_trailing_punct(&clean_line(raw)))
}

/// Strip diacritics and spell out ligatures, keeping case.
///
/// Works on precomposed and decomposed input alike.
pub fn fold_accents(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            '’' | '‘' | '`' => out.push('\''),
            other => out.push(other),
        }
    }
    out
}

/// ASCII lower-case slug with `-` separators.
pub fn slugify(s: &str) -> String {
    fold_accents(s)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Key for deduplication and name lookups (case, accent and punctuation blind).
pub fn name_key(s: &str) -> String {
    slugify(s)
}

/// Code normalization: ASCII alphanumerics only, upper case, at most 10 characters.
pub fn normalize_code(raw: &str) -> String {
    fold_accents(raw)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_CODE_LEN)
        .collect()
}

/// Column header normalization: `"Téléphone Bureau"` → `"telephone_bureau"`.
pub fn normalize_column_name(col: &str) -> String {
    fold_accents(col.trim())
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line_whitespace_and_nbsp() {
        assert_eq!(
            clean_line("  Direction\u{00A0}des   Impôts\u{00AD}\n et Domaines "),
            "Direction des Impôts et Domaines"
        );
    }

    #[test]
    fn test_strip_trailing_punct() {
        assert_eq!(strip_trailing_punct("Bureau du courrier ;"), "Bureau du courrier");
        assert_eq!(strip_trailing_punct("Cabinet :"), "Cabinet");
        assert_eq!(strip_trailing_punct("Cellule juridique.;"), "Cellule juridique");
        assert_eq!(strip_trailing_punct("Agence, Direction"), "Agence, Direction");
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("MINISTÈRE DE LA SANTÉ"), "Ministère De La Santé");
        assert_eq!(
            capitalize_words("Direction générale de la Santé"),
            "Direction Générale De La Santé"
        );
    }

    #[test]
    fn test_smart_title_rules() {
        assert_eq!(
            smart_title("direction générale DES impôts ET domaines"),
            "Direction Générale des Impôts et Domaines"
        );
        // short all-caps tokens are acronyms
        assert_eq!(smart_title("cellule de passation des DCMP"), "Cellule de Passation des DCMP");
        assert_eq!(smart_title("SANTÉ PUBLIQUE"), "SANTÉ Publique");
        assert_eq!(smart_title("agence ANSD"), "Agence ANSD");
        // long all-caps tokens are not
        assert_eq!(smart_title("PRIMATURE"), "Primature");
        // a function word opening the name stays capitalized
        assert_eq!(smart_title("de la gouvernance"), "De la Gouvernance");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        let inputs = [
            "MINISTÈRE DE LA SANTÉ ET DE L'ACTION SOCIALE ;",
            "  direction\u{00A0}générale  de la COOPÉRATION : ",
            "Service des Ressources Humaines.",
            "Bureau d'ordre",
        ];
        for raw in inputs {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_fold_and_slug() {
        assert_eq!(fold_accents("Œuvre Ébène à Thiès"), "OEuvre Ebene a Thies");
        assert_eq!(slugify("Ministère de l’Intérieur"), "ministere-de-l-interieur");
        assert_eq!(name_key("MINISTÈRE DE LA SANTÉ"), name_key("Ministère de la Santé."));
    }

    #[test]
    fn test_decomposed_accents_fold_and_compose() {
        let decomposed = "Ministe\u{300}re de la Sante\u{301}";
        assert_eq!(fold_accents(decomposed), "Ministere de la Sante");
        assert_eq!(name_key(decomposed), "ministere-de-la-sante");
        assert_eq!(name_key(decomposed), name_key("Ministère de la Santé"));
        assert_eq!(normalize_code("E\u{301}tat"), "ETAT");
        assert_eq!(clean_line(decomposed), "Ministère de la Santé");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("d.g.i-é"), "DGIE");
        assert_eq!(normalize_code("ABCDEFGHIJKLMNOP"), "ABCDEFGHIJ");
        assert_eq!(normalize_code("  "), "");
        let code = normalize_code("msas 01");
        assert_eq!(normalize_code(&code), code);
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Téléphone Bureau"), "telephone_bureau");
        assert_eq!(normalize_column_name(" Code  Ministère "), "code_ministere");
        assert_eq!(normalize_column_name("Niveau 1"), "niveau_1");
    }
}
