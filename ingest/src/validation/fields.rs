//! Contact field normalizers.
//!
//! Each validator returns `(value, warning)`: the canonical value (or the
//! blank/raw fallback on failure, depending on [`FixMode`]) and an optional
//! warning for the run report. A blank input is valid and yields a blank value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Senegal's country calling code.
pub const CALLING_CODE: &str = "221";

/// Leading two digits of valid national numbers (fixed lines and mobile operators).
const NATIONAL_PREFIXES: &[&str] = &["30", "33", "70", "75", "76", "77", "78"];

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").expect("valid email regex")
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[a-z0-9.\-]+\.[a-z]{2,}(:[0-9]+)?([/?#].*)?$").expect("valid url regex")
});

/// What to do with a value that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixMode {
    /// Blank the field.
    #[default]
    Fix,
    /// Keep the raw value.
    Strict,
}

impl FixMode {
    fn fallback(&self, raw: &str) -> String {
        match self {
            FixMode::Fix => String::new(),
            FixMode::Strict => raw.trim().to_string(),
        }
    }
}

/// Lower-case and check a mailbox address.
pub fn validate_email(raw: &str, mode: FixMode) -> (String, Option<String>) {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return (value, None);
    }
    if EMAIL.is_match(&value) && !value.contains("..") {
        (value, None)
    } else {
        (mode.fallback(raw), Some(format!("invalid email '{}'", raw.trim())))
    }
}

/// Canonical national number (9 digits) from any accepted spelling.
fn national_number(digits: &str) -> Option<&str> {
    let national = match digits.len() {
        9 => digits,
        10 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with(CALLING_CODE) => &digits[3..],
        14 if digits.starts_with("00221") => &digits[5..],
        _ => return None,
    };
    NATIONAL_PREFIXES
        .iter()
        .any(|p| national.starts_with(p))
        .then_some(national)
}

/// Normalize a phone number to `+221 XX XXX XX XX`.
pub fn validate_phone(raw: &str, mode: FixMode) -> (String, Option<String>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (String::new(), None);
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    match national_number(&digits) {
        Some(n) => (
            format!("+{} {} {} {} {}", CALLING_CODE, &n[0..2], &n[2..5], &n[5..7], &n[7..9]),
            None,
        ),
        None => (mode.fallback(raw), Some(format!("invalid phone '{}'", trimmed))),
    }
}

/// Lower-case a web address and add `http://` when no scheme is given.
pub fn validate_url(raw: &str, mode: FixMode) -> (String, Option<String>) {
    let mut value = raw.trim().to_lowercase();
    if value.is_empty() {
        return (value, None);
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        value = format!("http://{}", value);
    }
    if URL.is_match(&value) {
        (value, None)
    } else {
        (mode.fallback(raw), Some(format!("invalid url '{}'", raw.trim())))
    }
}
