//! Official Name Cleaning
//!
//! Company names arrive as registered, e.g. "Acme Solutions NV (in vereffening)"
//! or "Bakkerij De Smet [BE]". Before they are compared against domains they are:
//! - lowercased
//! - stripped of bracketed `[...]` spans
//! - stripped of parenthesized `(...)` spans
//! - stripped of hyphens
//!
//! Word-presence checks run on this spaced form; lengths and similarity metrics
//! use the compact form with all whitespace removed.
//!
//! Also derives an abbreviation from the initials when none is supplied.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static BRACKETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[.*?\]").expect("Invalid bracket regex")
});

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(.*?\)").expect("Invalid parenthesis regex")
});

/// The derived name forms a record's features are computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameForms {
    /// Cleaned official name, whitespace preserved
    pub spaced: String,
    /// Cleaned official name with whitespace removed
    pub compact: String,
    /// Lowercased abbreviation, given or derived
    pub abbreviation: String,
}

impl NameForms {
    pub fn new(official_name: Option<&str>, abbreviation: Option<&str>) -> Self {
        let spaced = official_name.map(clean_official_name).unwrap_or_default();
        let compact = remove_whitespace(&spaced);

        let abbreviation = match abbreviation.map(str::trim).filter(|a| !a.is_empty()) {
            Some(given) => given.to_lowercase(),
            None => {
                let derived = official_name.map(derive_abbreviation).unwrap_or_default();
                debug!("Derived abbreviation '{}' for '{}'", derived, official_name.unwrap_or(""));
                derived.to_lowercase()
            }
        };

        Self {
            spaced,
            compact,
            abbreviation,
        }
    }

    /// Whitespace-delimited tokens of the spaced form.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.spaced.split_whitespace()
    }
}

/// Lowercase, then remove bracketed spans, parenthesized spans and hyphens, in that order.
pub fn clean_official_name(name: &str) -> String {
    strip_annotations(&name.to_lowercase())
}

/// Initials of the whitespace-delimited tokens, e.g. "Acme Solutions NV" -> "ASN".
/// Case is preserved; brackets, parentheses and hyphens are removed first.
pub fn derive_abbreviation(name: &str) -> String {
    strip_annotations(name)
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

fn strip_annotations(name: &str) -> String {
    let result = BRACKETED.replace_all(name, "");
    let result = PARENTHESIZED.replace_all(&result, "");
    result.replace('-', "")
}

/// Remove every whitespace char.
pub fn remove_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}
