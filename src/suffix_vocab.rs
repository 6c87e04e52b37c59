//! Corpus-built domain suffix vocabulary.
//!
//! The suffixes seen across every candidate host of a run are collected once and
//! compiled into a single end-anchored alternation. Stripping that pattern from a
//! host yields its core token, the part compared against company names.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

/// Trailing dot-suffix, terminated by end of string, whitespace or a slash.
pub const DEFAULT_SUFFIX_PATTERN: &str = r"\.\w+($|\s|/)";

pub static DEFAULT_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_SUFFIX_PATTERN).expect("Invalid default suffix regex")
});

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("No domain suffixes found in any candidate URL; cannot build the suffix stripping pattern")]
    Empty,

    #[error("Failed to compile suffix stripping pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Immutable set of observed suffixes plus the compiled stripping pattern.
#[derive(Debug, Clone)]
pub struct SuffixVocabulary {
    suffixes: BTreeSet<String>,
    strip_pattern: Regex,
}

impl SuffixVocabulary {
    /// Build from candidate hosts using the default extraction pattern.
    pub fn build<'a, I>(hosts: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::build_with_pattern(hosts, &DEFAULT_SUFFIX_REGEX)
    }

    /// Build from candidate hosts using a custom extraction pattern.
    pub fn build_with_pattern<'a, I>(hosts: I, extract: &Regex) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scanned = 0usize;
        let suffixes: BTreeSet<String> = hosts
            .into_iter()
            .inspect(|_| scanned += 1)
            .filter_map(|host| extract_suffix(host, extract))
            .collect();

        info!("Suffix vocabulary: {} distinct suffixes from {} candidate hosts", suffixes.len(), scanned);
        Self::from_suffixes(suffixes)
    }

    /// Compile a vocabulary from an explicit suffix list (leading dots are ignored).
    pub fn from_suffixes<I, S>(suffixes: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes: BTreeSet<String> = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if suffixes.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let alternation = suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let strip_pattern = Regex::new(&format!(r"\.(?:{})$", alternation))?;
        debug!("Compiled suffix stripping pattern with {} alternatives", suffixes.len());

        Ok(Self {
            suffixes,
            strip_pattern,
        })
    }

    /// Remove a trailing vocabulary suffix from `host`.
    pub fn strip<'h>(&self, host: &'h str) -> std::borrow::Cow<'h, str> {
        self.strip_pattern.replace(host, "")
    }

    /// Core token of an optional host; empty when the host is missing.
    pub fn core_token(&self, host: Option<&str>) -> String {
        host.map(|h| self.strip(h).into_owned()).unwrap_or_default()
    }

    pub fn contains(&self, suffix: &str) -> bool {
        self.suffixes.contains(suffix.trim_matches('.'))
    }

    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Suffixes in sorted order, without leading dot.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }
}

/// First trailing suffix token of `host` matched by `extract`, without dots or slashes.
pub fn extract_suffix(host: &str, extract: &Regex) -> Option<String> {
    let matched = extract.find(host)?;
    let suffix = matched
        .as_str()
        .trim()
        .trim_matches('/')
        .trim_matches('.');
    if suffix.is_empty() {
        None
    } else {
        Some(suffix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_suffix() {
        let re = &*DEFAULT_SUFFIX_REGEX;
        assert_eq!(extract_suffix("acme-solutions.be", re), Some("be".to_string()));
        assert_eq!(extract_suffix("shop.acme.co.uk", re), Some("uk".to_string()));
        assert_eq!(extract_suffix("acme.be/contact", re), Some("be".to_string()));
        assert_eq!(extract_suffix("localhost", re), None);
        assert_eq!(extract_suffix("", re), None);
    }

    #[test]
    fn test_build_collects_distinct_suffixes() {
        let vocab = SuffixVocabulary::build(["acme.be", "foo.com", "bar.be", "nodot"]).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("be"));
        assert!(vocab.contains(".com"));
        assert_eq!(vocab.iter().collect::<Vec<_>>(), vec!["be", "com"]);
    }

    #[test]
    fn test_build_empty_corpus_is_an_error() {
        let empty: Vec<&str> = Vec::new();
        assert!(matches!(SuffixVocabulary::build(empty), Err(VocabularyError::Empty)));
        assert!(matches!(SuffixVocabulary::build(["localhost"]), Err(VocabularyError::Empty)));
    }

    #[test]
    fn test_strip_removes_only_trailing_suffix() {
        let vocab = SuffixVocabulary::from_suffixes(["be", "com"]).unwrap();
        assert_eq!(vocab.strip("acme-solutions.be"), "acme-solutions");
        assert_eq!(vocab.strip("be.acme.com"), "be.acme");
        assert_eq!(vocab.strip("acme.nl"), "acme.nl");
        assert_eq!(vocab.strip("acmebe"), "acmebe");
    }

    #[test]
    fn test_strip_prefers_full_label_match() {
        let vocab = SuffixVocabulary::from_suffixes(["co", "com"]).unwrap();
        assert_eq!(vocab.strip("acme.com"), "acme");
        assert_eq!(vocab.strip("acme.co"), "acme");
    }

    #[test]
    fn test_strip_can_over_strip_matching_label() {
        // A host ending in a label another domain used as its suffix loses that label
        let vocab = SuffixVocabulary::from_suffixes(["be", "solutions"]).unwrap();
        assert_eq!(vocab.strip("acme.solutions"), "acme");
    }

    #[test]
    fn test_suffixes_are_escaped() {
        let vocab = SuffixVocabulary::from_suffixes(["c+"]).unwrap();
        assert_eq!(vocab.strip("acme.c+"), "acme");
        assert_eq!(vocab.strip("acme.cc"), "acme.cc");
    }

    #[test]
    fn test_core_token_of_missing_host_is_empty() {
        let vocab = SuffixVocabulary::from_suffixes(["be"]).unwrap();
        assert_eq!(vocab.core_token(None), "");
        assert_eq!(vocab.core_token(Some("acme.be")), "acme");
    }
}
