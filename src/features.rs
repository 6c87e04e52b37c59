//! Per-record feature assembly.
//!
//! Every record produces the same fixed-width row, whether or not its candidate
//! slots are filled:
//! - two presence flags per candidate (official-name word, abbreviation)
//! - official name length and abbreviation length
//! - per candidate, six metrics against the official name and the abbreviation
//!   each, plus hamming distance and n-gram overlap against the official name

use crate::org_normalizer::NameForms;
use crate::record::{Record, RecordDomains, CANDIDATE_COUNT};
use crate::similarity;
use crate::suffix_vocab::SuffixVocabulary;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Metric values per candidate slot.
pub const METRICS_PER_CANDIDATE: usize = 14;

/// Total number of feature columns.
pub const FEATURE_WIDTH: usize = CANDIDATE_COUNT * 2 + 2 + CANDIDATE_COUNT * METRICS_PER_CANDIDATE;

/// Metrics computed against both the official name and the abbreviation, in column order.
const PAIR_METRIC_NAMES: [&str; 6] = [
    "jaccard",
    "is_subsequence",
    "seq_match",
    "levenshtein",
    "cosine_similarity",
    "levenshtein_similarity",
];

static COLUMN_NAMES: Lazy<Vec<String>> = Lazy::new(build_column_names);

fn build_column_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_WIDTH);
    for slot in 1..=CANDIDATE_COUNT {
        names.push(format!("url{}_has_official_word", slot));
        names.push(format!("url{}_has_abbreviation", slot));
    }
    names.push("official_name_length".to_string());
    names.push("abbreviation_length".to_string());
    for slot in 1..=CANDIDATE_COUNT {
        for metric in PAIR_METRIC_NAMES {
            names.push(format!("url{}_official_{}", slot, metric));
            names.push(format!("url{}_abbrev_{}", slot, metric));
        }
        names.push(format!("url{}_hamming_distance", slot));
        names.push(format!("url{}_ngram_overlap", slot));
    }
    names
}

/// Presence flags of one candidate URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CandidateFlags {
    pub has_official_word: bool,
    pub has_abbreviation: bool,
}

impl CandidateFlags {
    /// Literal substring checks against the lowercased URL. A missing URL has no flags set.
    pub fn compute(names: &NameForms, url: Option<&str>) -> Self {
        let Some(url) = url else {
            return Self::default();
        };
        let url = url.to_lowercase();

        Self {
            has_official_word: names.words().any(|word| url.contains(word)),
            has_abbreviation: url.contains(names.abbreviation.as_str()),
        }
    }
}

/// Metrics shared by the official-name and abbreviation comparisons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PairMetrics {
    pub jaccard: f64,
    pub is_subsequence: bool,
    pub seq_match: f64,
    pub levenshtein: usize,
    pub cosine_similarity: f64,
    pub levenshtein_similarity: f64,
}

impl PairMetrics {
    pub fn compute(name: &str, token: &str) -> Self {
        Self {
            jaccard: similarity::jaccard(name, token),
            is_subsequence: similarity::is_subsequence(name, token),
            seq_match: similarity::sequence_match_ratio(name, token),
            levenshtein: similarity::levenshtein(name, token),
            cosine_similarity: similarity::cosine_similarity(name, token),
            levenshtein_similarity: similarity::levenshtein_similarity(name, token),
        }
    }

    fn values(&self) -> [f64; 6] {
        [
            self.jaccard,
            flag(self.is_subsequence),
            self.seq_match,
            self.levenshtein as f64,
            self.cosine_similarity,
            self.levenshtein_similarity,
        ]
    }
}

/// All metrics of one candidate's core token.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateMetrics {
    pub core_token: String,
    pub official: PairMetrics,
    pub abbreviation: PairMetrics,
    pub hamming_distance: usize,
    pub ngram_overlap: f64,
}

impl CandidateMetrics {
    pub fn compute(names: &NameForms, core_token: String) -> Self {
        Self {
            official: PairMetrics::compute(&names.compact, &core_token),
            abbreviation: PairMetrics::compute(&names.abbreviation, &core_token),
            hamming_distance: similarity::hamming(&names.compact, &core_token),
            ngram_overlap: similarity::ngram_overlap(&names.compact, &core_token),
            core_token,
        }
    }
}

/// One fixed-width feature row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub entity_id: String,
    pub flags: [CandidateFlags; CANDIDATE_COUNT],
    pub official_name_length: usize,
    pub abbreviation_length: usize,
    pub metrics: [CandidateMetrics; CANDIDATE_COUNT],
}

impl FeatureVector {
    /// Column names, in the order of [`FeatureVector::values`].
    pub fn column_names() -> &'static [String] {
        &COLUMN_NAMES
    }

    /// Flattened numeric row; booleans become 0.0/1.0.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(FEATURE_WIDTH);
        for flags in &self.flags {
            values.push(flag(flags.has_official_word));
            values.push(flag(flags.has_abbreviation));
        }
        values.push(self.official_name_length as f64);
        values.push(self.abbreviation_length as f64);
        for metrics in &self.metrics {
            let official = metrics.official.values();
            let abbreviation = metrics.abbreviation.values();
            for (o, a) in official.iter().zip(abbreviation.iter()) {
                values.push(*o);
                values.push(*a);
            }
            values.push(metrics.hamming_distance as f64);
            values.push(metrics.ngram_overlap);
        }
        values
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Builds feature rows against a finished suffix vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'v> {
    vocabulary: &'v SuffixVocabulary,
}

impl<'v> FeatureAssembler<'v> {
    pub fn new(vocabulary: &'v SuffixVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn assemble(&self, record: &Record, domains: &RecordDomains) -> FeatureVector {
        let names = NameForms::new(record.official_name.as_deref(), record.abbreviation.as_deref());

        let flags = std::array::from_fn(|i| {
            CandidateFlags::compute(&names, record.candidates[i].as_deref())
        });

        let metrics = std::array::from_fn(|i| {
            let core_token = self.vocabulary.core_token(domains.candidates[i].host.as_deref());
            CandidateMetrics::compute(&names, core_token)
        });

        FeatureVector {
            entity_id: record.entity_id.clone(),
            flags,
            official_name_length: names.compact.chars().count(),
            abbreviation_length: names.abbreviation.chars().count(),
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> SuffixVocabulary {
        SuffixVocabulary::from_suffixes(["be", "com"]).unwrap()
    }

    fn assemble(record: &Record) -> FeatureVector {
        let vocab = vocabulary();
        let domains = RecordDomains::from_record(record);
        FeatureAssembler::new(&vocab).assemble(record, &domains)
    }

    fn column(features: &FeatureVector, name: &str) -> f64 {
        let idx = FeatureVector::column_names()
            .iter()
            .position(|c| c == name)
            .unwrap_or_else(|| panic!("no column {}", name));
        features.values()[idx]
    }

    #[test]
    fn test_column_names_match_width() {
        let names = FeatureVector::column_names();
        assert_eq!(names.len(), FEATURE_WIDTH);
        assert_eq!(FEATURE_WIDTH, 82);
        assert_eq!(names[0], "url1_has_official_word");
        assert_eq!(names[10], "official_name_length");
        assert_eq!(names[12], "url1_official_jaccard");
        assert_eq!(names[13], "url1_abbrev_jaccard");
        assert_eq!(names[24], "url1_hamming_distance");
        assert_eq!(names[25], "url1_ngram_overlap");
        assert_eq!(names[81], "url5_ngram_overlap");

        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_acme_scenario() {
        let record = Record::new("1")
            .with_name("Acme Solutions NV")
            .with_candidate(1, "http://www.acme-solutions.be");
        let features = assemble(&record);

        assert!(features.flags[0].has_official_word);
        assert!(!features.flags[0].has_abbreviation);
        assert_eq!(features.official_name_length, "acmesolutionsnv".len());
        assert_eq!(features.abbreviation_length, 3);
        assert_eq!(features.metrics[0].core_token, "acme-solutions");
        assert!(features.metrics[0].abbreviation.is_subsequence);
        assert_eq!(column(&features, "url1_abbrev_is_subsequence"), 1.0);
        assert_eq!(column(&features, "url1_has_official_word"), 1.0);
    }

    #[test]
    fn test_width_independent_of_present_candidates() {
        let empty = Record::new("1").with_name("Acme");
        let full = (1..=CANDIDATE_COUNT).fold(Record::new("2").with_name("Acme"), |r, slot| {
            r.with_candidate(slot, format!("https://acme{}.be", slot))
        });

        assert_eq!(assemble(&empty).values().len(), FEATURE_WIDTH);
        assert_eq!(assemble(&full).values().len(), FEATURE_WIDTH);
    }

    #[test]
    fn test_missing_candidate_defaults() {
        let record = Record::new("1").with_name("Acme Solutions");
        let features = assemble(&record);
        let slot = &features.metrics[2];

        assert_eq!(features.flags[2], CandidateFlags::default());
        assert_eq!(slot.core_token, "");
        assert_eq!(slot.official.jaccard, 0.0);
        assert!(!slot.official.is_subsequence);
        assert_eq!(slot.official.seq_match, 0.0);
        assert_eq!(slot.official.levenshtein, "acmesolutions".len());
        assert_eq!(slot.official.cosine_similarity, 0.0);
        assert_eq!(slot.hamming_distance, 0);
        assert_eq!(slot.ngram_overlap, 0.0);
    }

    #[test]
    fn test_unparseable_candidate_keeps_url_flags() {
        // The flag checks the raw URL even when no host can be extracted
        let record = Record::new("1")
            .with_name("Acme")
            .with_candidate(1, "acme profile page");
        let features = assemble(&record);

        assert!(features.flags[0].has_official_word);
        assert_eq!(features.metrics[0].core_token, "");
    }

    #[test]
    fn test_word_flag_uses_pre_compaction_words() {
        let record = Record::new("1")
            .with_name("Bakkerij De Smet")
            .with_candidate(1, "https://desmet.be");
        let features = assemble(&record);

        // "smet" is a word of the spaced name; the compact name is not in the URL
        assert!(features.flags[0].has_official_word);
        assert!(!features.flags[0].has_abbreviation);
    }

    #[test]
    fn test_abbreviation_flag_is_case_insensitive() {
        let record = Record::new("1")
            .with_name("Koninklijke Bank Cooperatie")
            .with_abbreviation("KBC")
            .with_candidate(1, "https://WWW.KBC.BE");
        let features = assemble(&record);

        assert!(features.flags[0].has_abbreviation);
        assert_eq!(features.metrics[0].core_token, "kbc");
        assert_eq!(features.metrics[0].abbreviation.jaccard, 1.0);
        assert_eq!(features.metrics[0].abbreviation.levenshtein, 0);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let record = Record::new("1")
            .with_name("Acme Solutions NV [BE]")
            .with_candidate(1, "https://acme-solutions.be")
            .with_candidate(3, "https://solutions-acme.com");
        let first = assemble(&record).values();
        let second = assemble(&record).values();
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
