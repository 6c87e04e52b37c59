use crate::domain_utils::CanonicalDomain;
use serde::Serialize;

/// Number of candidate URL slots per record. Slots are 1-indexed in labels and column names.
pub const CANDIDATE_COUNT: usize = 5;

/// One company to match: its name, the known website and the search-step candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub entity_id: String,
    pub official_name: Option<String>,
    pub abbreviation: Option<String>,
    /// Ground-truth website
    pub url: Option<String>,
    pub candidates: [Option<String>; CANDIDATE_COUNT],
}

impl Record {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, official_name: impl Into<String>) -> Self {
        self.official_name = Some(official_name.into());
        self
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set candidate `slot` (1-based). Out-of-range slots are ignored.
    pub fn with_candidate(mut self, slot: usize, url: impl Into<String>) -> Self {
        if (1..=CANDIDATE_COUNT).contains(&slot) {
            self.candidates[slot - 1] = Some(url.into());
        }
        self
    }

    /// Candidate URL for `slot` (1-based).
    pub fn candidate(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.candidates.get(i))
            .and_then(|c| c.as_deref())
    }

    pub fn present_candidates(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_some()).count()
    }
}

/// Canonicalized domains of a record's ground truth and candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordDomains {
    pub ground_truth: CanonicalDomain,
    pub candidates: [CanonicalDomain; CANDIDATE_COUNT],
}

impl RecordDomains {
    pub fn from_record(record: &Record) -> Self {
        Self {
            ground_truth: CanonicalDomain::from_url(record.url.as_deref()),
            candidates: std::array::from_fn(|i| {
                CanonicalDomain::from_url(record.candidates[i].as_deref())
            }),
        }
    }

    /// Canonical hosts of all candidates that have one.
    pub fn candidate_hosts(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().filter_map(|c| c.host.as_deref())
    }
}
