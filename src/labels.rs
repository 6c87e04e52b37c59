//! Ground-truth match labels and their multi-label binary encoding.
//!
//! A record's label is the set of 1-based candidate slots whose registrable
//! domain equals the ground-truth registrable domain, or `{-1}` when none do.
//! The encoder assigns columns in the order label values are first seen, and
//! must be persisted so predictions can later be decoded with the same mapping.

use crate::record::{RecordDomains, CANDIDATE_COUNT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Label value for "no candidate matches".
pub const NO_MATCH: i32 = -1;

#[derive(Error, Debug, PartialEq)]
pub enum LabelError {
    #[error("Label value {0} is not a candidate slot (1-5) or -1")]
    InvalidClass(i32),

    #[error("Label value {0} appears more than once in the label map")]
    DuplicateClass(i32),

    #[error("Label map is empty")]
    EmptyClasses,

    #[error("Row has {found} columns but the label map has {expected}")]
    WidthMismatch { expected: usize, found: usize },
}

fn is_valid_class(value: i32) -> bool {
    value == NO_MATCH || (1..=CANDIDATE_COUNT as i32).contains(&value)
}

/// Non-empty set of matching candidate slots, or exactly `{-1}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchLabel(BTreeSet<i32>);

impl MatchLabel {
    /// Label from matching slots; an empty iterator yields the no-match label.
    pub fn from_matches<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let set: BTreeSet<i32> = slots.into_iter().map(|s| s as i32).collect();
        if set.is_empty() {
            Self::no_match()
        } else {
            Self(set)
        }
    }

    pub fn no_match() -> Self {
        Self(BTreeSet::from([NO_MATCH]))
    }

    pub fn is_no_match(&self) -> bool {
        self.0.contains(&NO_MATCH)
    }

    pub fn contains(&self, value: i32) -> bool {
        self.0.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label values in ascending order.
    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }
}

/// Compare every candidate's registrable domain to the ground truth's.
pub fn derive_match_label(domains: &RecordDomains) -> MatchLabel {
    let Some(truth) = domains.ground_truth.registrable.as_deref() else {
        return MatchLabel::no_match();
    };

    MatchLabel::from_matches(
        domains
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.registrable.as_deref() == Some(truth))
            .map(|(i, _)| i + 1),
    )
}

/// Stable label-value to column mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<i32>,
}

impl LabelEncoder {
    /// Assign columns in first-seen order while scanning `labels`.
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchLabel>,
    {
        let mut classes = Vec::new();
        for label in labels {
            for value in label.values() {
                if !classes.contains(&value) {
                    classes.push(value);
                }
            }
        }
        debug!("Label encoder classes (first-seen order): {:?}", classes);
        Self { classes }
    }

    /// Rebuild an encoder from a persisted column order.
    pub fn from_classes(classes: Vec<i32>) -> Result<Self, LabelError> {
        if classes.is_empty() {
            return Err(LabelError::EmptyClasses);
        }
        let mut seen = BTreeSet::new();
        for &value in &classes {
            if !is_valid_class(value) {
                return Err(LabelError::InvalidClass(value));
            }
            if !seen.insert(value) {
                return Err(LabelError::DuplicateClass(value));
            }
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    pub fn width(&self) -> usize {
        self.classes.len()
    }

    /// Binary row with a 1 in every column whose label is in `label`.
    /// Values the encoder has never seen are dropped with a warning.
    pub fn encode(&self, label: &MatchLabel) -> Vec<u8> {
        for value in label.values() {
            if !self.classes.contains(&value) {
                warn!("Label value {} has no column in the label map; dropping it", value);
            }
        }
        self.classes
            .iter()
            .map(|class| u8::from(label.contains(*class)))
            .collect()
    }

    /// Label values whose column is set in `row`, in column order.
    pub fn decode(&self, row: &[u8]) -> Result<Vec<i32>, LabelError> {
        if row.len() != self.classes.len() {
            return Err(LabelError::WidthMismatch {
                expected: self.classes.len(),
                found: row.len(),
            });
        }
        Ok(self
            .classes
            .iter()
            .zip(row)
            .filter(|(_, &bit)| bit != 0)
            .map(|(&class, _)| class)
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write label map: {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read label map: {}", path.display()))?;
        let raw: LabelEncoder = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse label map: {}", path.display()))?;
        Ok(Self::from_classes(raw.classes)?)
    }
}
