//! Entity-to-URL matching features and multi-label targets.
//!
//! Given company records with an official name, an optional abbreviation, a
//! known website and up to five candidate URLs from a search step, builds one
//! fixed-width feature row per record plus the set of candidate slots whose
//! domain matches the known website.

pub mod batch;
pub mod cli;
pub mod config;
pub mod domain_utils;
pub mod export;
pub mod features;
pub mod labels;
pub mod logger;
pub mod org_normalizer;
pub mod pipeline;
pub mod prediction;
pub mod record;
pub mod similarity;
pub mod suffix_vocab;

pub use features::{FeatureAssembler, FeatureVector, FEATURE_WIDTH};
pub use labels::{derive_match_label, LabelEncoder, MatchLabel, NO_MATCH};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineOutput};
pub use record::{Record, RecordDomains, CANDIDATE_COUNT};
pub use suffix_vocab::SuffixVocabulary;
