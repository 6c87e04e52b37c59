//! Feature and label pipeline over a batch of records.
//!
//! 1. canonicalize every record's URLs
//! 2. derive match labels, concurrently with building the suffix vocabulary
//! 3. assemble feature rows against the finished vocabulary
//! 4. fit (or reuse) the label encoder and encode the label matrix
//!
//! Step 3 cannot start before the vocabulary covers every candidate host of the
//! batch. Outputs keep the input record order.

use crate::batch::RunSummary;
use crate::features::{FeatureAssembler, FeatureVector};
use crate::labels::{derive_match_label, LabelEncoder, MatchLabel};
use crate::record::{Record, RecordDomains};
use crate::suffix_vocab::{SuffixVocabulary, VocabularyError, DEFAULT_SUFFIX_REGEX};
use rayon::prelude::*;
use regex::Regex;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot build suffix vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("No records to process")]
    NoRecords,
}

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Process records on a rayon pool
    pub parallel: bool,
    /// Worker threads (0 = rayon default)
    pub threads: usize,
    /// Suffix extraction pattern for the vocabulary
    pub suffix_pattern: Regex,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: 0,
            suffix_pattern: DEFAULT_SUFFIX_REGEX.clone(),
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<MatchLabel>,
    pub encoder: LabelEncoder,
    /// Binary label matrix in encoder column order
    pub label_matrix: Vec<Vec<u8>>,
    pub vocabulary: SuffixVocabulary,
    pub summary: RunSummary,
}

pub struct Pipeline {
    options: PipelineOptions,
    encoder: Option<LabelEncoder>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            encoder: None,
        }
    }

    /// Reuse a persisted label mapping instead of fitting a new one.
    pub fn with_encoder(mut self, encoder: LabelEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn run(&self, records: &[Record]) -> Result<PipelineOutput, PipelineError> {
        self.run_with_progress(records, |_| {})
    }

    /// Run the pipeline, calling `progress` once per assembled feature row.
    pub fn run_with_progress<F>(&self, records: &[Record], progress: F) -> Result<PipelineOutput, PipelineError>
    where
        F: Fn(u64) + Sync,
    {
        if records.is_empty() {
            return Err(PipelineError::NoRecords);
        }

        if self.options.parallel && self.options.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.threads)
                .build()?;
            pool.install(|| self.execute(records, &progress))
        } else {
            self.execute(records, &progress)
        }
    }

    fn execute<F>(&self, records: &[Record], progress: &F) -> Result<PipelineOutput, PipelineError>
    where
        F: Fn(u64) + Sync,
    {
        let started = Instant::now();
        let mut summary = RunSummary::start();
        let parallel = self.options.parallel;
        info!("Processing {} records (parallel: {})", records.len(), parallel);

        let domains: Vec<RecordDomains> = if parallel {
            records.par_iter().map(RecordDomains::from_record).collect()
        } else {
            records.iter().map(RecordDomains::from_record).collect()
        };

        let hosts = || domains.iter().flat_map(|d| d.candidate_hosts());
        let (labels, vocabulary) = if parallel {
            rayon::join(
                || domains.par_iter().map(derive_match_label).collect::<Vec<_>>(),
                || SuffixVocabulary::build_with_pattern(hosts(), &self.options.suffix_pattern),
            )
        } else {
            (
                domains.iter().map(derive_match_label).collect::<Vec<_>>(),
                SuffixVocabulary::build_with_pattern(hosts(), &self.options.suffix_pattern),
            )
        };
        let vocabulary = vocabulary?;
        debug!("Suffix vocabulary: {:?}", vocabulary.iter().collect::<Vec<_>>());

        let assembler = FeatureAssembler::new(&vocabulary);
        let assemble = |(record, record_domains): (&Record, &RecordDomains)| {
            let row = assembler.assemble(record, record_domains);
            progress(1);
            row
        };
        let features: Vec<FeatureVector> = if parallel {
            records.par_iter().zip(domains.par_iter()).map(assemble).collect()
        } else {
            records.iter().zip(domains.iter()).map(assemble).collect()
        };

        let encoder = match &self.encoder {
            Some(encoder) => encoder.clone(),
            None => LabelEncoder::fit(&labels),
        };
        let label_matrix: Vec<Vec<u8>> = labels.iter().map(|l| encoder.encode(l)).collect();

        summary.total_records = records.len();
        summary.unmatched_records = labels.iter().filter(|l| l.is_no_match()).count();
        summary.matched_records = summary.total_records - summary.unmatched_records;
        summary.multi_match_records = labels.iter().filter(|l| l.len() > 1).count();
        summary.missing_candidates = domains
            .iter()
            .map(|d| d.candidates.iter().filter(|c| c.is_missing()).count())
            .sum();
        summary.vocabulary_size = vocabulary.len();
        summary.label_classes = encoder.classes().to_vec();
        summary.finish(started.elapsed().as_secs_f64());

        info!(
            "Processed {} records: {} matched, {} without match, {} with multiple matches",
            summary.total_records, summary.matched_records, summary.unmatched_records, summary.multi_match_records
        );

        Ok(PipelineOutput {
            features,
            labels,
            encoder,
            label_matrix,
            vocabulary,
            summary,
        })
    }
}
