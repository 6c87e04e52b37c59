//! Batch input loading and run summaries
//!
//! Supports:
//! - a query table with entity id, official name, abbreviation and known URL
//! - one or more search-result tables with the candidate URL columns, left-joined
//!   onto the query table by entity id
//! - a single combined table carrying both
//! - empty cells and `NaN` placeholders as missing values

use crate::config::InputConfig;
use crate::record::{Record, CANDIDATE_COUNT};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Candidate URLs of one entity from a search-result table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub entity_id: String,
    pub candidates: [Option<String>; CANDIDATE_COUNT],
}

/// Load records from a query file, joining candidates from the search files.
///
/// With no search files, candidates are read from the query file itself.
pub fn load_records(query_path: &Path, search_paths: &[&Path], config: &InputConfig) -> Result<Vec<Record>> {
    let content = fs::read_to_string(query_path)
        .with_context(|| format!("Failed to read query file: {}", query_path.display()))?;
    let mut records = parse_query_csv(&content, config)
        .with_context(|| format!("Failed to parse query file: {}", query_path.display()))?;

    if search_paths.is_empty() {
        info!("Loaded {} records from {}", records.len(), query_path.display());
        return Ok(records);
    }

    let mut search_rows = Vec::new();
    for path in search_paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read search results file: {}", path.display()))?;
        let rows = parse_search_csv(&content, config)
            .with_context(|| format!("Failed to parse search results file: {}", path.display()))?;
        debug!("Loaded {} search rows from {}", rows.len(), path.display());
        search_rows.extend(rows);
    }

    merge_search_results(&mut records, search_rows);
    info!(
        "Loaded {} records from {} with {} search result file(s)",
        records.len(),
        query_path.display(),
        search_paths.len()
    );
    Ok(records)
}

/// Parse the query table. Candidate columns are read when present.
pub fn parse_query_csv(content: &str, config: &InputConfig) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()
        .context("Failed to read CSV headers")?
        .clone();

    let entity_idx = required_column(&headers, &config.entity_column)?;
    let name_idx = required_column(&headers, &config.name_column)?;
    let abbreviation_idx = column_index(&headers, &config.abbreviation_column);
    let url_idx = column_index(&headers, &config.url_column);
    let candidate_idx = candidate_columns(&headers, config);

    if url_idx.is_none() {
        warn!("Query table has no '{}' column; every record will be labelled as no match", config.url_column);
    }

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to parse CSV record {}", line + 1))?;

        let Some(entity_id) = cell(&row, Some(entity_idx)) else {
            warn!("Skipping query row {} without an entity id", line + 1);
            continue;
        };

        records.push(Record {
            entity_id,
            official_name: cell(&row, Some(name_idx)),
            abbreviation: cell(&row, abbreviation_idx),
            url: cell(&row, url_idx),
            candidates: std::array::from_fn(|i| cell(&row, candidate_idx[i])),
        });
    }

    Ok(records)
}

/// Parse a search-result table: entity id plus the candidate columns.
pub fn parse_search_csv(content: &str, config: &InputConfig) -> Result<Vec<SearchRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()
        .context("Failed to read CSV headers")?
        .clone();

    let entity_idx = required_column(&headers, &config.entity_column)?;
    let candidate_idx = candidate_columns(&headers, config);
    if candidate_idx.iter().all(Option::is_none) {
        bail!(
            "Search results must have at least one candidate column ({}1..{}{})",
            config.candidate_prefix,
            config.candidate_prefix,
            CANDIDATE_COUNT
        );
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to parse CSV record {}", line + 1))?;
        let Some(entity_id) = cell(&row, Some(entity_idx)) else {
            continue;
        };
        rows.push(SearchRow {
            entity_id,
            candidates: std::array::from_fn(|i| cell(&row, candidate_idx[i])),
        });
    }

    Ok(rows)
}

/// Left join: every record keeps its place, records without search rows get no candidates.
/// When an entity has several search rows the first one wins.
pub fn merge_search_results(records: &mut [Record], search_rows: Vec<SearchRow>) {
    let mut by_entity: HashMap<String, [Option<String>; CANDIDATE_COUNT]> = HashMap::new();
    for row in search_rows {
        if by_entity.contains_key(&row.entity_id) {
            warn!("Duplicate search results for entity {}; keeping the first", row.entity_id);
            continue;
        }
        by_entity.insert(row.entity_id, row.candidates);
    }

    let mut unmatched = 0usize;
    for record in records.iter_mut() {
        match by_entity.get(&record.entity_id) {
            Some(candidates) => record.candidates = candidates.clone(),
            None => {
                record.candidates = Default::default();
                unmatched += 1;
            }
        }
    }

    if unmatched > 0 {
        warn!("{} records have no search results; their candidates are empty", unmatched);
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    column_index(headers, name)
        .with_context(|| format!("CSV must have a '{}' column", name))
}

fn candidate_columns(headers: &csv::StringRecord, config: &InputConfig) -> [Option<usize>; CANDIDATE_COUNT] {
    std::array::from_fn(|i| column_index(headers, &config.candidate_column(i + 1)))
}

/// Trimmed cell value; empty cells and NaN placeholders are missing
fn cell(row: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = row.get(idx?)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Summary of one feature/label run
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunSummary {
    /// Total number of records processed
    pub total_records: usize,
    /// Records where at least one candidate matches the known website
    pub matched_records: usize,
    /// Records labelled as no match
    pub unmatched_records: usize,
    /// Records with more than one matching candidate
    pub multi_match_records: usize,
    /// Candidate slots without a usable URL
    pub missing_candidates: usize,
    /// Distinct suffixes in the vocabulary
    pub vocabulary_size: usize,
    /// Label columns in encoder order
    pub label_classes: Vec<i32>,
    /// Total run duration in seconds
    pub duration_secs: f64,
    /// Timestamp when the run started
    pub started_at: String,
    /// Timestamp when the run completed
    pub completed_at: String,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    pub fn finish(&mut self, duration_secs: f64) {
        self.duration_secs = duration_secs;
        self.completed_at = Utc::now().to_rfc3339();
    }

    /// Export summary to a JSON file
    pub fn export(&self, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize run summary")?;

        fs::write(output_path, json)
            .with_context(|| format!("Failed to write run summary to: {}", output_path.display()))?;

        Ok(())
    }
}
