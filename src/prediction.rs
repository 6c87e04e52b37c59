//! Decoding classifier predictions back into candidate URLs.
//!
//! A prediction file holds one binary row per record, with one `label_<value>`
//! column per label-map class and optionally the entity id column. Labelled
//! columns are matched to the label map by class, in any file order. Rows are
//! joined to records by entity id when present, otherwise by position.

use crate::domain_utils::canonical_host;
use crate::export::LABEL_COLUMN_PREFIX;
use crate::labels::{LabelEncoder, LabelError, NO_MATCH};
use crate::record::Record;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Predicted value for a record labelled as having no correct candidate.
pub const NO_CORRECT_CANDIDATE: &str = "No scraped URL has been found correct";

/// Predicted value for a row with no positive column.
pub const NO_VALID_PREDICTION: &str = "No valid prediction";

/// Separator between several predicted URLs of one record.
pub const URL_SEPARATOR: &str = "; ";

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Failed to read predictions CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Predictions file has no label columns")]
    NoLabelColumns,

    #[error("Column '{0}' does not name an integer label class")]
    InvalidLabelColumn(String),

    #[error("Column '{0}' names a class that is not in the label map")]
    UnknownClass(String),

    #[error("Label class {0} has more than one column")]
    DuplicateClass(i32),

    #[error("Predictions file has no column for label class {0}")]
    MissingClass(i32),

    #[error("Invalid prediction value '{value}' in row {row}, column '{column}'")]
    InvalidValue { row: usize, column: String, value: String },

    #[error("Prediction row {row} does not fit the label map")]
    Label { row: usize, source: LabelError },

    #[error("{rows} prediction rows for {records} records")]
    RowCountMismatch { records: usize, rows: usize },

    #[error("Prediction row {row} refers to unknown entity '{entity_id}'")]
    UnknownEntity { row: usize, entity_id: String },
}

/// One binary prediction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRow {
    pub entity_id: Option<String>,
    pub bits: Vec<u8>,
}

/// Decoded prediction of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPrediction {
    pub entity_id: String,
    /// Predicted candidate URLs or one of the no-prediction messages
    pub predicted_urls: Vec<String>,
    /// Canonical host of each predicted URL; messages are carried through unchanged
    pub predicted_domains: Vec<String>,
}

impl DecodedPrediction {
    pub fn predicted_url(&self) -> String {
        self.predicted_urls.join(URL_SEPARATOR)
    }

    pub fn predicted_domain(&self) -> String {
        self.predicted_domains.join(URL_SEPARATOR)
    }
}

pub fn load_predictions(path: &Path, entity_column: &str, encoder: &LabelEncoder) -> Result<Vec<PredictionRow>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read predictions file: {}", path.display()))?;
    let rows = parse_predictions_csv(&content, entity_column, encoder)
        .with_context(|| format!("Failed to parse predictions file: {}", path.display()))?;
    debug!("Loaded {} prediction rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse a prediction table.
///
/// Label columns are those named `label_<class>`; their bits come out in the
/// encoder's column order whatever the file order, and every encoder class
/// needs exactly one column. When there are no such headers, every column
/// except the entity column is a label column, taken positionally. Cells must
/// be 0/1 (`0.0`, `1.0`, `true` and `false` are accepted too).
pub fn parse_predictions_csv(
    content: &str,
    entity_column: &str,
    encoder: &LabelEncoder,
) -> Result<Vec<PredictionRow>, PredictionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let entity_idx = headers.iter().position(|h| h.trim().eq_ignore_ascii_case(entity_column));
    let labelled: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.trim().starts_with(LABEL_COLUMN_PREFIX))
        .collect();
    let label_idx: Vec<usize> = if labelled.is_empty() {
        (0..headers.len()).filter(|&i| Some(i) != entity_idx).collect()
    } else {
        align_label_columns(&labelled, encoder)?
    };
    if label_idx.is_empty() {
        return Err(PredictionError::NoLabelColumns);
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let bits = label_idx
            .iter()
            .map(|&i| {
                let value = record.get(i).unwrap_or("").trim();
                parse_bit(value).ok_or_else(|| PredictionError::InvalidValue {
                    row: line + 1,
                    column: headers.get(i).unwrap_or("").to_string(),
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        let entity_id = entity_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        rows.push(PredictionRow { entity_id, bits });
    }

    Ok(rows)
}

/// Header indices of the `label_<class>` columns, in encoder column order.
fn align_label_columns(labelled: &[(usize, &str)], encoder: &LabelEncoder) -> Result<Vec<usize>, PredictionError> {
    let mut by_class: HashMap<i32, usize> = HashMap::new();
    for &(idx, header) in labelled {
        let header = header.trim();
        let class: i32 = header[LABEL_COLUMN_PREFIX.len()..]
            .trim()
            .parse()
            .map_err(|_| PredictionError::InvalidLabelColumn(header.to_string()))?;
        if !encoder.classes().contains(&class) {
            return Err(PredictionError::UnknownClass(header.to_string()));
        }
        if by_class.insert(class, idx).is_some() {
            return Err(PredictionError::DuplicateClass(class));
        }
    }

    encoder
        .classes()
        .iter()
        .map(|class| by_class.get(class).copied().ok_or(PredictionError::MissingClass(*class)))
        .collect()
}

fn parse_bit(value: &str) -> Option<u8> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(1),
        "0" | "0.0" | "false" => Some(0),
        _ => None,
    }
}

/// Map each prediction row back to the candidate URLs of its record.
///
/// Output follows the order of `rows`.
pub fn decode_predictions(
    records: &[Record],
    rows: &[PredictionRow],
    encoder: &LabelEncoder,
) -> Result<Vec<DecodedPrediction>, PredictionError> {
    let keyed = rows.iter().all(|r| r.entity_id.is_some());
    if !keyed && rows.len() != records.len() {
        return Err(PredictionError::RowCountMismatch {
            records: records.len(),
            rows: rows.len(),
        });
    }

    let mut by_entity: HashMap<&str, &Record> = HashMap::new();
    if keyed {
        for record in records {
            by_entity.entry(record.entity_id.as_str()).or_insert(record);
        }
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| -> Result<DecodedPrediction, PredictionError> {
            let record = match row.entity_id.as_deref() {
                Some(id) if keyed => *by_entity.get(id).ok_or_else(|| PredictionError::UnknownEntity {
                    row: i + 1,
                    entity_id: id.to_string(),
                })?,
                _ => &records[i],
            };
            let values = encoder
                .decode(&row.bits)
                .map_err(|source| PredictionError::Label { row: i + 1, source })?;
            Ok(decode_record(record, &values))
        })
        .collect()
}

fn decode_record(record: &Record, values: &[i32]) -> DecodedPrediction {
    let mut predicted_urls = Vec::new();
    let mut predicted_domains = Vec::new();

    for &value in values {
        if value == NO_MATCH {
            predicted_urls.push(NO_CORRECT_CANDIDATE.to_string());
            predicted_domains.push(NO_CORRECT_CANDIDATE.to_string());
            continue;
        }
        match record.candidate(value as usize) {
            Some(url) => {
                predicted_urls.push(url.to_string());
                predicted_domains.push(canonical_host(url).unwrap_or_default());
            }
            None => warn!(
                "Entity {}: candidate {} predicted but the record has no URL there",
                record.entity_id, value
            ),
        }
    }

    if predicted_urls.is_empty() {
        predicted_urls.push(NO_VALID_PREDICTION.to_string());
        predicted_domains.push(NO_VALID_PREDICTION.to_string());
    }

    DecodedPrediction {
        entity_id: record.entity_id.clone(),
        predicted_urls,
        predicted_domains,
    }
}
