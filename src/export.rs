use crate::batch::RunSummary;
use crate::features::{FeatureVector, FEATURE_WIDTH};
use crate::labels::LabelEncoder;
use crate::prediction::DecodedPrediction;
use anyhow::{ensure, Context, Result};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Column header prefix of the binary label columns.
pub const LABEL_COLUMN_PREFIX: &str = "label_";

pub fn export_features_csv(features: &[FeatureVector], entity_column: &str, output_path: &Path) -> Result<()> {
    debug!("Exporting {} feature rows to CSV: {}", features.len(), output_path.display());

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create features file: {}", output_path.display()))?;
    let mut wtr = Writer::from_writer(file);

    let mut header = Vec::with_capacity(FEATURE_WIDTH + 1);
    header.push(entity_column);
    header.extend(FeatureVector::column_names().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for row in features {
        let mut record = Vec::with_capacity(FEATURE_WIDTH + 1);
        record.push(row.entity_id.clone());
        record.extend(row.values().iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    info!("Successfully exported {} feature rows to CSV: {}", features.len(), output_path.display());

    Ok(())
}

pub fn export_features_json(features: &[FeatureVector], summary: &RunSummary, output_path: &Path) -> Result<()> {
    debug!("Exporting {} feature rows to JSON: {}", features.len(), output_path.display());

    let json_output = JsonExport {
        summary,
        columns: FeatureVector::column_names(),
        rows: features
            .iter()
            .map(|f| JsonRow {
                entity_id: &f.entity_id,
                values: f.values(),
            })
            .collect(),
    };

    let json_string = serde_json::to_string_pretty(&json_output)?;
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create features file: {}", output_path.display()))?;
    file.write_all(json_string.as_bytes())?;

    info!("Successfully exported {} feature rows to JSON: {}", features.len(), output_path.display());

    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    summary: &'a RunSummary,
    columns: &'a [String],
    rows: Vec<JsonRow<'a>>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    entity_id: &'a str,
    values: Vec<f64>,
}

/// Binary label matrix, one `label_<value>` column per encoder class.
pub fn export_labels_csv(
    entity_ids: &[&str],
    label_matrix: &[Vec<u8>],
    encoder: &LabelEncoder,
    entity_column: &str,
    output_path: &Path,
) -> Result<()> {
    ensure!(
        entity_ids.len() == label_matrix.len(),
        "{} entity ids for {} label rows",
        entity_ids.len(),
        label_matrix.len()
    );

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create labels file: {}", output_path.display()))?;
    let mut wtr = Writer::from_writer(file);

    let mut header = vec![entity_column.to_string()];
    header.extend(encoder.classes().iter().map(|c| format!("{}{}", LABEL_COLUMN_PREFIX, c)));
    wtr.write_record(&header)?;

    for (entity_id, row) in entity_ids.iter().zip(label_matrix) {
        let mut record = vec![entity_id.to_string()];
        record.extend(row.iter().map(|bit| bit.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    info!("Successfully exported {} label rows to CSV: {}", label_matrix.len(), output_path.display());

    Ok(())
}

pub fn export_predictions_csv(predictions: &[DecodedPrediction], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create predictions file: {}", output_path.display()))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(["Entity Number", "Predicted URL", "Predicted URL Domain"])?;
    for prediction in predictions {
        wtr.write_record([
            prediction.entity_id.as_str(),
            prediction.predicted_url().as_str(),
            prediction.predicted_domain().as_str(),
        ])?;
    }

    wtr.flush()?;
    info!("Successfully exported {} decoded predictions to CSV: {}", predictions.len(), output_path.display());

    Ok(())
}
