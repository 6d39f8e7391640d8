//! Pairing of stored features with one variable's targets.
//!
//! The feature rows selected by the targets' keys are kept whole; it is the
//! columns that are dropped. A column with a missing cell in any selected
//! row is removed for the entire training set.

use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::{ColumnKey, FeatureTable, ObservationTable, TrainingKey};

/// Design matrix and target vector for one variable
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub variable: String,
    /// Row keys, in target order
    pub keys: Vec<TrainingKey>,
    /// Retained columns, in schema order
    pub columns: Vec<ColumnKey>,
    /// Columns removed because some selected row lacked them
    pub dropped: Vec<ColumnKey>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl TrainingSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Select the feature rows of `variable`'s targets and drop incomplete columns
pub fn align(
    features: &FeatureTable<TrainingKey>,
    targets: &ObservationTable,
    variable: &str,
) -> Result<TrainingSet> {
    let mut keys = Vec::new();
    let mut rows = Vec::new();
    let mut y = Vec::new();

    for (key, value) in targets.for_variable(variable) {
        let training_key = TrainingKey { sensor: key.sensor.clone(), timestamp: key.timestamp };
        let row = features.get(&training_key).ok_or_else(|| SensormeshError::MissingFeatureRow {
            sensor: key.sensor.to_string(),
            timestamp: key.timestamp,
        })?;
        keys.push(training_key);
        rows.push(&row.cells);
        y.push(value);
    }

    let schema = features.schema();
    let (retained, dropped): (Vec<usize>, Vec<usize>) =
        (0..schema.len()).partition(|&column| rows.iter().all(|cells| cells[column].is_some()));

    let x: Vec<Vec<f64>> = rows
        .iter()
        .map(|cells| retained.iter().filter_map(|&column| cells[column]).collect())
        .collect();

    let columns: Vec<ColumnKey> = retained.iter().map(|&i| schema.columns()[i].clone()).collect();
    let dropped: Vec<ColumnKey> = dropped.iter().map(|&i| schema.columns()[i].clone()).collect();

    tracing::info!(
        variable,
        rows = y.len(),
        columns = columns.len(),
        dropped_columns = dropped.len(),
        "Aligned features with targets"
    );

    Ok(TrainingSet { variable: variable.to_string(), keys, columns, dropped, x, y })
}
