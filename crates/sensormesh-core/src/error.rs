//! Error types for Sensormesh

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensormeshError {
    // Geometry errors
    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    // Registry errors
    #[error("Sensor {sensor} is registered more than once")]
    DuplicateSensor { sensor: String },

    #[error("Observation refers to unknown sensor {sensor}")]
    UnknownSensor { sensor: String },

    // Observation errors
    #[error("Duplicate observation for ({variable}, {sensor}, {timestamp})")]
    DuplicateObservation {
        variable: String,
        sensor: String,
        timestamp: NaiveDateTime,
    },

    #[error("Non-finite value for ({variable}, {sensor}, {timestamp})")]
    NonFiniteValue {
        variable: String,
        sensor: String,
        timestamp: NaiveDateTime,
    },

    // Schema errors
    #[error("Schema mismatch at column {position}: expected '{expected}', found '{found}'")]
    SchemaMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Row {row} has {found} cells, schema defines {expected} columns")]
    RowWidthMismatch {
        row: String,
        expected: usize,
        found: usize,
    },

    #[error("Row key {key} appears more than once")]
    DuplicateRow { key: String },

    #[error("No feature row for sensor {sensor} at {timestamp}")]
    MissingFeatureRow {
        sensor: String,
        timestamp: NaiveDateTime,
    },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Persistence errors
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SensormeshError>;
