//! Boundary checks for the coordinates that enter the engine.
//!
//! Distances are only meaningful on finite, projected coordinates, so every
//! point and line is checked once when a registry, layer, or mesh is built.

use crate::error::{Result, SensormeshError};
use geo::{LineString, Point};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    /// Convert into an `InvalidGeometry` error for the given feature
    pub fn into_result(self, feature_id: impl Into<String>) -> Result<()> {
        if self.is_valid {
            return Ok(());
        }
        let reason = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Err(SensormeshError::InvalidGeometry { feature_id: feature_id.into(), reason })
    }
}

pub fn validate_point(point: &Point<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if !point.x().is_finite() || !point.y().is_finite() {
        result.add_error(
            format!("Point({}, {})", point.x(), point.y()),
            "Coordinates must be finite".to_string(),
        );
    }
    result
}

pub fn validate_line_string(line: &LineString<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    // A line needs at least one segment
    if line.0.len() < 2 {
        result.add_error(
            "LineString".to_string(),
            format!("LineString must have at least 2 points, found {}", line.0.len()),
        );
        return result;
    }

    for (i, coord) in line.0.iter().enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            result.add_error(format!("LineString[{}]", i), "Coordinates must be finite".to_string());
        }
    }

    result
}
