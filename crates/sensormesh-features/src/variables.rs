//! Variable labels as observed versus as used in column names.
//!
//! Observations carry the full label (`NO2.ugm3`); feature columns use the
//! part before the separator (`NO2`). Both encoders render their schemas
//! through [`column_labels`] so one configuration yields one schema.

/// Part of a variable label before the first separator
pub fn normalize_variable(label: &str, separator: char) -> &str {
    label.split(separator).next().unwrap_or(label)
}

/// Column labels for the tracked variables, in the same order
pub fn column_labels(variables: &[String], separator: char) -> Vec<String> {
    variables.iter().map(|v| normalize_variable(v, separator).to_string()).collect()
}
