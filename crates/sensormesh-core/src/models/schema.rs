//! Column schema shared by the training and query encoders.
//!
//! Columns are structured keys; their string names are only ever rendered,
//! never parsed back. A schema is computed once from configuration and every
//! row an encoder emits is checked against its width.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SensormeshError};

/// Temporal resolution of the observation index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarGranularity {
    Hourly,
    #[default]
    Daily,
}

impl CalendarGranularity {
    /// Calendar columns appended to every feature row
    pub fn fields(&self) -> &'static [CalendarField] {
        match self {
            CalendarGranularity::Hourly => {
                &[CalendarField::DayOfWeek, CalendarField::DayOfMonth, CalendarField::HourOfDay]
            }
            CalendarGranularity::Daily => {
                &[CalendarField::DayOfWeek, CalendarField::DayOfMonth, CalendarField::IsoWeek]
            }
        }
    }

    /// Floor a timestamp to the start of its bucket
    pub fn floor(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        let date = timestamp.date();
        match self {
            CalendarGranularity::Hourly => {
                date.and_hms_opt(timestamp.hour(), 0, 0).unwrap_or(timestamp)
            }
            CalendarGranularity::Daily => date.and_hms_opt(0, 0, 0).unwrap_or(timestamp),
        }
    }
}

/// Calendar-derived column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarField {
    /// Monday = 0
    DayOfWeek,
    DayOfMonth,
    HourOfDay,
    IsoWeek,
}

impl CalendarField {
    pub fn label(&self) -> &'static str {
        match self {
            CalendarField::DayOfWeek => "dow",
            CalendarField::DayOfMonth => "day",
            CalendarField::HourOfDay => "hour",
            CalendarField::IsoWeek => "week",
        }
    }
}

/// Which half of a neighbour pair a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeighborRole {
    Value,
    Distance,
}

/// Structured column identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKey {
    /// Rank is 1-based: rank 1 is the nearest neighbour
    Neighbor { variable: String, role: NeighborRole, rank: usize },
    Calendar(CalendarField),
    Static(String),
}

impl ColumnKey {
    pub fn value(variable: impl Into<String>, rank: usize) -> Self {
        ColumnKey::Neighbor { variable: variable.into(), role: NeighborRole::Value, rank }
    }

    pub fn distance(variable: impl Into<String>, rank: usize) -> Self {
        ColumnKey::Neighbor { variable: variable.into(), role: NeighborRole::Distance, rank }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Neighbor { variable, role: NeighborRole::Value, rank } => {
                write!(f, "{}_{}", variable, rank)
            }
            ColumnKey::Neighbor { variable, role: NeighborRole::Distance, rank } => {
                write!(f, "d_{}_{}", variable, rank)
            }
            ColumnKey::Calendar(field) => f.write_str(field.label()),
            ColumnKey::Static(name) => f.write_str(name),
        }
    }
}

/// Fixed column layout of a feature table.
///
/// Layout: for each variable, `k` value columns then `k` distance columns,
/// ranks ascending; then the calendar columns of the granularity; then the
/// static columns in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    variables: Vec<String>,
    k: usize,
    granularity: CalendarGranularity,
    static_columns: Vec<String>,
    columns: Vec<ColumnKey>,
}

impl FeatureSchema {
    pub fn new(
        variables: &[String],
        k: usize,
        granularity: CalendarGranularity,
        static_columns: &[String],
    ) -> Self {
        let mut columns = Vec::with_capacity(variables.len() * 2 * k + 3 + static_columns.len());
        for variable in variables {
            columns.extend((1..=k).map(|rank| ColumnKey::value(variable.as_str(), rank)));
            columns.extend((1..=k).map(|rank| ColumnKey::distance(variable.as_str(), rank)));
        }
        columns.extend(granularity.fields().iter().copied().map(ColumnKey::Calendar));
        columns.extend(static_columns.iter().cloned().map(ColumnKey::Static));

        Self {
            variables: variables.to_vec(),
            k,
            granularity,
            static_columns: static_columns.to_vec(),
            columns,
        }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn granularity(&self) -> CalendarGranularity {
        self.granularity
    }

    pub fn static_columns(&self) -> &[String] {
        &self.static_columns
    }

    /// Rendered column names, in order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    pub fn position(&self, key: &ColumnKey) -> Option<usize> {
        self.columns.iter().position(|c| c == key)
    }

    /// Position of the first value column of the variable at `variable_index`
    pub fn neighbor_offset(&self, variable_index: usize) -> usize {
        variable_index * 2 * self.k
    }

    pub fn calendar_offset(&self) -> usize {
        self.variables.len() * 2 * self.k
    }

    pub fn static_offset(&self) -> usize {
        self.calendar_offset() + self.granularity.fields().len()
    }

    /// Serialize the schema so a stored table can be re-validated later
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SensormeshError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SensormeshError::Serialization(e.to_string()))
    }

    /// Fail on the first column where `self` and `other` differ.
    ///
    /// Neighbour value/distance pairing is positional, so reordering is a
    /// mismatch just like a missing column.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        let found: Vec<String> = other.names();
        self.ensure_names(&found)
    }

    /// Check a rendered header (e.g. read back from disk) against this schema
    pub fn ensure_names<S: AsRef<str>>(&self, found: &[S]) -> Result<()> {
        let expected = self.names();
        for position in 0..expected.len().max(found.len()) {
            let want = expected.get(position).map(String::as_str);
            let got = found.get(position).map(AsRef::as_ref);
            if want != got {
                return Err(SensormeshError::SchemaMismatch {
                    position,
                    expected: want.unwrap_or("<absent>").to_string(),
                    found: got.unwrap_or("<absent>").to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_layout_order() {
        let schema = FeatureSchema::new(
            &vars(&["NO2", "Temperature"]),
            2,
            CalendarGranularity::Daily,
            &vars(&["primary"]),
        );
        assert_eq!(
            schema.names(),
            vec![
                "NO2_1",
                "NO2_2",
                "d_NO2_1",
                "d_NO2_2",
                "Temperature_1",
                "Temperature_2",
                "d_Temperature_1",
                "d_Temperature_2",
                "dow",
                "day",
                "week",
                "primary",
            ]
        );
        assert_eq!(schema.neighbor_offset(1), 4);
        assert_eq!(schema.calendar_offset(), 8);
        assert_eq!(schema.static_offset(), 11);
    }

    #[test]
    fn test_hourly_calendar_fields() {
        let schema = FeatureSchema::new(&vars(&["X"]), 1, CalendarGranularity::Hourly, &[]);
        assert_eq!(schema.names(), vec!["X_1", "d_X_1", "dow", "day", "hour"]);
    }

    #[test]
    fn test_ensure_matches_reports_first_difference() {
        let a = FeatureSchema::new(&vars(&["X"]), 2, CalendarGranularity::Daily, &[]);
        let b = FeatureSchema::new(&vars(&["X"]), 3, CalendarGranularity::Daily, &[]);
        let err = a.ensure_matches(&b).unwrap_err();
        match err {
            SensormeshError::SchemaMismatch { position, expected, found } => {
                assert_eq!(position, 2);
                assert_eq!(expected, "d_X_1");
                assert_eq!(found, "X_3");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(a.ensure_matches(&a.clone()).is_ok());
    }

    #[test]
    fn test_ensure_names_detects_truncation() {
        let schema = FeatureSchema::new(&vars(&["X"]), 1, CalendarGranularity::Daily, &[]);
        let err = schema.ensure_names(&["X_1", "d_X_1", "dow", "day"]).unwrap_err();
        assert!(matches!(
            err,
            SensormeshError::SchemaMismatch { position: 4, ref found, .. } if found == "<absent>"
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_names() {
        let schema =
            FeatureSchema::new(&vars(&["NO2"]), 2, CalendarGranularity::Hourly, &vars(&["imd"]));
        let restored = FeatureSchema::from_json(&schema.to_json().unwrap()).unwrap();
        assert_eq!(restored, schema);
        assert!(matches!(
            FeatureSchema::from_json("{\"k\": 2}"),
            Err(SensormeshError::Serialization(_))
        ));
    }

    #[test]
    fn test_floor() {
        let ts = NaiveDate::from_ymd_opt(2018, 3, 7).unwrap().and_hms_opt(13, 45, 10).unwrap();
        let hourly = CalendarGranularity::Hourly.floor(ts);
        let daily = CalendarGranularity::Daily.floor(ts);
        assert_eq!(hourly, NaiveDate::from_ymd_opt(2018, 3, 7).unwrap().and_hms_opt(13, 0, 0).unwrap());
        assert_eq!(daily, NaiveDate::from_ymd_opt(2018, 3, 7).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }
}
