use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::schema::CalendarGranularity;
use super::sensor::SensorId;
use crate::error::{Result, SensormeshError};
use crate::stats::median;

/// Unique key of one observation.
///
/// Field order defines the table's iteration order: variable, then sensor,
/// then timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationKey {
    pub variable: String,
    pub sensor: SensorId,
    pub timestamp: NaiveDateTime,
}

/// One measured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub variable: String,
    pub sensor: SensorId,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Observation {
    pub fn new(
        variable: impl Into<String>,
        sensor: impl Into<SensorId>,
        timestamp: NaiveDateTime,
        value: f64,
    ) -> Self {
        Self { variable: variable.into(), sensor: sensor.into(), timestamp, value }
    }

    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            variable: self.variable.clone(),
            sensor: self.sensor.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Long-format observation table keyed by (variable, sensor, timestamp)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    records: BTreeMap<ObservationKey, f64>,
}

impl ObservationTable {
    /// Build a table, rejecting duplicate keys and non-finite values
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut table = BTreeMap::new();
        for observation in records {
            let key = observation.key();
            if !observation.value.is_finite() {
                return Err(SensormeshError::NonFiniteValue {
                    variable: key.variable,
                    sensor: key.sensor.to_string(),
                    timestamp: key.timestamp,
                });
            }
            if table.contains_key(&key) {
                return Err(SensormeshError::DuplicateObservation {
                    variable: key.variable,
                    sensor: key.sensor.to_string(),
                    timestamp: key.timestamp,
                });
            }
            table.insert(key, observation.value);
        }
        Ok(Self { records: table })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObservationKey, f64)> {
        self.records.iter().map(|(key, value)| (key, *value))
    }

    pub fn get(&self, variable: &str, sensor: &SensorId, timestamp: NaiveDateTime) -> Option<f64> {
        let key = ObservationKey {
            variable: variable.to_string(),
            sensor: sensor.clone(),
            timestamp,
        };
        self.records.get(&key).copied()
    }

    /// Rows of one variable
    pub fn for_variable<'a>(
        &'a self,
        variable: &'a str,
    ) -> impl Iterator<Item = (&'a ObservationKey, f64)> + 'a {
        self.iter().filter(move |(key, _)| key.variable == variable)
    }

    pub fn timestamps(&self) -> BTreeSet<NaiveDateTime> {
        self.records.keys().map(|key| key.timestamp).collect()
    }

    pub fn sensors(&self) -> BTreeSet<SensorId> {
        self.records.keys().map(|key| key.sensor.clone()).collect()
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.records.keys().map(|key| key.variable.clone()).collect()
    }

    /// Keep only the tracked variables
    pub fn retain_variables(&mut self, variables: &[String]) -> usize {
        let before = self.records.len();
        self.records.retain(|key, _| variables.contains(&key.variable));
        before - self.records.len()
    }

    /// Keep only rows whose sensor matches the predicate
    pub fn retain_sensors<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&SensorId) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|key, _| keep(&key.sensor));
        before - self.records.len()
    }

    /// Copy of the table without any row at the given timestamps
    pub fn without_timestamps(&self, excluded: &BTreeSet<NaiveDateTime>) -> ObservationTable {
        let records = self
            .records
            .iter()
            .filter(|(key, _)| !excluded.contains(&key.timestamp))
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        Self { records }
    }

    /// Aggregate each (variable, sensor, bucket) group to its median.
    ///
    /// Buckets are the timestamps floored to the granularity; the resulting
    /// rows carry the bucket start as their timestamp.
    pub fn resample(&self, granularity: CalendarGranularity) -> ObservationTable {
        let mut groups: BTreeMap<ObservationKey, Vec<f64>> = BTreeMap::new();
        for (key, value) in self.iter() {
            let bucket = ObservationKey {
                variable: key.variable.clone(),
                sensor: key.sensor.clone(),
                timestamp: granularity.floor(key.timestamp),
            };
            groups.entry(bucket).or_default().push(value);
        }

        let records = groups
            .into_iter()
            .filter_map(|(key, values)| median(values).map(|m| (key, m)))
            .collect();
        Self { records }
    }
}
