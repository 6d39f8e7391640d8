//! Keyed tables produced and consumed by the encoders.
//!
//! Joins are explicit functions keyed by entity identity; a missing key on
//! the right-hand side of a join yields missing cells, never a dropped row.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::schema::{ColumnKey, FeatureSchema};
use super::sensor::SensorId;
use crate::error::{Result, SensormeshError};

/// Row key of a training feature row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrainingKey {
    pub sensor: SensorId,
    pub timestamp: NaiveDateTime,
}

impl TrainingKey {
    pub fn new(sensor: impl Into<SensorId>, timestamp: NaiveDateTime) -> Self {
        Self { sensor: sensor.into(), timestamp }
    }
}

impl fmt::Display for TrainingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sensor, self.timestamp)
    }
}

/// One fixed-width record. `None` marks an undeterminable cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<K> {
    pub key: K,
    pub cells: Vec<Option<f64>>,
}

/// Rows sharing one schema
#[derive(Debug, Clone)]
pub struct FeatureTable<K> {
    schema: Arc<FeatureSchema>,
    rows: Vec<FeatureRow<K>>,
    index: HashMap<K, usize>,
}

impl<K> FeatureTable<K>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema, rows: Vec::new(), index: HashMap::new() }
    }

    /// Append a row; its width must equal the schema's
    pub fn push(&mut self, key: K, cells: Vec<Option<f64>>) -> Result<()> {
        if cells.len() != self.schema.len() {
            return Err(SensormeshError::RowWidthMismatch {
                row: key.to_string(),
                expected: self.schema.len(),
                found: cells.len(),
            });
        }
        if self.index.contains_key(&key) {
            return Err(SensormeshError::DuplicateRow { key: key.to_string() });
        }
        self.index.insert(key.clone(), self.rows.len());
        self.rows.push(FeatureRow { key, cells });
        Ok(())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<FeatureSchema> {
        Arc::clone(&self.schema)
    }

    pub fn rows(&self) -> &[FeatureRow<K>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&FeatureRow<K>> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Single cell by row key and column
    pub fn cell(&self, key: &K, column: &ColumnKey) -> Option<f64> {
        let position = self.schema.position(column)?;
        self.get(key).and_then(|row| row.cells[position])
    }
}

/// Static per-location columns (infrastructure proximity, demographics)
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTable<K>
where
    K: Eq + Hash,
{
    columns: Vec<String>,
    rows: Vec<(K, Vec<Option<f64>>)>,
    index: HashMap<K, usize>,
}

impl<K> StaticTable<K>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new(), index: HashMap::new() }
    }

    pub fn insert(&mut self, key: K, cells: Vec<Option<f64>>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(SensormeshError::RowWidthMismatch {
                row: key.to_string(),
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        if self.index.contains_key(&key) {
            return Err(SensormeshError::DuplicateRow { key: key.to_string() });
        }
        self.index.insert(key.clone(), self.rows.len());
        self.rows.push((key, cells));
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&K, &[Option<f64>])> {
        self.rows.iter().map(|(key, cells)| (key, cells.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.iter().map(|(key, _)| key)
    }

    pub fn get(&self, key: &K) -> Option<&[Option<f64>]> {
        self.index.get(key).map(|&i| self.rows[i].1.as_slice())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Cells for `key`, or all-missing when the key is absent
    pub fn cells_or_missing(&self, key: &K) -> Vec<Option<f64>> {
        match self.get(key) {
            Some(cells) => cells.to_vec(),
            None => vec![None; self.columns.len()],
        }
    }

    /// Keep rows matching the predicate; returns the number dropped
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &[Option<f64>]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|(key, cells)| keep(key, cells));
        self.index = self.rows.iter().enumerate().map(|(i, (key, _))| (key.clone(), i)).collect();
        before - self.rows.len()
    }

    /// Left join on row key: every row of `self` is kept, `other`'s columns
    /// are appended, and keys absent from `other` get missing cells.
    pub fn left_join(&self, other: &StaticTable<K>) -> StaticTable<K> {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let rows: Vec<(K, Vec<Option<f64>>)> = self
            .rows
            .iter()
            .map(|(key, cells)| {
                let mut joined = cells.clone();
                joined.extend(other.cells_or_missing(key));
                (key.clone(), joined)
            })
            .collect();
        let index = rows.iter().enumerate().map(|(i, (key, _))| (key.clone(), i)).collect();

        StaticTable { columns, rows, index }
    }
}
