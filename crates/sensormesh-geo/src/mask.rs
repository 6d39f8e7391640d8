//! Admission of candidate locations by infrastructure similarity.
//!
//! Thresholds are the per-column medians of a reference table (usually the
//! proximity features at existing sensor sites). A candidate passes when at
//! least one of its columns is strictly above the matching threshold.

use serde::{Deserialize, Serialize};
use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::StaticTable;
use sensormesh_core::stats::median;
use std::fmt;
use std::hash::Hash;

/// Per-column admission thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub columns: Vec<String>,

    /// `None` when the reference had no value for the column
    pub values: Vec<Option<f64>>,
}

impl Thresholds {
    /// Median of every column of the reference table, ignoring missing cells
    pub fn from_reference<K>(reference: &StaticTable<K>) -> Self
    where
        K: Clone + Eq + Hash + fmt::Display,
    {
        let values = (0..reference.columns().len())
            .map(|column| median(reference.rows().filter_map(|(_, cells)| cells[column])))
            .collect();

        Self { columns: reference.columns().to_vec(), values }
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.iter().position(|c| c == column).and_then(|i| self.values[i])
    }

    /// True if any cell strictly exceeds its threshold
    pub fn admits(&self, cells: &[Option<f64>]) -> bool {
        cells.iter().zip(&self.values).any(|pair| match pair {
            (Some(value), Some(threshold)) => value > threshold,
            _ => false,
        })
    }

    fn ensure_columns(&self, found: &[String]) -> Result<()> {
        for position in 0..self.columns.len().max(found.len()) {
            let want = self.columns.get(position);
            let got = found.get(position);
            if want != got {
                return Err(SensormeshError::SchemaMismatch {
                    position,
                    expected: want.map_or("<absent>", String::as_str).to_string(),
                    found: got.map_or("<absent>", String::as_str).to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Candidates left after masking
#[derive(Debug, Clone)]
pub struct MaskOutcome<K>
where
    K: Eq + Hash,
{
    pub table: StaticTable<K>,
    pub rejected: usize,
}

/// Filters candidate tables against fixed thresholds
#[derive(Debug, Clone)]
pub struct ValidityMask {
    thresholds: Thresholds,
}

impl ValidityMask {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds taken from the reference table
    pub fn from_reference<K>(reference: &StaticTable<K>) -> Self
    where
        K: Clone + Eq + Hash + fmt::Display,
    {
        Self::new(Thresholds::from_reference(reference))
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Keep the admitted candidate rows.
    ///
    /// The candidate table must carry the reference columns in the same order.
    pub fn apply<K>(&self, candidates: &StaticTable<K>) -> Result<MaskOutcome<K>>
    where
        K: Clone + Eq + Hash + fmt::Display,
    {
        self.thresholds.ensure_columns(candidates.columns())?;

        let mut table = candidates.clone();
        let rejected = table.retain(|_, cells| self.thresholds.admits(cells));

        tracing::info!(
            admitted = table.len(),
            rejected,
            "Applied validity mask"
        );
        Ok(MaskOutcome { table, rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sensormesh_core::models::{CellId, SensorId};

    fn reference() -> StaticTable<SensorId> {
        let mut table = StaticTable::new(vec!["primary".into(), "crossing".into()]);
        table.insert("A".into(), vec![Some(0.1), Some(1.0)]).unwrap();
        table.insert("B".into(), vec![Some(0.3), None]).unwrap();
        table.insert("C".into(), vec![Some(0.5), Some(3.0)]).unwrap();
        table
    }

    fn candidates(rows: &[(u64, Option<f64>, Option<f64>)]) -> StaticTable<CellId> {
        let mut table = StaticTable::new(vec!["primary".into(), "crossing".into()]);
        for &(id, a, b) in rows {
            table.insert(CellId(id), vec![a, b]).unwrap();
        }
        table
    }

    #[test]
    fn test_thresholds_are_medians_ignoring_missing() {
        let thresholds = Thresholds::from_reference(&reference());
        assert_eq!(thresholds.get("primary"), Some(0.3));
        assert_eq!(thresholds.get("crossing"), Some(2.0));
        assert_eq!(thresholds.get("unknown"), None);
    }

    #[test]
    fn test_any_column_above_threshold_admits() {
        let mask = ValidityMask::from_reference(&reference());
        let outcome = mask
            .apply(&candidates(&[
                (0, Some(0.4), Some(0.0)),
                (1, Some(0.0), Some(2.5)),
                (2, Some(0.3), Some(2.0)),
                (3, None, None),
            ]))
            .unwrap();

        let kept: Vec<CellId> = outcome.table.keys().cloned().collect();
        assert_eq!(kept, vec![CellId(0), CellId(1)]);
        assert_eq!(outcome.rejected, 2);
    }

    #[test]
    fn test_column_without_threshold_never_admits() {
        let mut reference: StaticTable<SensorId> = StaticTable::new(vec!["primary".into()]);
        reference.insert("A".into(), vec![None]).unwrap();
        let mask = ValidityMask::from_reference(&reference);

        let mut candidates: StaticTable<CellId> = StaticTable::new(vec!["primary".into()]);
        candidates.insert(CellId(0), vec![Some(f64::INFINITY)]).unwrap();

        let outcome = mask.apply(&candidates).unwrap();
        assert!(outcome.table.is_empty());
        assert_eq!(outcome.rejected, 1);
    }

    #[test]
    fn test_column_mismatch_is_rejected() {
        let mask = ValidityMask::from_reference(&reference());
        let mut candidates: StaticTable<CellId> =
            StaticTable::new(vec!["crossing".into(), "primary".into()]);
        candidates.insert(CellId(0), vec![Some(1.0), Some(1.0)]).unwrap();

        let err = mask.apply(&candidates).unwrap_err();
        assert!(matches!(err, SensormeshError::SchemaMismatch { position: 0, .. }));
    }

    #[test]
    fn test_thresholds_serde() {
        let thresholds = Thresholds::from_reference(&reference());
        let json = serde_json::to_string(&thresholds).unwrap();
        let restored: Thresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, thresholds);
    }

    proptest! {
        #[test]
        fn prop_mask_is_idempotent(
            cells in prop::collection::vec(
                (prop::option::of(0.0f64..10.0), prop::option::of(0.0f64..10.0)),
                0..40,
            )
        ) {
            let rows: Vec<(u64, Option<f64>, Option<f64>)> =
                cells.iter().enumerate().map(|(i, &(a, b))| (i as u64, a, b)).collect();
            let mask = ValidityMask::from_reference(&reference());

            let once = mask.apply(&candidates(&rows)).unwrap();
            let twice = mask.apply(&once.table).unwrap();

            prop_assert_eq!(twice.rejected, 0);
            prop_assert_eq!(twice.table, once.table);
        }
    }
}
