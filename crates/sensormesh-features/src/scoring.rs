use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::FeatureTable;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Rows of a feature table restricted to the columns a trained model expects.
///
/// Columns are matched by name and must appear in the table in the same
/// relative order; neither a missing nor a reordered column is coerced.
/// Rows with an unset cell in any expected column are set aside as
/// unscorable instead of being filled.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringMatrix<K> {
    pub columns: Vec<String>,
    pub keys: Vec<K>,
    pub x: Vec<Vec<f64>>,
    pub unscorable: Vec<K>,
}

impl<K> ScoringMatrix<K>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    pub fn from_table<S: AsRef<str>>(table: &FeatureTable<K>, expected: &[S]) -> Result<Self> {
        let names = table.schema().names();
        let expected: Vec<&str> = expected.iter().map(AsRef::as_ref).collect();

        let mut positions = Vec::with_capacity(expected.len());
        for (position, &column) in expected.iter().enumerate() {
            match names.iter().position(|name| name == column) {
                Some(found) => positions.push(found),
                None => {
                    return Err(SensormeshError::SchemaMismatch {
                        position,
                        expected: column.to_string(),
                        found: "<absent>".to_string(),
                    })
                }
            }
        }

        let wanted: HashSet<&str> = expected.iter().copied().collect();
        let in_table_order = names.iter().filter(|name| wanted.contains(name.as_str()));
        for (position, (&column, found)) in expected.iter().zip(in_table_order).enumerate() {
            if column != found.as_str() {
                return Err(SensormeshError::SchemaMismatch {
                    position,
                    expected: column.to_string(),
                    found: found.clone(),
                });
            }
        }

        let mut keys = Vec::new();
        let mut x = Vec::new();
        let mut unscorable = Vec::new();
        for row in table.rows() {
            let cells: Option<Vec<f64>> = positions.iter().map(|&i| row.cells[i]).collect();
            match cells {
                Some(cells) => {
                    keys.push(row.key.clone());
                    x.push(cells);
                }
                None => unscorable.push(row.key.clone()),
            }
        }

        if !unscorable.is_empty() {
            tracing::warn!(
                unscorable = unscorable.len(),
                scorable = keys.len(),
                "Rows with unset expected columns cannot be scored"
            );
        }

        Ok(Self {
            columns: expected.iter().map(|c| c.to_string()).collect(),
            keys,
            x,
            unscorable,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
