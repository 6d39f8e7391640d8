use geo::{Intersects, Point};
use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::{validate_point, MeshCell};
use std::collections::HashSet;

/// Prediction mesh: a set of query points with stable identities.
///
/// A regular grid numbers its cells row-major with x varying fastest, so
/// `id = row * nx + column`. Clipping keeps the grid identities, which
/// lets scored cells be placed back on the full grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGrid {
    nx: usize,
    ny: usize,
    cells: Vec<MeshCell>,
}

impl MeshGrid {
    /// `nx * ny` evenly spaced cells spanning both ranges inclusively
    pub fn regular(nx: usize, ny: usize, x_range: (f64, f64), y_range: (f64, f64)) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(SensormeshError::InvalidGeometry {
                feature_id: "mesh".to_string(),
                reason: format!("grid must have at least one cell per axis, got {}x{}", nx, ny),
            });
        }
        for (axis, (start, end)) in [("x", x_range), ("y", y_range)] {
            if !start.is_finite() || !end.is_finite() {
                return Err(SensormeshError::InvalidGeometry {
                    feature_id: "mesh".to_string(),
                    reason: format!("{} range is not finite", axis),
                });
            }
        }

        let xs = linspace(x_range, nx);
        let ys = linspace(y_range, ny);
        let cells = ys
            .iter()
            .enumerate()
            .flat_map(|(row, &y)| {
                xs.iter()
                    .enumerate()
                    .map(move |(column, &x)| MeshCell::new((row * nx + column) as u64, x, y))
            })
            .collect();

        Ok(Self { nx, ny, cells })
    }

    /// Grid over an explicit, irregular set of cells, rejecting non-finite
    /// locations and repeated identities
    pub fn from_cells(cells: Vec<MeshCell>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(cells.len());
        for cell in &cells {
            validate_point(&cell.location).into_result(cell.id.to_string())?;
            if !seen.insert(cell.id) {
                return Err(SensormeshError::InvalidGeometry {
                    feature_id: cell.id.to_string(),
                    reason: "duplicate cell id".to_string(),
                });
            }
        }
        Ok(Self { nx: cells.len(), ny: 1, cells })
    }

    /// Keep the cells intersecting the boundary
    pub fn clip_to<G>(&self, boundary: &G) -> MeshGrid
    where
        G: Intersects<Point<f64>>,
    {
        let cells: Vec<MeshCell> =
            self.cells.iter().filter(|cell| boundary.intersects(&cell.location)).copied().collect();

        tracing::debug!(kept = cells.len(), total = self.cells.len(), "Clipped mesh to boundary");
        Self { nx: self.nx, ny: self.ny, cells }
    }

    pub fn cells(&self) -> &[MeshCell] {
        &self.cells
    }

    /// Shape of the generating grid, `(nx, ny)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn linspace((start, end): (f64, f64), n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}
