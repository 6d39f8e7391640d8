use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::location::Located;

/// Identity of a mesh cell: its flat row-major index in the generating grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A query location without observations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCell {
    pub id: CellId,
    pub location: Point<f64>,
}

impl MeshCell {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self { id: CellId(id), location: Point::new(x, y) }
    }
}

impl Located for MeshCell {
    type Id = CellId;

    fn id(&self) -> CellId {
        self.id
    }

    fn location(&self) -> Point<f64> {
        self.location
    }
}
