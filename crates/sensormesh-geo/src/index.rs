use crate::proximity::segment_distance_2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use sensormesh_core::models::{InfrastructureGeometry, InfrastructureObject};

/// One segment of an indexed object.
///
/// Lines are split into their segments so the tree's nearest-neighbour query
/// returns exact point-to-line distances; point objects become degenerate
/// segments.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSegment {
    /// Position of the source object within its layer
    pub object: usize,

    start: [f64; 2],
    end: [f64; 2],
}

impl IndexedSegment {
    pub fn new(object: usize, start: [f64; 2], end: [f64; 2]) -> Self {
        Self { object, start, end }
    }

    /// Segments covering one infrastructure object
    fn from_object(object: usize, geometry: &InfrastructureGeometry) -> Vec<Self> {
        match geometry {
            InfrastructureGeometry::Point(p) => {
                vec![Self::new(object, [p.x(), p.y()], [p.x(), p.y()])]
            }
            InfrastructureGeometry::Line(line) => line
                .lines()
                .map(|s| Self::new(object, [s.start.x, s.start.y], [s.end.x, s.end.y]))
                .collect(),
        }
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.start, self.end)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        segment_distance_2(*point, self.start, self.end)
    }
}

/// Nearest-object index over a subset of an infrastructure layer
pub struct ProximityIndex {
    tree: RTree<IndexedSegment>,
}

impl ProximityIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load the objects, remembering each one's position in the layer
    pub fn from_objects<'a, I>(objects: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a InfrastructureObject)>,
    {
        let segments: Vec<IndexedSegment> = objects
            .into_iter()
            .flat_map(|(i, object)| IndexedSegment::from_object(i, &object.geometry))
            .collect();

        Self { tree: RTree::bulk_load(segments) }
    }

    /// Distance to the nearest indexed object, `None` when the index is empty
    pub fn nearest_distance(&self, point: [f64; 2]) -> Option<f64> {
        self.tree.nearest_neighbor(&point).map(|segment| segment.distance_2(&point).sqrt())
    }

    /// Layer position of the nearest indexed object
    pub fn nearest_object(&self, point: [f64; 2]) -> Option<usize> {
        self.tree.nearest_neighbor(&point).map(|segment| segment.object)
    }

    /// Number of indexed segments
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for ProximityIndex {
    fn default() -> Self {
        Self::new()
    }
}
