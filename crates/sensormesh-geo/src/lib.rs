//! Sensormesh Geo - Proximity, infrastructure features, and admissibility
//!
//! This crate computes planar distances, inverse-distance features against
//! categorised infrastructure layers, and the median-threshold validity mask
//! that decides which locations resemble existing sensor placements.

pub mod delimit;
pub mod index;
pub mod infrastructure;
pub mod mask;
pub mod mesh;
pub mod proximity;

pub use delimit::{delimit_sensors_by_boundary, delimit_sensors_by_mask};
pub use index::{IndexedSegment, ProximityIndex};
pub use infrastructure::{InfrastructureExtractor, NearestStrategy};
pub use mask::{MaskOutcome, Thresholds, ValidityMask};
pub use mesh::MeshGrid;
pub use proximity::{distance, distances_from};
