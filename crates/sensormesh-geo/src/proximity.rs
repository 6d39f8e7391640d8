//! Planar distance computation.
//!
//! All coordinates are assumed projected and comparable; these functions
//! never fail because geometry is validated when layers and registries are
//! built.

use geo::{Distance, Euclidean, LineString, Point};
use sensormesh_core::models::InfrastructureGeometry;

/// Euclidean distance between two points
pub fn distance(a: Point<f64>, b: Point<f64>) -> f64 {
    Euclidean.distance(a, b)
}

/// Distances from one origin to many targets, in target order
pub fn distances_from(origin: Point<f64>, targets: &[Point<f64>]) -> Vec<f64> {
    targets.iter().map(|&target| distance(origin, target)).collect()
}

/// Squared distance from `p` to the segment `a`-`b`
pub fn segment_distance_2(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let length_2 = dx * dx + dy * dy;

    // Degenerate segment (a point object)
    let t = if length_2 == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / length_2).clamp(0.0, 1.0)
    };

    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    let (ex, ey) = (p[0] - cx, p[1] - cy);
    ex * ex + ey * ey
}

/// Distance from a point to the nearest part of a line
pub fn distance_to_line(point: Point<f64>, line: &LineString<f64>) -> f64 {
    let p = [point.x(), point.y()];
    line.lines()
        .map(|segment| {
            segment_distance_2(p, [segment.start.x, segment.start.y], [segment.end.x, segment.end.y])
        })
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

/// Distance from a point to an infrastructure object
pub fn distance_to_object(point: Point<f64>, geometry: &InfrastructureGeometry) -> f64 {
    match geometry {
        InfrastructureGeometry::Line(line) => distance_to_line(point, line),
        InfrastructureGeometry::Point(target) => distance(point, *target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance_basic() {
        assert!((distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distances_from_keeps_order() {
        let targets = [Point::new(1.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 0.0)];
        assert_eq!(distances_from(Point::new(0.0, 0.0), &targets), vec![1.0, 3.0, 0.0]);
    }

    #[test]
    fn test_distance_to_line_projects_onto_segment() {
        let line = LineString::from(vec![(0.0, 2.0), (10.0, 2.0)]);
        assert!((distance_to_line(Point::new(5.0, 0.0), &line) - 2.0).abs() < 1e-12);
        // Beyond the end the nearest part is the endpoint
        assert!((distance_to_line(Point::new(13.0, 6.0), &line) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_segment_is_point_distance() {
        assert_eq!(segment_distance_2([0.0, 0.0], [3.0, 4.0], [3.0, 4.0]), 25.0);
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric_and_non_negative(
            ax in -1e6f64..1e6, ay in -1e6f64..1e6, bx in -1e6f64..1e6, by in -1e6f64..1e6
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            let d = distance(a, b);
            prop_assert!(d >= 0.0);
            prop_assert_eq!(d, distance(b, a));
            prop_assert_eq!(distance(a, a), 0.0);
        }
    }
}
