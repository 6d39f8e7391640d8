use geo::{LineString, Point};

use super::geometry::{validate_line_string, validate_point};
use crate::error::Result;

/// Geometry of one infrastructure object
#[derive(Debug, Clone, PartialEq)]
pub enum InfrastructureGeometry {
    Line(LineString<f64>),
    Point(Point<f64>),
}

/// A road segment, amenity, or other categorised reference object
#[derive(Debug, Clone, PartialEq)]
pub struct InfrastructureObject {
    /// Category label (e.g. road class such as "primary" or "primary_link")
    pub category: String,
    pub geometry: InfrastructureGeometry,
}

impl InfrastructureObject {
    pub fn line(category: impl Into<String>, coords: Vec<(f64, f64)>) -> Self {
        Self { category: category.into(), geometry: InfrastructureGeometry::Line(coords.into()) }
    }

    pub fn point(category: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            category: category.into(),
            geometry: InfrastructureGeometry::Point(Point::new(x, y)),
        }
    }
}

/// Read-only set of infrastructure objects
#[derive(Debug, Clone, Default)]
pub struct InfrastructureLayer {
    objects: Vec<InfrastructureObject>,
}

impl InfrastructureLayer {
    /// Build a layer, rejecting malformed geometry up front so that distance
    /// computation itself never fails
    pub fn new(objects: Vec<InfrastructureObject>) -> Result<Self> {
        for (i, object) in objects.iter().enumerate() {
            let validation = match &object.geometry {
                InfrastructureGeometry::Line(line) => validate_line_string(line),
                InfrastructureGeometry::Point(point) => validate_point(point),
            };
            validation.into_result(format!("{}[{}]", object.category, i))?;
        }
        Ok(Self { objects })
    }

    pub fn objects(&self) -> &[InfrastructureObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Positions of the objects whose category satisfies the predicate
    pub fn positions_matching<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, object)| predicate(&object.category))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensormeshError;

    #[test]
    fn test_layer_rejects_degenerate_line() {
        let err = InfrastructureLayer::new(vec![
            InfrastructureObject::line("primary", vec![(0.0, 0.0), (1.0, 0.0)]),
            InfrastructureObject::line("primary", vec![(0.0, 0.0)]),
        ])
        .unwrap_err();
        match err {
            SensormeshError::InvalidGeometry { feature_id, .. } => assert_eq!(feature_id, "primary[1]"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_matching_filters_by_category() {
        let layer = InfrastructureLayer::new(vec![
            InfrastructureObject::point("crossing", 0.0, 0.0),
            InfrastructureObject::point("traffic_signals", 1.0, 0.0),
            InfrastructureObject::point("crossing", 2.0, 0.0),
        ])
        .unwrap();
        assert_eq!(layer.positions_matching(|c| c == "crossing").len(), 2);
        assert_eq!(layer.len(), 3);
    }
}
