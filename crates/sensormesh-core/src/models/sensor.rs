use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::geometry::validate_point;
use super::location::Located;
use super::observation::ObservationTable;
use crate::error::{Result, SensormeshError};

/// Unique identifier for a sensor (its name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId(pub String);

impl SensorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SensorId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A fixed-location source of observations
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// Sensor name
    pub id: SensorId,

    /// Position in projected coordinates
    pub location: Point<f64>,

    /// Sensor type or category
    pub category: String,

    /// Whether the sensor is currently reporting
    pub active: bool,
}

impl Sensor {
    /// Create an active sensor with no category
    pub fn new(id: impl Into<SensorId>, x: f64, y: f64) -> Self {
        Self { id: id.into(), location: Point::new(x, y), category: String::new(), active: true }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Located for Sensor {
    type Id = SensorId;

    fn id(&self) -> SensorId {
        self.id.clone()
    }

    fn location(&self) -> Point<f64> {
        self.location
    }
}

/// Ordered collection of sensors.
///
/// Registry order is significant: it is the tie-break order when two
/// candidate neighbours sit at exactly the same distance.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
    index: HashMap<SensorId, usize>,
}

impl SensorRegistry {
    /// Build a registry, rejecting duplicate names and non-finite locations
    pub fn new(sensors: Vec<Sensor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(sensors.len());
        for (position, sensor) in sensors.iter().enumerate() {
            validate_point(&sensor.location).into_result(sensor.id.as_str())?;
            if index.insert(sensor.id.clone(), position).is_some() {
                return Err(SensormeshError::DuplicateSensor { sensor: sensor.id.to_string() });
            }
        }
        Ok(Self { sensors, index })
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn get(&self, id: &SensorId) -> Option<&Sensor> {
        self.index.get(id).map(|&position| &self.sensors[position])
    }

    /// Registry position of a sensor
    pub fn position(&self, id: &SensorId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Keep only sensors matching the predicate, preserving order.
    /// Returns the number of sensors dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Sensor) -> bool,
    {
        let before = self.sensors.len();
        self.sensors.retain(|sensor| keep(sensor));
        self.reindex();
        before - self.sensors.len()
    }

    /// Drop sensors that never appear in the observation table
    pub fn retain_observed(&mut self, observations: &ObservationTable) -> usize {
        let observed = observations.sensors();
        self.retain(|sensor| observed.contains(&sensor.id))
    }

    fn reindex(&mut self) {
        self.index =
            self.sensors.iter().enumerate().map(|(i, sensor)| (sensor.id.clone(), i)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SensorRegistry {
        SensorRegistry::new(vec![
            Sensor::new("A", 0.0, 0.0),
            Sensor::new("B", 1.0, 0.0).with_category("traffic"),
            Sensor::new("C", 3.0, 0.0).with_active(false),
        ])
        .unwrap()
    }

    #[test]
    fn test_registry_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.position(&"B".into()), Some(1));
        assert_eq!(registry.get(&"B".into()).unwrap().category, "traffic");
        assert!(!registry.get(&"C".into()).unwrap().active);
        assert!(registry.get(&"Z".into()).is_none());
    }

    #[test]
    fn test_duplicate_sensor_rejected() {
        let err = SensorRegistry::new(vec![Sensor::new("A", 0.0, 0.0), Sensor::new("A", 1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, SensormeshError::DuplicateSensor { .. }));
    }

    #[test]
    fn test_non_finite_location_rejected() {
        let err = SensorRegistry::new(vec![Sensor::new("A", f64::NAN, 0.0)]).unwrap_err();
        assert!(matches!(err, SensormeshError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_retain_reindexes() {
        let mut registry = registry();
        let dropped = registry.retain(|s| s.id.as_str() != "A");
        assert_eq!(dropped, 1);
        assert_eq!(registry.position(&"B".into()), Some(0));
        assert_eq!(registry.position(&"C".into()), Some(1));
        assert!(registry.position(&"A".into()).is_none());
    }

    #[test]
    fn test_retain_observed_drops_silent_sensors() {
        use crate::models::Observation;
        use chrono::NaiveDate;

        let ts = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let observations = ObservationTable::from_records(vec![
            Observation::new("NO2", "C", ts, 4.0),
            Observation::new("NO2", "A", ts, 2.0),
        ])
        .unwrap();

        let mut registry = registry();
        assert_eq!(registry.retain_observed(&observations), 1);

        let order: Vec<&str> = registry.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["A", "C"]);
        assert_eq!(registry.position(&"A".into()), Some(0));
        assert_eq!(registry.position(&"C".into()), Some(1));
        assert!(registry.get(&"B".into()).is_none());
    }
}
