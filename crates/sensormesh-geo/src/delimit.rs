//! Restriction of the sensor network to an area of interest.
//!
//! Both functions shrink the registry and drop every observation of the
//! removed sensors, so the two always describe the same network.

use geo::{Intersects, Point};
use sensormesh_core::error::Result;
use sensormesh_core::models::{ObservationTable, SensorId, SensorRegistry, StaticTable};
use std::collections::BTreeSet;

use crate::mask::ValidityMask;

/// Keep sensors located inside (or on) the boundary.
/// Returns the number of sensors dropped.
pub fn delimit_sensors_by_boundary<G>(
    registry: &mut SensorRegistry,
    observations: &mut ObservationTable,
    boundary: &G,
) -> usize
where
    G: Intersects<Point<f64>>,
{
    let dropped = registry.retain(|sensor| boundary.intersects(&sensor.location));
    let removed = drop_unregistered(registry, observations);

    tracing::info!(
        sensors_dropped = dropped,
        observations_dropped = removed,
        "Delimited sensors by boundary"
    );
    dropped
}

/// Keep sensors whose own proximity features pass the mask.
///
/// Sensors without a row in `sensor_features` cannot be admitted and are
/// dropped as well.
pub fn delimit_sensors_by_mask(
    registry: &mut SensorRegistry,
    observations: &mut ObservationTable,
    mask: &ValidityMask,
    sensor_features: &StaticTable<SensorId>,
) -> Result<usize> {
    let outcome = mask.apply(sensor_features)?;
    let admitted: BTreeSet<SensorId> = outcome.table.keys().cloned().collect();

    let dropped = registry.retain(|sensor| admitted.contains(&sensor.id));
    let removed = drop_unregistered(registry, observations);

    tracing::info!(
        sensors_dropped = dropped,
        observations_dropped = removed,
        "Delimited sensors by validity mask"
    );
    Ok(dropped)
}

fn drop_unregistered(registry: &SensorRegistry, observations: &mut ObservationTable) -> usize {
    observations.retain_sensors(|sensor| registry.get(sensor).is_some())
}
