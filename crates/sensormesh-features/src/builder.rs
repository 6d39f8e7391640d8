//! Spatio-temporal k-nearest-neighbour training features.
//!
//! For every observed sensor, every timestamp of the observation index and
//! every tracked variable, the row holds the values and distances of the `k`
//! nearest *other* sensors that reported the variable at that timestamp,
//! nearest first. Calendar columns and static per-sensor columns follow.
//!
//! A timestamp where any (sensor, variable) pair has fewer than `k`
//! candidates is insufficient. Insufficiency is global: every target row at
//! that timestamp is removed, whichever sensor or variable triggered it.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use sensormesh_core::config::EngineConfig;
use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::{
    CalendarGranularity, FeatureSchema, FeatureTable, ObservationTable, SensorId, SensorRegistry,
    StaticTable, TrainingKey,
};
use sensormesh_geo::distances_from;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::calendar::calendar_cells;
use crate::variables::column_labels;

/// Everything one build produces
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// One row per observed sensor and timestamp
    pub features: FeatureTable<TrainingKey>,
    /// Observations minus every row at an insufficient timestamp
    pub targets: ObservationTable,
    /// Timestamps excluded from the targets
    pub insufficient: BTreeSet<NaiveDateTime>,
}

/// Reporting sensors per timestamp and variable, as (registry position, value)
/// in registry order
type Pools = BTreeMap<NaiveDateTime, Vec<Vec<(usize, f64)>>>;

/// Rows and insufficient timestamps produced by one sensor's worker
type Partial = (Vec<(TrainingKey, Vec<Option<f64>>)>, BTreeSet<NaiveDateTime>);

pub struct KnnFeatureBuilder<'a> {
    registry: &'a SensorRegistry,
    observations: &'a ObservationTable,
    variables: Vec<String>,
    k: usize,
    granularity: CalendarGranularity,
    static_tables: Vec<&'a StaticTable<SensorId>>,
    separator: char,
    parallel: bool,
}

impl<'a> KnnFeatureBuilder<'a> {
    pub fn new(registry: &'a SensorRegistry, observations: &'a ObservationTable) -> Self {
        Self {
            registry,
            observations,
            variables: Vec::new(),
            k: 5,
            granularity: CalendarGranularity::default(),
            static_tables: Vec::new(),
            separator: '.',
            parallel: true,
        }
    }

    pub fn from_config(
        registry: &'a SensorRegistry,
        observations: &'a ObservationTable,
        config: &EngineConfig,
    ) -> Self {
        Self::new(registry, observations)
            .with_separator(config.variable_separator.value)
            .with_variables(config.variables.value.clone())
            .with_k(config.k.value)
            .with_granularity(config.granularity.value)
            .with_parallel(config.parallel.value)
    }

    /// Tracked variables, matched against observations by their full
    /// label; columns are named after the part before the separator
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_granularity(mut self, granularity: CalendarGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Append a static table keyed by sensor; columns keep the order in
    /// which tables are added
    pub fn with_static(mut self, table: &'a StaticTable<SensorId>) -> Self {
        self.static_tables.push(table);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Schema of the rows this builder emits
    pub fn schema(&self) -> FeatureSchema {
        let static_columns: Vec<String> = self
            .static_tables
            .iter()
            .flat_map(|table| table.columns().iter().cloned())
            .collect();
        let columns = column_labels(&self.variables, self.separator);
        FeatureSchema::new(&columns, self.k, self.granularity, &static_columns)
    }

    pub fn build(&self) -> Result<BuildOutput> {
        self.check_inputs()?;

        let schema = Arc::new(self.schema());
        let pools = self.pools()?;
        let locations: Vec<geo::Point<f64>> = self.registry.iter().map(|s| s.location).collect();

        let observed = self.observations.sensors();
        let sensors: Vec<usize> = (0..self.registry.len())
            .filter(|&position| observed.contains(&self.registry.sensors()[position].id))
            .collect();

        let work = |&position: &usize| self.sensor_rows(position, &locations, &pools, &schema);
        let partials: Vec<Partial> = if self.parallel {
            sensors.par_iter().map(work).collect()
        } else {
            sensors.iter().map(work).collect()
        };

        let mut features = FeatureTable::new(Arc::clone(&schema));
        let mut insufficient = BTreeSet::new();
        for (rows, partial) in partials {
            for (key, cells) in rows {
                features.push(key, cells)?;
            }
            insufficient.extend(partial);
        }

        for timestamp in &insufficient {
            tracing::warn!(
                %timestamp,
                k = self.k,
                "Fewer than k neighbours available; excluding timestamp from targets"
            );
        }

        let targets = self.observations.without_timestamps(&insufficient);
        tracing::info!(
            rows = features.len(),
            columns = schema.len(),
            targets = targets.len(),
            excluded_timestamps = insufficient.len(),
            "Built k-NN training features"
        );

        Ok(BuildOutput { features, targets, insufficient })
    }

    fn check_inputs(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(SensormeshError::ConfigMissing { key: "variables".to_string() });
        }
        if self.k == 0 {
            return Err(SensormeshError::ConfigInvalid {
                key: "k".to_string(),
                reason: "neighbour count must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn pools(&self) -> Result<Pools> {
        let mut pools: Pools = self
            .observations
            .timestamps()
            .into_iter()
            .map(|timestamp| (timestamp, vec![Vec::new(); self.variables.len()]))
            .collect();

        for (key, value) in self.observations.iter() {
            let position = self
                .registry
                .position(&key.sensor)
                .ok_or_else(|| SensormeshError::UnknownSensor { sensor: key.sensor.to_string() })?;
            let Some(variable) = self.variables.iter().position(|v| *v == key.variable) else {
                continue;
            };
            if let Some(pool) = pools.get_mut(&key.timestamp) {
                pool[variable].push((position, value));
            }
        }

        for per_variable in pools.values_mut() {
            for pool in per_variable.iter_mut() {
                pool.sort_by_key(|&(position, _)| position);
            }
        }
        Ok(pools)
    }

    fn sensor_rows(
        &self,
        position: usize,
        locations: &[geo::Point<f64>],
        pools: &Pools,
        schema: &FeatureSchema,
    ) -> Partial {
        let sensor = &self.registry.sensors()[position];
        let distances = distances_from(sensor.location, locations);

        let static_cells: Vec<Option<f64>> = self
            .static_tables
            .iter()
            .flat_map(|table| table.cells_or_missing(&sensor.id))
            .collect();

        let mut rows = Vec::with_capacity(pools.len());
        let mut insufficient = BTreeSet::new();

        for (&timestamp, per_variable) in pools {
            let mut cells = vec![None; schema.len()];

            for (variable, pool) in per_variable.iter().enumerate() {
                let mut candidates: Vec<(f64, f64)> = pool
                    .iter()
                    .filter(|&&(other, _)| other != position)
                    .map(|&(other, value)| (distances[other], value))
                    .collect();

                if candidates.len() < self.k {
                    insufficient.insert(timestamp);
                    continue;
                }

                // Stable: equal distances keep registry order
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

                let offset = schema.neighbor_offset(variable);
                for (rank, &(distance, value)) in candidates.iter().take(self.k).enumerate() {
                    cells[offset + rank] = Some(value);
                    cells[offset + self.k + rank] = Some(distance);
                }
            }

            let calendar = calendar_cells(self.granularity, timestamp);
            let calendar_offset = schema.calendar_offset();
            cells[calendar_offset..calendar_offset + calendar.len()].copy_from_slice(&calendar);

            let static_offset = schema.static_offset();
            cells[static_offset..].copy_from_slice(&static_cells);

            rows.push((TrainingKey { sensor: sensor.id.clone(), timestamp }, cells));
        }

        (rows, insufficient)
    }
}
