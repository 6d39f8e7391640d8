//! Query-time replay of the training encoding at locations without sensors.
//!
//! Every query point gets, for each tracked variable, the values and
//! distances of its nearest reporting sensors at one fixed timestamp. Query
//! points are never sensors, so nothing is excluded. When too few sensors
//! report a variable the row keeps its width and those cells stay unset;
//! scoring reports such rows instead of guessing.

use chrono::NaiveDateTime;
use geo::Point;
use rayon::prelude::*;
use sensormesh_core::config::EngineConfig;
use sensormesh_core::error::{Result, SensormeshError};
use sensormesh_core::models::{
    CalendarGranularity, FeatureSchema, FeatureTable, Located, ObservationTable, SensorRegistry,
    StaticTable,
};
use sensormesh_geo::distances_from;
use std::sync::Arc;

use crate::calendar::calendar_cells;
use crate::variables::column_labels;

/// Reporting sensors of one variable at the query timestamp
struct Pool {
    locations: Vec<Point<f64>>,
    values: Vec<f64>,
}

pub struct QueryFeatureConstructor<'a> {
    registry: &'a SensorRegistry,
    observations: &'a ObservationTable,
    timestamp: NaiveDateTime,
    variables: Vec<String>,
    k: usize,
    granularity: CalendarGranularity,
    separator: char,
    parallel: bool,
}

impl<'a> QueryFeatureConstructor<'a> {
    pub fn new(
        registry: &'a SensorRegistry,
        observations: &'a ObservationTable,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            registry,
            observations,
            timestamp,
            variables: Vec::new(),
            k: 5,
            granularity: CalendarGranularity::default(),
            separator: '.',
            parallel: true,
        }
    }

    /// Constructor using `query_k` as its neighbour count
    pub fn from_config(
        registry: &'a SensorRegistry,
        observations: &'a ObservationTable,
        timestamp: NaiveDateTime,
        config: &EngineConfig,
    ) -> Self {
        Self::new(registry, observations, timestamp)
            .with_separator(config.variable_separator.value)
            .with_variables(config.variables.value.clone())
            .with_k(config.query_k.value)
            .with_granularity(config.granularity.value)
            .with_parallel(config.parallel.value)
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Tracked variables. Observations are looked up by the full label; the
    /// columns use the part before the first separator (`NO2.ugm3` -> `NO2`).
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = variables;
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

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Schema of the rows this constructor emits, given the static columns
    pub fn schema(&self, static_columns: &[String]) -> FeatureSchema {
        let columns = column_labels(&self.variables, self.separator);
        FeatureSchema::new(&columns, self.k, self.granularity, static_columns)
    }

    /// One row per query point; static cells are taken from `statics` by the
    /// point's identity
    pub fn construct<L>(
        &self,
        points: &[L],
        statics: &StaticTable<L::Id>,
    ) -> Result<FeatureTable<L::Id>>
    where
        L: Located + Sync,
    {
        if self.k == 0 {
            return Err(SensormeshError::ConfigInvalid {
                key: "query_k".to_string(),
                reason: "neighbour count must be at least 1".to_string(),
            });
        }

        let schema = Arc::new(self.schema(statics.columns()));
        let pools = self.pools()?;
        for (variable, pool) in self.variables.iter().zip(&pools) {
            if pool.values.len() < self.k {
                tracing::debug!(
                    variable = %variable,
                    available = pool.values.len(),
                    k = self.k,
                    "Too few reporting sensors; query cells left unset"
                );
            }
        }
        let calendar = calendar_cells(self.granularity, self.timestamp);

        let compute = |point: &L| -> (L::Id, Vec<Option<f64>>) {
            let mut cells = vec![None; schema.len()];

            for (variable, pool) in pools.iter().enumerate() {
                if pool.values.len() < self.k {
                    continue;
                }
                let distances = distances_from(point.location(), &pool.locations);
                let mut ranked: Vec<usize> = (0..distances.len()).collect();
                ranked.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));

                let offset = schema.neighbor_offset(variable);
                for (rank, &i) in ranked.iter().take(self.k).enumerate() {
                    cells[offset + rank] = Some(pool.values[i]);
                    cells[offset + self.k + rank] = Some(distances[i]);
                }
            }

            let calendar_offset = schema.calendar_offset();
            cells[calendar_offset..calendar_offset + calendar.len()].copy_from_slice(&calendar);
            let id = point.id();
            cells[schema.static_offset()..].copy_from_slice(&statics.cells_or_missing(&id));
            (id, cells)
        };

        let rows: Vec<(L::Id, Vec<Option<f64>>)> = if self.parallel {
            points.par_iter().map(compute).collect()
        } else {
            points.iter().map(compute).collect()
        };

        let mut table = FeatureTable::new(Arc::clone(&schema));
        for (id, cells) in rows {
            table.push(id, cells)?;
        }

        tracing::info!(
            points = table.len(),
            timestamp = %self.timestamp,
            "Constructed query features"
        );
        Ok(table)
    }

    fn pools(&self) -> Result<Vec<Pool>> {
        self.variables
            .iter()
            .map(|variable| -> Result<Pool> {
                let mut reporting = Vec::new();
                for (key, value) in self.observations.for_variable(variable) {
                    if key.timestamp != self.timestamp {
                        continue;
                    }
                    let position = self.registry.position(&key.sensor).ok_or_else(|| {
                        SensormeshError::UnknownSensor { sensor: key.sensor.to_string() }
                    })?;
                    reporting.push((position, value));
                }
                reporting.sort_by_key(|&(position, _)| position);

                let sensors = self.registry.sensors();
                Ok(Pool {
                    locations: reporting.iter().map(|&(p, _)| sensors[p].location).collect(),
                    values: reporting.iter().map(|&(_, v)| v).collect(),
                })
            })
            .collect()
    }
}
