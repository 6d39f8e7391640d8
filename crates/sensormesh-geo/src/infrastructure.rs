//! Inverse-distance features against categorised infrastructure layers.
//!
//! For every location and every requested category the feature is
//! `1 / distance` to the nearest object of that category. Linear categories
//! also match their link variant (`primary` covers `primary_link`); point
//! categories match exactly. A category with no objects yields a missing
//! cell rather than zero.

use rayon::prelude::*;
use sensormesh_core::config::EngineConfig;
use sensormesh_core::error::Result;
use sensormesh_core::models::{InfrastructureLayer, Located, StaticTable};

use crate::index::ProximityIndex;
use crate::proximity::distance_to_object;

/// How the nearest object of a category is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NearestStrategy {
    /// R-tree over the category's segments
    #[default]
    Indexed,
    /// Scan every object of the category
    Exhaustive,
}

/// Objects backing one output column
struct CategoryTarget<'a> {
    layer: &'a InfrastructureLayer,
    members: Vec<usize>,
    index: Option<ProximityIndex>,
}

impl CategoryTarget<'_> {
    fn nearest_distance(&self, point: geo::Point<f64>) -> Option<f64> {
        if self.members.is_empty() {
            return None;
        }
        match &self.index {
            Some(index) => index.nearest_distance([point.x(), point.y()]),
            None => self
                .members
                .iter()
                .map(|&i| distance_to_object(point, &self.layer.objects()[i].geometry))
                .reduce(f64::min),
        }
    }
}

/// Computes infrastructure proximity features for any set of locations
pub struct InfrastructureExtractor<'a> {
    lines: &'a InfrastructureLayer,
    points: &'a InfrastructureLayer,
    line_categories: Vec<String>,
    point_categories: Vec<String>,
    link_suffix: String,
    strategy: NearestStrategy,
    parallel: bool,
}

impl<'a> InfrastructureExtractor<'a> {
    /// Create an extractor over a linear and a point layer
    pub fn new(lines: &'a InfrastructureLayer, points: &'a InfrastructureLayer) -> Self {
        Self {
            lines,
            points,
            line_categories: Vec::new(),
            point_categories: Vec::new(),
            link_suffix: "_link".to_string(),
            strategy: NearestStrategy::default(),
            parallel: true,
        }
    }

    /// Create an extractor with categories and flags taken from configuration
    pub fn from_config(
        lines: &'a InfrastructureLayer,
        points: &'a InfrastructureLayer,
        config: &EngineConfig,
    ) -> Self {
        Self::new(lines, points)
            .with_line_categories(config.line_categories.value.clone())
            .with_point_categories(config.point_categories.value.clone())
            .with_link_suffix(config.link_suffix.value.clone())
            .with_parallel(config.parallel.value)
    }

    pub fn with_line_categories(mut self, categories: Vec<String>) -> Self {
        self.line_categories = categories;
        self
    }

    pub fn with_point_categories(mut self, categories: Vec<String>) -> Self {
        self.point_categories = categories;
        self
    }

    pub fn with_link_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.link_suffix = suffix.into();
        self
    }

    pub fn with_strategy(mut self, strategy: NearestStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Output columns: linear categories then point categories
    pub fn columns(&self) -> Vec<String> {
        self.line_categories.iter().chain(self.point_categories.iter()).cloned().collect()
    }

    /// One row per location, keyed by the location's identity
    pub fn extract<L>(&self, locations: &[L]) -> Result<StaticTable<L::Id>>
    where
        L: Located + Sync,
    {
        let targets = self.targets();

        let compute = |location: &L| -> (L::Id, Vec<Option<f64>>) {
            let point = location.location();
            let cells = targets
                .iter()
                .map(|target| target.nearest_distance(point).map(|d| 1.0 / d))
                .collect();
            (location.id(), cells)
        };

        let rows: Vec<(L::Id, Vec<Option<f64>>)> = if self.parallel {
            locations.par_iter().map(compute).collect()
        } else {
            locations.iter().map(compute).collect()
        };

        let mut table = StaticTable::new(self.columns());
        for (id, cells) in rows {
            table.insert(id, cells)?;
        }

        tracing::info!(
            locations = table.len(),
            columns = table.columns().len(),
            "Computed infrastructure proximity features"
        );
        Ok(table)
    }

    fn targets(&self) -> Vec<CategoryTarget<'a>> {
        let mut targets = Vec::with_capacity(self.line_categories.len() + self.point_categories.len());

        for category in &self.line_categories {
            let link = format!("{}{}", category, self.link_suffix);
            let members = self.lines.positions_matching(|c| c == category || c == link);
            targets.push(self.target(category, self.lines, members));
        }
        for category in &self.point_categories {
            let members = self.points.positions_matching(|c| c == category);
            targets.push(self.target(category, self.points, members));
        }

        targets
    }

    fn target(
        &self,
        category: &str,
        layer: &'a InfrastructureLayer,
        members: Vec<usize>,
    ) -> CategoryTarget<'a> {
        if members.is_empty() {
            tracing::warn!(category, "No infrastructure objects of this category; feature will be missing");
        }
        let index = match self.strategy {
            NearestStrategy::Indexed => Some(ProximityIndex::from_objects(
                members.iter().map(|&i| (i, &layer.objects()[i])),
            )),
            NearestStrategy::Exhaustive => None,
        };
        CategoryTarget { layer, members, index }
    }
}
