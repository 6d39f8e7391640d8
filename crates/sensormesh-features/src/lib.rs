//! Sensormesh Features - Training and query-time feature encoders
//!
//! The k-NN builder turns sparse observations into fixed-width training rows
//! and a filtered target table; the query constructor replays the same
//! encoding at mesh cells so a trained regressor can score them directly.

pub mod align;
pub mod builder;
pub mod calendar;
pub mod persist;
pub mod query;
pub mod scoring;
pub mod variables;

pub use align::{align, TrainingSet};
pub use builder::{BuildOutput, KnnFeatureBuilder};
pub use calendar::calendar_cells;
pub use persist::{read_features, read_targets, write_features, write_targets};
pub use query::QueryFeatureConstructor;
pub use scoring::ScoringMatrix;
pub use variables::normalize_variable;
