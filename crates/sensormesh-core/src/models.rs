pub mod geometry;
pub mod infrastructure;
pub mod location;
pub mod mesh;
pub mod observation;
pub mod schema;
pub mod sensor;
pub mod table;

pub use geometry::{validate_line_string, validate_point, ValidationError, ValidationResult};
pub use infrastructure::{InfrastructureGeometry, InfrastructureLayer, InfrastructureObject};
pub use location::Located;
pub use mesh::{CellId, MeshCell};
pub use observation::{Observation, ObservationKey, ObservationTable};
pub use schema::{CalendarField, CalendarGranularity, ColumnKey, FeatureSchema, NeighborRole};
pub use sensor::{Sensor, SensorId, SensorRegistry};
pub use table::{FeatureRow, FeatureTable, StaticTable, TrainingKey};
