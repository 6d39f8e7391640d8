use geo::Point;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Anything with a stable identity and a position in the projected plane.
///
/// Sensors and mesh cells both implement this, so proximity features and
/// validity masks can be computed for either without duplicating code.
pub trait Located {
    type Id: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync;

    fn id(&self) -> Self::Id;

    fn location(&self) -> Point<f64>;
}
