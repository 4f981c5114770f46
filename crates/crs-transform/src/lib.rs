//! Coordinate operation methods, projection math, and the transform
//! resolver that composes them into pipelines.

pub mod datum_shift;
pub mod mercator;
pub mod method;
pub mod resolver;
pub mod transform;
pub mod transverse_mercator;

pub use datum_shift::GeocentricShift;
pub use mercator::{Mercator, WebMercator};
pub use method::OperationMethod;
pub use resolver::{find_transform, EngineConfig};
pub use transform::{
    AxisSwap, ConcatenatedTransform, Identity, MathTransform, ProjectionMath, ProjectionStep,
    TransformError, UnitScale,
};
pub use transverse_mercator::TransverseMercator;
