//! Common types shared across all crs-engine crates.

pub mod authority_code;
pub mod axis;
pub mod crs;
pub mod datum;
pub mod error;
pub mod param;
pub mod unit;

pub use authority_code::AuthorityCode;
pub use axis::{Axis, AxisDirection};
pub use crs::{Crs, CrsKind, EngineeringCrs, GeographicCrs, ProjectedCrs, Projection, ProjectionParam};
pub use datum::{Ellipsoid, GeodeticDatum, PrimeMeridian};
pub use error::{CrsError, CrsResult, FactoryError, ParseError};
pub use param::{
    InvalidParameterValue, ParamValue, ParameterDescriptor, ParameterDescriptorGroup,
    ParameterValue, ParameterValueGroup,
};
pub use unit::{Unit, UnitKind};
