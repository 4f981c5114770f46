//! Units of measure for axes and parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Broad unit category. Conversion is only defined within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Base unit: radian.
    Angular,
    /// Base unit: metre.
    Linear,
    /// Base unit: unity (dimensionless).
    Scale,
}

/// A unit of measure with its factor to the kind's base unit.
///
/// Names are labels only; equality and hashing use the kind and the exact
/// factor bits, so two independently parsed "degree" units compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub kind: UnitKind,
    /// Multiply a value in this unit by this factor to reach the base unit.
    pub to_base: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot convert {from} ({from_kind:?}) to {to} ({to_kind:?})")]
pub struct IncompatibleUnits {
    pub from: String,
    pub from_kind: UnitKind,
    pub to: String,
    pub to_kind: UnitKind,
}

impl Unit {
    pub fn new(name: impl Into<String>, kind: UnitKind, to_base: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            to_base,
        }
    }

    pub fn degree() -> Self {
        // EPSG:9122 factor, as written in WKT the world over.
        Self::new("degree", UnitKind::Angular, 0.0174532925199433)
    }

    pub fn radian() -> Self {
        Self::new("radian", UnitKind::Angular, 1.0)
    }

    pub fn metre() -> Self {
        Self::new("metre", UnitKind::Linear, 1.0)
    }

    pub fn foot() -> Self {
        Self::new("foot", UnitKind::Linear, 0.3048)
    }

    pub fn unity() -> Self {
        Self::new("unity", UnitKind::Scale, 1.0)
    }

    /// Convert a value in this unit to `target`. Fails across kinds.
    pub fn convert(&self, value: f64, target: &Unit) -> Result<f64, IncompatibleUnits> {
        if self.kind != target.kind {
            return Err(IncompatibleUnits {
                from: self.name.clone(),
                from_kind: self.kind,
                to: target.name.clone(),
                to_kind: target.kind,
            });
        }
        Ok(value * self.to_base / target.to_base)
    }

    /// True for the base unit of its kind (factor exactly 1).
    pub fn is_base(&self) -> bool {
        self.to_base == 1.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.to_base.to_bits() == other.to_base.to_bits()
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.to_base.to_bits().hash(state);
    }
}
