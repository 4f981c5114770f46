//! Bounded, unit-aware parameter model.
//!
//! Descriptors declare a name, a typed default, optional [min, max] bounds,
//! a unit, and a multiplicity. Values bind a descriptor to a concrete value
//! and validate type and bounds at the moment of the set, never later at
//! transform-build time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

use crate::unit::Unit;

/// A parameter value violates its descriptor's bounds or type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value for parameter '{parameter}': {message}")]
pub struct InvalidParameterValue {
    pub parameter: String,
    pub message: String,
}

impl InvalidParameterValue {
    fn new(parameter: &str, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Double(f64),
    Integer(i64),
    Text(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Double(_) => "double",
            ParamValue::Integer(_) => "integer",
            ParamValue::Text(_) => "text",
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Double(v) => Some(*v),
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Double(v) => write!(f, "{v}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Declares a named, typed, bounded parameter.
///
/// Equality and hashing are structural (name, bounds, unit, multiplicity)
/// so identical descriptors built by independent factories deduplicate.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub default: ParamValue,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub unit: Option<Unit>,
    pub min_occurs: u32,
    pub max_occurs: u32,
}

impl ParameterDescriptor {
    /// A required double-valued parameter with optional bounds.
    pub fn new(
        name: impl Into<String>,
        default: f64,
        minimum: Option<f64>,
        maximum: Option<f64>,
        unit: Option<Unit>,
    ) -> Self {
        Self {
            name: name.into(),
            default: ParamValue::Double(default),
            minimum,
            maximum,
            unit,
            min_occurs: 1,
            max_occurs: 1,
        }
    }

    /// An integer-valued parameter with optional bounds.
    pub fn integer(
        name: impl Into<String>,
        default: i64,
        minimum: Option<i64>,
        maximum: Option<i64>,
    ) -> Self {
        Self {
            name: name.into(),
            default: ParamValue::Integer(default),
            minimum: minimum.map(|v| v as f64),
            maximum: maximum.map(|v| v as f64),
            unit: None,
            min_occurs: 1,
            max_occurs: 1,
        }
    }

    /// A free-text parameter.
    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: ParamValue::Text(default.into()),
            minimum: None,
            maximum: None,
            unit: None,
            min_occurs: 1,
            max_occurs: 1,
        }
    }

    /// Override the multiplicity (`min_occurs`/`max_occurs`).
    pub fn with_occurrence(mut self, min_occurs: u32, max_occurs: u32) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    /// True if this parameter may be omitted entirely.
    pub fn is_optional(&self) -> bool {
        self.min_occurs == 0
    }

    /// Create a value bound to this descriptor's default.
    pub fn create_value(self: &Arc<Self>) -> ParameterValue {
        ParameterValue {
            descriptor: Arc::clone(self),
            value: self.default.clone(),
        }
    }

    fn validate(&self, value: &ParamValue) -> Result<(), InvalidParameterValue> {
        if std::mem::discriminant(value) != std::mem::discriminant(&self.default) {
            return Err(InvalidParameterValue::new(
                &self.name,
                format!(
                    "expected {} but got {} ({value})",
                    self.default.type_name(),
                    value.type_name()
                ),
            ));
        }
        if let Some(v) = value.numeric() {
            if !v.is_finite() {
                return Err(InvalidParameterValue::new(&self.name, format!("{v} is not finite")));
            }
            if let Some(min) = self.minimum {
                if v < min {
                    return Err(InvalidParameterValue::new(
                        &self.name,
                        format!("{v} is below the minimum {min}"),
                    ));
                }
            }
            if let Some(max) = self.maximum {
                if v > max {
                    return Err(InvalidParameterValue::new(
                        &self.name,
                        format!("{v} is above the maximum {max}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for ParameterDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.minimum.map(f64::to_bits) == other.minimum.map(f64::to_bits)
            && self.maximum.map(f64::to_bits) == other.maximum.map(f64::to_bits)
            && self.unit == other.unit
            && self.min_occurs == other.min_occurs
            && self.max_occurs == other.max_occurs
    }
}

impl Eq for ParameterDescriptor {}

impl Hash for ParameterDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.name.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        self.minimum.map(f64::to_bits).hash(state);
        self.maximum.map(f64::to_bits).hash(state);
        self.unit.hash(state);
        self.min_occurs.hash(state);
        self.max_occurs.hash(state);
    }
}

/// A descriptor bound to a concrete, validated value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    descriptor: Arc<ParameterDescriptor>,
    value: ParamValue,
}

impl ParameterValue {
    pub fn descriptor(&self) -> &Arc<ParameterDescriptor> {
        &self.descriptor
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Set a double value. Fails immediately on a type or bounds violation.
    pub fn set(&mut self, value: f64) -> Result<(), InvalidParameterValue> {
        self.set_value(ParamValue::Double(value))
    }

    /// Set a typed value. Fails immediately on a type or bounds violation.
    pub fn set_value(&mut self, value: ParamValue) -> Result<(), InvalidParameterValue> {
        self.descriptor.validate(&value)?;
        self.value = value;
        Ok(())
    }

    /// The numeric value, converted to the given unit if both declare one.
    pub fn double_in(&self, target: &Unit) -> Result<f64, InvalidParameterValue> {
        let v = self.double()?;
        match &self.descriptor.unit {
            Some(unit) => unit
                .convert(v, target)
                .map_err(|e| InvalidParameterValue::new(&self.descriptor.name, e.to_string())),
            None => Ok(v),
        }
    }

    pub fn double(&self) -> Result<f64, InvalidParameterValue> {
        self.value.numeric().ok_or_else(|| {
            InvalidParameterValue::new(
                &self.descriptor.name,
                format!("'{}' is not numeric", self.value),
            )
        })
    }
}

/// Aggregates descriptors with its own multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptorGroup {
    pub name: String,
    pub min_occurs: u32,
    pub max_occurs: u32,
    pub members: Vec<Arc<ParameterDescriptor>>,
}

impl ParameterDescriptorGroup {
    pub fn new(name: impl Into<String>, members: Vec<Arc<ParameterDescriptor>>) -> Self {
        Self {
            name: name.into(),
            min_occurs: 1,
            max_occurs: 1,
            members,
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<ParameterDescriptor>> {
        self.members
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Recursively build a value tree, each member bound to its default.
    pub fn create_value(self: &Arc<Self>) -> ParameterValueGroup {
        ParameterValueGroup {
            descriptor: Arc::clone(self),
            values: self.members.iter().map(|d| d.create_value()).collect(),
        }
    }
}

/// A value tree for a descriptor group.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValueGroup {
    descriptor: Arc<ParameterDescriptorGroup>,
    values: Vec<ParameterValue>,
}

impl ParameterValueGroup {
    pub fn descriptor(&self) -> &Arc<ParameterDescriptorGroup> {
        &self.descriptor
    }

    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values
            .iter()
            .find(|v| v.descriptor.name.eq_ignore_ascii_case(name))
    }

    /// Set a member by name. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), InvalidParameterValue> {
        let member = self
            .values
            .iter_mut()
            .find(|v| v.descriptor.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                InvalidParameterValue::new(name, "no such parameter in this group".to_string())
            })?;
        member.set(value)
    }

    /// Numeric value of a member, converted to the given unit.
    pub fn double_in(&self, name: &str, target: &Unit) -> Result<f64, InvalidParameterValue> {
        self.get(name)
            .ok_or_else(|| InvalidParameterValue::new(name, "no such parameter in this group"))?
            .double_in(target)
    }

    pub fn double(&self, name: &str) -> Result<f64, InvalidParameterValue> {
        self.get(name)
            .ok_or_else(|| InvalidParameterValue::new(name, "no such parameter in this group"))?
            .double()
    }
}
