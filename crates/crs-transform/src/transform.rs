//! The math-transform contract and the structural transforms.
//!
//! A `MathTransform` maps 2-D coordinate tuples. Projections implement
//! the lower-level `ProjectionMath` pair (forward/inverse in radians and
//! metres) and are lifted into the transform contract by
//! `ProjectionStep`, so one projection object serves both directions.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A coordinate could not be mapped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Coordinate ({x}, {y}) is outside the domain of {operation}")]
    OutOfDomain { operation: String, x: f64, y: f64 },

    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

/// Maps 2-D coordinates from a source CRS to a target CRS.
pub trait MathTransform: Send + Sync {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError>;

    /// Transform a batch in place, stopping at the first failure.
    fn transform_batch(&self, points: &mut [[f64; 2]]) -> Result<(), TransformError> {
        for point in points.iter_mut() {
            *point = self.transform(*point)?;
        }
        Ok(())
    }

    /// The bound operation parameters, empty for structural steps.
    fn parameters(&self) -> Vec<(String, f64)> {
        Vec::new()
    }

    fn description(&self) -> String;

    fn is_identity(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn MathTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MathTransform({})", self.description())
    }
}

/// Projection math in normalized terms: geographic input is lon/lat in
/// radians (lon first), projected output is easting/northing in metres.
pub trait ProjectionMath: Send + Sync {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError>;
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError>;
    fn method_name(&self) -> &str;
    fn parameters(&self) -> Vec<(String, f64)>;
}

/// The do-nothing transform for structurally equal endpoints.
pub struct Identity;

impl MathTransform for Identity {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        Ok(point)
    }

    fn description(&self) -> String {
        "identity".into()
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Swaps the two ordinates, for lat/lon vs lon/lat axis order.
pub struct AxisSwap;

impl MathTransform for AxisSwap {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        Ok([point[1], point[0]])
    }

    fn description(&self) -> String {
        "axis swap".into()
    }
}

/// Multiplies both ordinates by a factor; unit conversion as a pipeline
/// step.
pub struct UnitScale {
    factor: f64,
    label: String,
}

impl UnitScale {
    pub fn new(factor: f64, label: impl Into<String>) -> Self {
        Self {
            factor,
            label: label.into(),
        }
    }
}

impl MathTransform for UnitScale {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        Ok([point[0] * self.factor, point[1] * self.factor])
    }

    fn description(&self) -> String {
        self.label.clone()
    }

    fn is_identity(&self) -> bool {
        self.factor == 1.0
    }
}

/// Direction through a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// Lifts a `ProjectionMath` into the transform contract in one
/// direction.
pub struct ProjectionStep {
    math: Arc<dyn ProjectionMath>,
    direction: Direction,
}

impl ProjectionStep {
    pub fn forward(math: Arc<dyn ProjectionMath>) -> Self {
        Self {
            math,
            direction: Direction::Forward,
        }
    }

    pub fn inverse(math: Arc<dyn ProjectionMath>) -> Self {
        Self {
            math,
            direction: Direction::Inverse,
        }
    }
}

impl MathTransform for ProjectionStep {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        if !point[0].is_finite() || !point[1].is_finite() {
            return Err(TransformError::NonFinite {
                x: point[0],
                y: point[1],
            });
        }
        let (a, b) = match self.direction {
            Direction::Forward => self.math.forward(point[0], point[1])?,
            Direction::Inverse => self.math.inverse(point[0], point[1])?,
        };
        Ok([a, b])
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        self.math.parameters()
    }

    fn description(&self) -> String {
        match self.direction {
            Direction::Forward => self.math.method_name().to_string(),
            Direction::Inverse => format!("inverse {}", self.math.method_name()),
        }
    }
}

/// Applies a sequence of transforms in order.
pub struct ConcatenatedTransform {
    steps: Vec<Box<dyn MathTransform>>,
}

impl ConcatenatedTransform {
    /// Compose steps, dropping identities. Zero surviving steps
    /// collapse to an identity, one to itself.
    pub fn compose(steps: Vec<Box<dyn MathTransform>>) -> Box<dyn MathTransform> {
        let mut kept: Vec<Box<dyn MathTransform>> = steps
            .into_iter()
            .filter(|s| !s.is_identity())
            .collect();
        match kept.len() {
            0 => Box::new(Identity),
            1 => kept.remove(0),
            _ => Box::new(Self { steps: kept }),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl MathTransform for ConcatenatedTransform {
    fn transform(&self, mut point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        for step in &self.steps {
            point = step.transform(point)?;
        }
        Ok(point)
    }

    /// Union of the steps' parameters, in pipeline order.
    fn parameters(&self) -> Vec<(String, f64)> {
        self.steps.iter().flat_map(|s| s.parameters()).collect()
    }

    fn description(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.description())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        let t = Identity;
        assert_eq!(t.transform([1.5, -2.5]).unwrap(), [1.5, -2.5]);
        assert!(t.is_identity());
    }

    #[test]
    fn axis_swap_swaps() {
        let t = AxisSwap;
        assert_eq!(t.transform([10.0, 52.0]).unwrap(), [52.0, 10.0]);
    }

    #[test]
    fn unit_scale_applies_factor() {
        let t = UnitScale::new(0.3048, "foot to metre");
        let [x, y] = t.transform([1.0, 2.0]).unwrap();
        assert_eq!(x, 0.3048);
        assert_eq!(y, 0.6096);
    }

    #[test]
    fn compose_drops_identities() {
        let composed = ConcatenatedTransform::compose(vec![
            Box::new(Identity),
            Box::new(AxisSwap),
            Box::new(UnitScale::new(1.0, "noop")),
        ]);
        // Only the swap survives, so the composite IS the swap.
        assert_eq!(composed.description(), "axis swap");
    }

    #[test]
    fn compose_of_identities_is_identity() {
        let composed = ConcatenatedTransform::compose(vec![
            Box::new(Identity),
            Box::new(UnitScale::new(1.0, "noop")),
        ]);
        assert!(composed.is_identity());
    }

    #[test]
    fn batch_transform_applies_each_point() {
        let t = UnitScale::new(2.0, "double");
        let mut points = [[1.0, 1.0], [2.0, 3.0]];
        t.transform_batch(&mut points).unwrap();
        assert_eq!(points, [[2.0, 2.0], [4.0, 6.0]]);
    }
}
