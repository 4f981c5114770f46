//! Coordinate system axes.

use serde::{Deserialize, Serialize};

use crate::unit::Unit;

/// Direction of increasing coordinate values along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Other,
}

impl AxisDirection {
    /// Parse the bare keyword used in WKT AXIS elements.
    pub fn from_wkt(text: &str) -> Self {
        match text.to_ascii_uppercase().as_str() {
            "NORTH" => AxisDirection::North,
            "SOUTH" => AxisDirection::South,
            "EAST" => AxisDirection::East,
            "WEST" => AxisDirection::West,
            "UP" => AxisDirection::Up,
            "DOWN" => AxisDirection::Down,
            _ => AxisDirection::Other,
        }
    }

    pub fn as_wkt(&self) -> &'static str {
        match self {
            AxisDirection::North => "NORTH",
            AxisDirection::South => "SOUTH",
            AxisDirection::East => "EAST",
            AxisDirection::West => "WEST",
            AxisDirection::Up => "UP",
            AxisDirection::Down => "DOWN",
            AxisDirection::Other => "OTHER",
        }
    }

    /// True for the north/south pair, i.e. a latitude-like or northing axis.
    pub fn is_meridional(&self) -> bool {
        matches!(self, AxisDirection::North | AxisDirection::South)
    }
}

/// A single coordinate system axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub direction: AxisDirection,
    pub unit: Unit,
}

impl Axis {
    pub fn new(name: impl Into<String>, direction: AxisDirection, unit: Unit) -> Self {
        Self {
            name: name.into(),
            direction,
            unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_keywords_round_trip() {
        for dir in [
            AxisDirection::North,
            AxisDirection::South,
            AxisDirection::East,
            AxisDirection::West,
            AxisDirection::Up,
            AxisDirection::Down,
        ] {
            assert_eq!(AxisDirection::from_wkt(dir.as_wkt()), dir);
        }
        assert_eq!(AxisDirection::from_wkt("GEOCENTRIC_X"), AxisDirection::Other);
    }

    #[test]
    fn meridional_detection() {
        assert!(AxisDirection::North.is_meridional());
        assert!(AxisDirection::South.is_meridional());
        assert!(!AxisDirection::East.is_meridional());
    }
}
