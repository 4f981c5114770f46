//! Coordinate Reference System model.
//!
//! A closed set of tagged variants rather than an open type hierarchy:
//! each variant carries only the fields relevant to its kind. Values are
//! immutable once constructed and shared via `Arc`; a projected CRS holds
//! a reference to its base geographic CRS, never a copy.

use std::sync::Arc;

use crate::authority_code::AuthorityCode;
use crate::axis::Axis;
use crate::datum::GeodeticDatum;
use crate::unit::Unit;

/// Discriminant for the CRS variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsKind {
    Geographic,
    Projected,
    Engineering,
}

/// A geographic (lat/lon) CRS: datum, angular unit, ordered axes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCrs {
    pub name: String,
    pub datum: GeodeticDatum,
    pub unit: Unit,
    pub axes: Vec<Axis>,
    pub ids: Vec<AuthorityCode>,
}

/// A single named projection parameter as it appears in a CRS definition.
///
/// Stored raw here; bounds validation happens when the transform resolver
/// binds these into an operation method's descriptor group.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParam {
    pub name: String,
    pub value: f64,
}

impl ProjectionParam {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The projection step of a projected CRS: an operation method name plus
/// its parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub method: String,
    pub parameters: Vec<ProjectionParam>,
}

impl Projection {
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value)
    }
}

/// A projected CRS referencing its base geographic CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCrs {
    pub name: String,
    /// Base geographic CRS, shared not copied. Always `Crs::Geographic`.
    pub base: Arc<Crs>,
    pub projection: Projection,
    pub unit: Unit,
    pub axes: Vec<Axis>,
    pub ids: Vec<AuthorityCode>,
}

/// An engineering (local) CRS with no geodetic anchoring.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeringCrs {
    pub name: String,
    pub datum_name: String,
    pub unit: Unit,
    pub axes: Vec<Axis>,
    pub ids: Vec<AuthorityCode>,
}

/// A Coordinate Reference System.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    Geographic(GeographicCrs),
    Projected(ProjectedCrs),
    Engineering(EngineeringCrs),
}

impl Crs {
    pub fn kind(&self) -> CrsKind {
        match self {
            Crs::Geographic(_) => CrsKind::Geographic,
            Crs::Projected(_) => CrsKind::Projected,
            Crs::Engineering(_) => CrsKind::Engineering,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Crs::Geographic(c) => &c.name,
            Crs::Projected(c) => &c.name,
            Crs::Engineering(c) => &c.name,
        }
    }

    pub fn ids(&self) -> &[AuthorityCode] {
        match self {
            Crs::Geographic(c) => &c.ids,
            Crs::Projected(c) => &c.ids,
            Crs::Engineering(c) => &c.ids,
        }
    }

    pub fn axes(&self) -> &[Axis] {
        match self {
            Crs::Geographic(c) => &c.axes,
            Crs::Projected(c) => &c.axes,
            Crs::Engineering(c) => &c.axes,
        }
    }

    /// The unit of the horizontal axes: angular for geographic, linear
    /// for projected and engineering systems.
    pub fn unit(&self) -> &Unit {
        match self {
            Crs::Geographic(c) => &c.unit,
            Crs::Projected(c) => &c.unit,
            Crs::Engineering(c) => &c.unit,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(_))
    }

    pub fn as_geographic(&self) -> Option<&GeographicCrs> {
        match self {
            Crs::Geographic(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_projected(&self) -> Option<&ProjectedCrs> {
        match self {
            Crs::Projected(c) => Some(c),
            _ => None,
        }
    }

    /// Base geographic CRS for derived systems.
    pub fn base(&self) -> Option<&Arc<Crs>> {
        match self {
            Crs::Projected(c) => Some(&c.base),
            _ => None,
        }
    }

    /// The geodetic datum this CRS is anchored to, following the base
    /// reference for projected systems.
    pub fn geodetic_datum(&self) -> Option<&GeodeticDatum> {
        match self {
            Crs::Geographic(c) => Some(&c.datum),
            Crs::Projected(c) => c.base.geodetic_datum(),
            Crs::Engineering(_) => None,
        }
    }

    /// Identifier under the given authority, if this CRS carries one.
    pub fn identifier(&self, authority: &str) -> Option<&AuthorityCode> {
        self.ids()
            .iter()
            .find(|id| id.authority().eq_ignore_ascii_case(authority))
    }

    /// True when the first axis is latitude-like (north/south), meaning
    /// coordinate tuples lead with the meridional component.
    pub fn axis_order_is_lat_lon(&self) -> bool {
        self.axes()
            .first()
            .map(|a| a.direction.is_meridional())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisDirection;

    fn wgs84() -> Crs {
        Crs::Geographic(GeographicCrs {
            name: "WGS 84".into(),
            datum: GeodeticDatum::wgs84(),
            unit: Unit::degree(),
            axes: vec![
                Axis::new("Latitude", AxisDirection::North, Unit::degree()),
                Axis::new("Longitude", AxisDirection::East, Unit::degree()),
            ],
            ids: vec![AuthorityCode::new("EPSG", "4326").unwrap()],
        })
    }

    #[test]
    fn projected_shares_base_by_reference() {
        let base = Arc::new(wgs84());
        let projected = Crs::Projected(ProjectedCrs {
            name: "WGS 84 / UTM zone 10N".into(),
            base: Arc::clone(&base),
            projection: Projection {
                method: "Transverse_Mercator".into(),
                parameters: vec![ProjectionParam::new("central_meridian", -123.0)],
            },
            unit: Unit::metre(),
            axes: vec![
                Axis::new("Easting", AxisDirection::East, Unit::metre()),
                Axis::new("Northing", AxisDirection::North, Unit::metre()),
            ],
            ids: vec![],
        });

        let held = projected.base().unwrap();
        assert!(Arc::ptr_eq(held, &base));
        assert_eq!(projected.geodetic_datum(), base.geodetic_datum());
    }

    #[test]
    fn identifier_lookup_is_case_insensitive() {
        let crs = wgs84();
        assert!(crs.identifier("epsg").is_some());
        assert!(crs.identifier("POSTGIS").is_none());
    }

    #[test]
    fn axis_order_detection() {
        let crs = wgs84();
        assert!(crs.axis_order_is_lat_lon());
    }
}
