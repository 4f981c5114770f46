//! Geodetic datums: ellipsoids, prime meridians, WGS84 offsets.

use serde::{Deserialize, Serialize};

/// Reference ellipsoid defined by semi-major axis and inverse flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub name: String,
    /// Semi-major axis in metres.
    pub semi_major: f64,
    /// Inverse flattening (1/f). Zero means a sphere.
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub fn new(name: impl Into<String>, semi_major: f64, inverse_flattening: f64) -> Self {
        Self {
            name: name.into(),
            semi_major,
            inverse_flattening,
        }
    }

    pub fn wgs84() -> Self {
        Self::new("WGS 84", 6_378_137.0, 298.257223563)
    }

    pub fn grs80() -> Self {
        Self::new("GRS 1980", 6_378_137.0, 298.257222101)
    }

    /// Flattening f.
    pub fn flattening(&self) -> f64 {
        if self.inverse_flattening == 0.0 {
            0.0
        } else {
            1.0 / self.inverse_flattening
        }
    }

    /// Semi-minor axis b = a(1 - f).
    pub fn semi_minor(&self) -> f64 {
        self.semi_major * (1.0 - self.flattening())
    }

    /// First eccentricity squared: 2f - f².
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        2.0 * f - f * f
    }

    /// First eccentricity.
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity_squared().sqrt()
    }

    /// Third flattening n = f / (2 - f), used by series expansions.
    pub fn third_flattening(&self) -> f64 {
        let f = self.flattening();
        f / (2.0 - f)
    }
}

/// Prime meridian with its longitude relative to Greenwich, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimeMeridian {
    pub name: String,
    pub greenwich_longitude: f64,
}

impl PrimeMeridian {
    pub fn new(name: impl Into<String>, greenwich_longitude: f64) -> Self {
        Self {
            name: name.into(),
            greenwich_longitude,
        }
    }

    pub fn greenwich() -> Self {
        Self::new("Greenwich", 0.0)
    }
}

/// The reference frame a geographic CRS is anchored to.
///
/// `to_wgs84` holds the Helmert offsets from a TOWGS84 element when the
/// definition declares them: 3 translations, optionally followed by 3
/// rotations and a scale. Absent offsets stay `None`, never default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeodeticDatum {
    pub name: String,
    pub ellipsoid: Ellipsoid,
    pub prime_meridian: PrimeMeridian,
    pub to_wgs84: Option<Vec<f64>>,
    pub anchor: Option<String>,
}

impl GeodeticDatum {
    pub fn new(name: impl Into<String>, ellipsoid: Ellipsoid, prime_meridian: PrimeMeridian) -> Self {
        Self {
            name: name.into(),
            ellipsoid,
            prime_meridian,
            to_wgs84: None,
            anchor: None,
        }
    }

    pub fn with_to_wgs84(mut self, offsets: Vec<f64>) -> Self {
        self.to_wgs84 = Some(offsets);
        self
    }

    pub fn wgs84() -> Self {
        Self::new("WGS_1984", Ellipsoid::wgs84(), PrimeMeridian::greenwich())
    }

    /// The translation part of the WGS84 offsets, if declared.
    pub fn wgs84_translation(&self) -> Option<[f64; 3]> {
        self.to_wgs84
            .as_ref()
            .filter(|v| v.len() >= 3)
            .map(|v| [v[0], v[1], v[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wgs84_derived_constants() {
        let e = Ellipsoid::wgs84();
        assert_relative_eq!(e.semi_minor(), 6_356_752.314_245_179, epsilon = 1e-3);
        assert_relative_eq!(e.eccentricity(), 0.081_819_190_842_622, epsilon = 1e-12);
        assert_relative_eq!(e.third_flattening(), 0.001_679_220_386_383_705, epsilon = 1e-12);
    }

    #[test]
    fn sphere_has_zero_eccentricity() {
        let sphere = Ellipsoid::new("sphere", 6_371_000.0, 0.0);
        assert_eq!(sphere.eccentricity_squared(), 0.0);
        assert_eq!(sphere.semi_minor(), 6_371_000.0);
    }

    #[test]
    fn translation_requires_three_offsets() {
        let datum = GeodeticDatum::wgs84().with_to_wgs84(vec![-87.0, -98.0, -121.0]);
        assert_eq!(datum.wgs84_translation(), Some([-87.0, -98.0, -121.0]));

        let bare = GeodeticDatum::wgs84();
        assert_eq!(bare.wgs84_translation(), None);
    }
}
