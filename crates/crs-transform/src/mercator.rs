//! Mercator variants: ellipsoidal one-standard-parallel and the
//! spherical Web Mercator used by EPSG:3857.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crs_common::Ellipsoid;

use crate::transform::{ProjectionMath, TransformError};

/// Isometric latitude function t(φ) for the ellipsoid.
fn tsfn(phi: f64, e: f64) -> f64 {
    let con = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - con) / (1.0 + con)).powf(e / 2.0)
}

/// Invert t(φ) by fixed-point iteration.
fn phi_from_ts(ts: f64, e: f64) -> f64 {
    let half_e = e / 2.0;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..15 {
        let con = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - con) / (1.0 + con)).powf(half_e)).atan();
        if (next - phi).abs() < 1e-12 {
            return next;
        }
        phi = next;
    }
    phi
}

/// Ellipsoidal Mercator with a scale factor at the equator
/// (Mercator_1SP).
pub struct Mercator {
    semi_major: f64,
    eccentricity: f64,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    /// Poleward of this the isometric latitude blows up.
    max_lat: f64,
}

impl Mercator {
    pub fn new(
        ellipsoid: &Ellipsoid,
        central_meridian: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            semi_major: ellipsoid.semi_major,
            eccentricity: ellipsoid.eccentricity(),
            lon0: central_meridian,
            k0: scale_factor,
            false_easting,
            false_northing,
            max_lat: 89.5_f64.to_radians(),
        }
    }
}

impl ProjectionMath for Mercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        if lat.abs() > self.max_lat {
            return Err(TransformError::OutOfDomain {
                operation: "Mercator_1SP".into(),
                x: lon,
                y: lat,
            });
        }
        let x = self.semi_major * self.k0 * (lon - self.lon0) + self.false_easting;
        let y = self.semi_major * self.k0 * (-tsfn(lat, self.eccentricity).ln())
            + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let lon = self.lon0 + (x - self.false_easting) / (self.semi_major * self.k0);
        let ts = (-(y - self.false_northing) / (self.semi_major * self.k0)).exp();
        let lat = phi_from_ts(ts, self.eccentricity);
        Ok((lon, lat))
    }

    fn method_name(&self) -> &str {
        "Mercator_1SP"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("central_meridian".into(), self.lon0.to_degrees()),
            ("scale_factor".into(), self.k0),
            ("false_easting".into(), self.false_easting),
            ("false_northing".into(), self.false_northing),
        ]
    }
}

/// Web Mercator (EPSG:3857): spherical formulas on the ellipsoid's
/// semi-major axis, latitude clamped to the square.
pub struct WebMercator {
    radius: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

/// atan(sinh(π)), about 85.0511°.
const WEB_MERCATOR_MAX_LAT: f64 = 1.4844222297453324;

impl WebMercator {
    pub fn new(
        ellipsoid: &Ellipsoid,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            radius: ellipsoid.semi_major,
            lon0: central_meridian,
            false_easting,
            false_northing,
        }
    }
}

impl ProjectionMath for WebMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
        let x = self.radius * (lon - self.lon0) + self.false_easting;
        let y = self.radius * (FRAC_PI_4 + lat / 2.0).tan().ln() + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let lon = self.lon0 + (x - self.false_easting) / self.radius;
        let lat = 2.0 * ((y - self.false_northing) / self.radius).exp().atan() - FRAC_PI_2;
        Ok((lon, lat))
    }

    fn method_name(&self) -> &str {
        "Popular Visualisation Pseudo Mercator"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("central_meridian".into(), self.lon0.to_degrees()),
            ("false_easting".into(), self.false_easting),
            ("false_northing".into(), self.false_northing),
        ]
    }
}
