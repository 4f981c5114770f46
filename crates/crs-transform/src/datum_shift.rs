//! Geocentric-translation datum shift (three-parameter Helmert).
//!
//! Geodetic lon/lat on the source ellipsoid goes through geocentric
//! cartesian coordinates, gets translated by the delta between the two
//! datums' WGS84 offsets, and comes back to geodetic on the target
//! ellipsoid. Heights are not carried; points are taken on the
//! ellipsoid surface.

use crs_common::Ellipsoid;

use crate::transform::{MathTransform, TransformError};

pub struct GeocentricShift {
    source: EllipsoidConstants,
    target: EllipsoidConstants,
    /// Source-frame minus target-frame WGS84 translations, in metres.
    delta: [f64; 3],
    label: String,
}

struct EllipsoidConstants {
    semi_major: f64,
    e2: f64,
}

impl From<&Ellipsoid> for EllipsoidConstants {
    fn from(e: &Ellipsoid) -> Self {
        Self {
            semi_major: e.semi_major,
            e2: e.eccentricity_squared(),
        }
    }
}

impl GeocentricShift {
    pub fn new(
        source: &Ellipsoid,
        target: &Ellipsoid,
        delta: [f64; 3],
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            delta,
            label: label.into(),
        }
    }

    /// Geodetic (radians, zero height) to geocentric cartesian.
    fn to_geocentric(e: &EllipsoidConstants, lon: f64, lat: f64) -> [f64; 3] {
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let nu = e.semi_major / (1.0 - e.e2 * sin_lat * sin_lat).sqrt();
        [
            nu * cos_lat * lon.cos(),
            nu * cos_lat * lon.sin(),
            nu * (1.0 - e.e2) * sin_lat,
        ]
    }

    /// Geocentric cartesian back to geodetic, iterating the latitude.
    fn to_geodetic(e: &EllipsoidConstants, xyz: [f64; 3]) -> (f64, f64) {
        let [x, y, z] = xyz;
        let lon = y.atan2(x);
        let p = (x * x + y * y).sqrt();
        let mut lat = z.atan2(p * (1.0 - e.e2));
        for _ in 0..10 {
            let sin_lat = lat.sin();
            let nu = e.semi_major / (1.0 - e.e2 * sin_lat * sin_lat).sqrt();
            let next = (z + e.e2 * nu * sin_lat).atan2(p);
            if (next - lat).abs() < 1e-13 {
                lat = next;
                break;
            }
            lat = next;
        }
        (lon, lat)
    }
}

impl MathTransform for GeocentricShift {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        let [lon, lat] = point;
        if !lon.is_finite() || !lat.is_finite() {
            return Err(TransformError::NonFinite { x: lon, y: lat });
        }
        let xyz = Self::to_geocentric(&self.source, lon, lat);
        let shifted = [
            xyz[0] + self.delta[0],
            xyz[1] + self.delta[1],
            xyz[2] + self.delta[2],
        ];
        let (lon, lat) = Self::to_geodetic(&self.target, shifted);
        Ok([lon, lat])
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("dx".into(), self.delta[0]),
            ("dy".into(), self.delta[1]),
            ("dz".into(), self.delta[2]),
        ]
    }

    fn description(&self) -> String {
        self.label.clone()
    }

    fn is_identity(&self) -> bool {
        self.delta == [0.0, 0.0, 0.0] && self.source.semi_major == self.target.semi_major
            && self.source.e2 == self.target.e2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_delta_same_ellipsoid_is_identity() {
        let wgs84 = Ellipsoid::wgs84();
        let shift = GeocentricShift::new(&wgs84, &wgs84, [0.0, 0.0, 0.0], "null shift");
        assert!(shift.is_identity());
        let [lon, lat] = shift
            .transform([0.2, 0.9])
            .unwrap();
        assert_relative_eq!(lon, 0.2, epsilon = 1e-12);
        assert_relative_eq!(lat, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn ed50_shift_moves_points_the_expected_distance() {
        // ED50 to WGS84 in central Europe moves positions roughly
        // 100-200 metres, which is a few arc seconds.
        let intl = Ellipsoid::new("International 1924", 6_378_388.0, 297.0);
        let wgs84 = Ellipsoid::wgs84();
        let shift = GeocentricShift::new(&intl, &wgs84, [-87.0, -98.0, -121.0], "ED50 to WGS84");

        let lon = 9.0_f64.to_radians();
        let lat = 48.0_f64.to_radians();
        let [lon2, lat2] = shift.transform([lon, lat]).unwrap();

        let dlat_sec = (lat2 - lat).to_degrees() * 3600.0;
        let dlon_sec = (lon2 - lon).to_degrees() * 3600.0;
        assert!(dlat_sec.abs() > 1.0 && dlat_sec.abs() < 10.0, "dlat = {dlat_sec}\"");
        assert!(dlon_sec.abs() > 1.0 && dlon_sec.abs() < 10.0, "dlon = {dlon_sec}\"");
    }

    #[test]
    fn shift_inverts_with_negated_delta() {
        let intl = Ellipsoid::new("International 1924", 6_378_388.0, 297.0);
        let wgs84 = Ellipsoid::wgs84();
        let forward = GeocentricShift::new(&intl, &wgs84, [-87.0, -98.0, -121.0], "fwd");
        let back = GeocentricShift::new(&wgs84, &intl, [87.0, 98.0, 121.0], "back");

        let start = [9.0_f64.to_radians(), 48.0_f64.to_radians()];
        let mid = forward.transform(start).unwrap();
        let end = back.transform(mid).unwrap();
        // Heights are dropped at each leg, so the round trip closes to
        // roughly a nanoradian, not machine precision.
        assert_relative_eq!(end[0], start[0], epsilon = 1e-9);
        assert_relative_eq!(end[1], start[1], epsilon = 1e-9);
    }

    #[test]
    fn geocentric_round_trip_is_tight() {
        let wgs84 = EllipsoidConstants::from(&Ellipsoid::wgs84());
        let lon = (-122.0_f64).to_radians();
        let lat = 37.0_f64.to_radians();
        let xyz = GeocentricShift::to_geocentric(&wgs84, lon, lat);
        let (lon2, lat2) = GeocentricShift::to_geodetic(&wgs84, xyz);
        assert_relative_eq!(lon2, lon, epsilon = 1e-12);
        assert_relative_eq!(lat2, lat, epsilon = 1e-12);
    }
}
