//! Transverse Mercator, Krüger n-series to 6th order.
//!
//! Karney's (2011) formulation: geodetic latitude is carried to the
//! conformal sphere through the tangent, the series in the third
//! flattening n maps between conformal and rectifying coordinates, and
//! the inverse recovers the geodetic tangent by Newton iteration. This
//! is the method behind every UTM zone.

use crs_common::Ellipsoid;

use crate::transform::{ProjectionMath, TransformError};

pub struct TransverseMercator {
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    eccentricity: f64,
    e2: f64,
    /// Rectifying radius: a/(1+n) · (1 + n²/4 + n⁴/64).
    rectifying_radius: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    /// Rectifying latitude of the latitude of origin.
    xi0: f64,
}

impl TransverseMercator {
    /// Angles in radians, lengths in metres.
    pub fn new(
        ellipsoid: &Ellipsoid,
        central_meridian: f64,
        latitude_of_origin: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.third_flattening();
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying_radius =
            ellipsoid.semi_major / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0);

        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1983433.0 / 1935360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4
                + 15061.0 / 26880.0 * n5
                + 167603.0 / 181440.0 * n6,
            49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
            34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
            212378941.0 / 319334400.0 * n6,
        ];
        let beta = [
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604800.0 * n6,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1118711.0 / 3870720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
            4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
            20648693.0 / 638668800.0 * n6,
        ];

        Self {
            lon0: central_meridian,
            k0: scale_factor,
            false_easting,
            false_northing,
            eccentricity: ellipsoid.eccentricity(),
            e2: ellipsoid.eccentricity_squared(),
            rectifying_radius,
            alpha,
            beta,
            xi0: Self::rectifying_latitude(latitude_of_origin, n),
        }
    }

    /// Normalized meridional arc to latitude phi, in powers of n.
    fn rectifying_latitude(phi: f64, n: f64) -> f64 {
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;

        let a2 = -3.0 / 2.0 * n + 9.0 / 16.0 * n3;
        let a4 = 15.0 / 16.0 * n2 - 15.0 / 32.0 * n4;
        let a6 = -35.0 / 48.0 * n3;
        let a8 = 315.0 / 512.0 * n4;

        phi + a2 * (2.0 * phi).sin()
            + a4 * (4.0 * phi).sin()
            + a6 * (6.0 * phi).sin()
            + a8 * (8.0 * phi).sin()
    }

    /// Geodetic tangent to conformal tangent.
    fn conformal_tangent(&self, tau: f64) -> f64 {
        let e = self.eccentricity;
        let sec = (1.0 + tau * tau).sqrt();
        let sigma = (e * (e * tau / sec).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * sec
    }

    /// Conformal tangent back to geodetic tangent, Newton iteration.
    fn geodetic_tangent(&self, tau_prime: f64) -> f64 {
        let e = self.eccentricity;
        let mut tau = tau_prime;
        for _ in 0..15 {
            let sec = (1.0 + tau * tau).sqrt();
            let sigma = (e * (e * tau / sec).atanh()).sinh();
            let estimate = tau * (1.0 + sigma * sigma).sqrt() - sigma * sec;
            let dtau = (tau_prime - estimate) * (1.0 + (1.0 - self.e2) * tau * tau)
                / ((1.0 - self.e2) * sec * (1.0 + estimate * estimate).sqrt());
            tau += dtau;
            if dtau.abs() < 1e-12 * (1.0 + tau.abs()) {
                break;
            }
        }
        tau
    }
}

impl ProjectionMath for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
        let dlam = lon - self.lon0;
        if dlam.abs() > std::f64::consts::FRAC_PI_2 {
            return Err(TransformError::OutOfDomain {
                operation: "Transverse_Mercator".into(),
                x: lon,
                y: lat,
            });
        }

        let tau_prime = self.conformal_tangent(lat.tan());
        let xi_prime = tau_prime.atan2(dlam.cos());
        let eta_prime =
            (dlam.sin() / (tau_prime * tau_prime + dlam.cos() * dlam.cos()).sqrt()).asinh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, &a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let x = self.k0 * self.rectifying_radius * eta + self.false_easting;
        let y = self.k0 * self.rectifying_radius * (xi - self.xi0) + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
        let eta = (x - self.false_easting) / (self.k0 * self.rectifying_radius);
        let xi = (y - self.false_northing) / (self.k0 * self.rectifying_radius) + self.xi0;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, &b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_prime.sinh();
        let cos_xi = xi_prime.cos();
        let tau_prime = xi_prime.sin() / (sinh_eta * sinh_eta + cos_xi * cos_xi).sqrt();
        let tau = self.geodetic_tangent(tau_prime);

        let lon = self.lon0 + sinh_eta.atan2(cos_xi);
        let lat = tau.atan();
        Ok((lon, lat))
    }

    fn method_name(&self) -> &str {
        "Transverse_Mercator"
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn utm_zone(zone: u8) -> TransverseMercator {
        let cm = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();
        TransverseMercator::new(&Ellipsoid::wgs84(), cm, 0.0, 0.9996, 500_000.0, 0.0)
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let tm = utm_zone(33);
        let (e, _) = tm
            .forward(15.0_f64.to_radians(), 45.0_f64.to_radians())
            .unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 0.01);
    }

    #[test]
    fn zone_33_reference_point() {
        // (15°E, 52°N) sits on the zone 33 central meridian.
        let tm = utm_zone(33);
        let (e, n) = tm
            .forward(15.0_f64.to_radians(), 52.0_f64.to_radians())
            .unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 1.0);
        assert!(n > 5_760_000.0 && n < 5_762_000.0, "northing = {n}");
    }

    #[test]
    fn round_trips_across_the_zone() {
        let tm = utm_zone(33);
        let cases: &[(f64, f64)] = &[
            (15.0, 52.0),
            (12.0, 50.0),
            (18.0, 50.0),
            (15.0, 0.0),
            (15.0, 80.0),
            (13.5, 52.5),
        ];
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let (x, y) = tm.forward(lon, lat).unwrap();
            let (lon2, lat2) = tm.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-9);
            assert_relative_eq!(lat2, lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn round_trips_in_zone_10() {
        let tm = utm_zone(10);
        let lon = (-122.3_f64).to_radians();
        let lat = 47.6_f64.to_radians();
        let (x, y) = tm.forward(lon, lat).unwrap();
        let (lon2, lat2) = tm.inverse(x, y).unwrap();
        assert_relative_eq!(lon2, lon, epsilon = 1e-9);
        assert_relative_eq!(lat2, lat, epsilon = 1e-9);
    }

    #[test]
    fn far_longitude_is_out_of_domain() {
        let tm = utm_zone(33);
        let result = tm.forward(120.0_f64.to_radians(), 0.5);
        assert!(matches!(
            result,
            Err(TransformError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn southern_hemisphere_with_false_northing() {
        let cm = 15.0_f64.to_radians();
        let tm = TransverseMercator::new(
            &Ellipsoid::wgs84(),
            cm,
            0.0,
            0.9996,
            500_000.0,
            10_000_000.0,
        );
        let lon = 15.0_f64.to_radians();
        let lat = (-30.0_f64).to_radians();
        let (x, y) = tm.forward(lon, lat).unwrap();
        assert!(y > 0.0, "southing should stay positive, got {y}");
        let (lon2, lat2) = tm.inverse(x, y).unwrap();
        assert_relative_eq!(lon2, lon, epsilon = 1e-9);
        assert_relative_eq!(lat2, lat, epsilon = 1e-9);
    }

    #[test]
    fn international_1924_ellipsoid_round_trips() {
        let ed50 = Ellipsoid::new("International 1924", 6_378_388.0, 297.0);
        let tm = TransverseMercator::new(
            &ed50,
            9.0_f64.to_radians(),
            0.0,
            0.9996,
            500_000.0,
            0.0,
        );
        let lon = 9.5_f64.to_radians();
        let lat = 48.0_f64.to_radians();
        let (x, y) = tm.forward(lon, lat).unwrap();
        let (lon2, lat2) = tm.inverse(x, y).unwrap();
        assert_relative_eq!(lon2, lon, epsilon = 1e-9);
        assert_relative_eq!(lat2, lat, epsilon = 1e-9);
    }
}
