//! Builds transform pipelines between two resolved CRSs.
//!
//! Every pipeline passes through a normalized hub: longitude/latitude
//! in radians, longitude first, referenced to Greenwich, on the
//! endpoint's datum. The source side is normalized into the hub, a
//! datum shift bridges differing datums, and the target side is
//! denormalized out of it. Identities fall out during composition.

use tracing::warn;

use crs_common::{Crs, CrsError, GeodeticDatum, ProjectedCrs, UnitKind};

use crate::datum_shift::GeocentricShift;
use crate::method::OperationMethod;
use crate::transform::{
    AxisSwap, ConcatenatedTransform, Identity, MathTransform, ProjectionStep, TransformError,
    UnitScale,
};

/// Engine-wide behavior switches.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Permit datum changes between datums that declare no WGS84
    /// offsets, treating the shift as null. Off by default: silent
    /// hundred-metre errors are worse than a refusal.
    pub allow_lenient_datum_shift: bool,
}

/// Adds a fixed offset to the first ordinate; prime-meridian rotation.
struct LongitudeOffset {
    offset: f64,
    label: String,
}

impl MathTransform for LongitudeOffset {
    fn transform(&self, point: [f64; 2]) -> Result<[f64; 2], TransformError> {
        Ok([point[0] + self.offset, point[1]])
    }

    fn description(&self) -> String {
        self.label.clone()
    }

    fn is_identity(&self) -> bool {
        self.offset == 0.0
    }
}

fn operation_not_found(source: &Crs, target: &Crs, reason: impl Into<String>) -> CrsError {
    CrsError::OperationNotFound {
        source_crs: source.name().to_string(),
        target_crs: target.name().to_string(),
        reason: reason.into(),
    }
}

/// Resolve a transform from `source` coordinates to `target`
/// coordinates.
pub fn find_transform(
    source: &Crs,
    target: &Crs,
    config: &EngineConfig,
) -> Result<Box<dyn MathTransform>, CrsError> {
    if source == target {
        return Ok(Box::new(Identity));
    }

    match (source, target) {
        (Crs::Engineering(a), Crs::Engineering(b)) => {
            if a.datum_name != b.datum_name {
                return Err(operation_not_found(
                    source,
                    target,
                    format!(
                        "engineering datums '{}' and '{}' have no defined relationship",
                        a.datum_name, b.datum_name
                    ),
                ));
            }
            let factor = a
                .unit
                .convert(1.0, &b.unit)
                .map_err(|e| operation_not_found(source, target, e.to_string()))?;
            Ok(ConcatenatedTransform::compose(vec![Box::new(
                UnitScale::new(factor, format!("{} to {}", a.unit, b.unit)),
            )]))
        }
        (Crs::Engineering(_), _) | (_, Crs::Engineering(_)) => Err(operation_not_found(
            source,
            target,
            "an engineering CRS has no geodetic anchoring",
        )),
        _ => geodetic_pipeline(source, target, config),
    }
}

fn geodetic_pipeline(
    source: &Crs,
    target: &Crs,
    config: &EngineConfig,
) -> Result<Box<dyn MathTransform>, CrsError> {
    let src_datum = source
        .geodetic_datum()
        .ok_or_else(|| operation_not_found(source, target, "source has no geodetic datum"))?;
    let dst_datum = target
        .geodetic_datum()
        .ok_or_else(|| operation_not_found(source, target, "target has no geodetic datum"))?;

    let mut steps = normalize(source, target)?;
    if let Some(shift) = datum_step(src_datum, dst_datum, source, target, config)? {
        steps.push(shift);
    }
    steps.extend(denormalize(source, target)?);
    Ok(ConcatenatedTransform::compose(steps))
}

/// Steps carrying source coordinates into the lon/lat-radian hub.
fn normalize(source: &Crs, target: &Crs) -> Result<Vec<Box<dyn MathTransform>>, CrsError> {
    let mut steps: Vec<Box<dyn MathTransform>> = Vec::new();
    if source.axis_order_is_lat_lon() {
        steps.push(Box::new(AxisSwap));
    }
    match source {
        Crs::Geographic(geo) => {
            steps.push(angular_to_radians(source, target, &geo.unit)?);
            steps.push(prime_meridian_step(&geo.datum, 1.0));
        }
        Crs::Projected(projected) => {
            if projected.unit.kind != UnitKind::Linear {
                return Err(operation_not_found(
                    source,
                    target,
                    format!("projected unit '{}' is not linear", projected.unit),
                ));
            }
            steps.push(Box::new(UnitScale::new(
                projected.unit.to_base,
                format!("{} to metre", projected.unit),
            )));
            let math = projection_math(projected, source, target)?;
            steps.push(Box::new(ProjectionStep::inverse(math)));
            let base_datum = projected
                .base
                .geodetic_datum()
                .ok_or_else(|| operation_not_found(source, target, "projected base has no datum"))?;
            steps.push(prime_meridian_step(base_datum, 1.0));
        }
        Crs::Engineering(_) => unreachable!("engineering handled by the caller"),
    }
    Ok(steps)
}

/// Steps carrying hub coordinates out into the target CRS.
fn denormalize(source: &Crs, target: &Crs) -> Result<Vec<Box<dyn MathTransform>>, CrsError> {
    let mut steps: Vec<Box<dyn MathTransform>> = Vec::new();
    match target {
        Crs::Geographic(geo) => {
            steps.push(prime_meridian_step(&geo.datum, -1.0));
            steps.push(radians_to_angular(source, target, &geo.unit)?);
        }
        Crs::Projected(projected) => {
            let base_datum = projected
                .base
                .geodetic_datum()
                .ok_or_else(|| operation_not_found(source, target, "projected base has no datum"))?;
            steps.push(prime_meridian_step(base_datum, -1.0));
            let math = projection_math(projected, source, target)?;
            steps.push(Box::new(ProjectionStep::forward(math)));
            if projected.unit.kind != UnitKind::Linear {
                return Err(operation_not_found(
                    source,
                    target,
                    format!("projected unit '{}' is not linear", projected.unit),
                ));
            }
            steps.push(Box::new(UnitScale::new(
                1.0 / projected.unit.to_base,
                format!("metre to {}", projected.unit),
            )));
        }
        Crs::Engineering(_) => unreachable!("engineering handled by the caller"),
    }
    if target.axis_order_is_lat_lon() {
        steps.push(Box::new(AxisSwap));
    }
    Ok(steps)
}

fn angular_to_radians(
    source: &Crs,
    target: &Crs,
    unit: &crs_common::Unit,
) -> Result<Box<dyn MathTransform>, CrsError> {
    if unit.kind != UnitKind::Angular {
        return Err(operation_not_found(
            source,
            target,
            format!("geographic unit '{unit}' is not angular"),
        ));
    }
    Ok(Box::new(UnitScale::new(
        unit.to_base,
        format!("{unit} to radian"),
    )))
}

fn radians_to_angular(
    source: &Crs,
    target: &Crs,
    unit: &crs_common::Unit,
) -> Result<Box<dyn MathTransform>, CrsError> {
    if unit.kind != UnitKind::Angular {
        return Err(operation_not_found(
            source,
            target,
            format!("geographic unit '{unit}' is not angular"),
        ));
    }
    Ok(Box::new(UnitScale::new(
        1.0 / unit.to_base,
        format!("radian to {unit}"),
    )))
}

/// Rotate longitudes to (sign = +1) or from (sign = -1) Greenwich.
fn prime_meridian_step(datum: &GeodeticDatum, sign: f64) -> Box<dyn MathTransform> {
    let offset = sign * datum.prime_meridian.greenwich_longitude.to_radians();
    Box::new(LongitudeOffset {
        offset,
        label: format!("prime meridian {}", datum.prime_meridian.name),
    })
}

/// Resolve and bind the projection of a projected CRS.
fn projection_math(
    projected: &ProjectedCrs,
    source: &Crs,
    target: &Crs,
) -> Result<std::sync::Arc<dyn crate::transform::ProjectionMath>, CrsError> {
    let method = OperationMethod::find(&projected.projection.method).ok_or_else(|| {
        operation_not_found(
            source,
            target,
            format!(
                "unsupported operation method '{}'",
                projected.projection.method
            ),
        )
    })?;
    let values = method.bind(&projected.projection.parameters)?;
    let datum = projected
        .base
        .geodetic_datum()
        .ok_or_else(|| operation_not_found(source, target, "projected base has no datum"))?;
    method.instantiate(&datum.ellipsoid, &values)
}

/// Datum bridge, or `None` when both sides share a datum.
fn datum_step(
    src: &GeodeticDatum,
    dst: &GeodeticDatum,
    source: &Crs,
    target: &Crs,
    config: &EngineConfig,
) -> Result<Option<Box<dyn MathTransform>>, CrsError> {
    if src == dst {
        return Ok(None);
    }
    let src_offsets = src.wgs84_translation();
    let dst_offsets = dst.wgs84_translation();
    if src_offsets.is_none() && dst_offsets.is_none() {
        if !config.allow_lenient_datum_shift {
            return Err(operation_not_found(
                source,
                target,
                format!(
                    "neither datum '{}' nor '{}' declares WGS84 offsets",
                    src.name, dst.name
                ),
            ));
        }
        warn!(
            source_datum = %src.name,
            target_datum = %dst.name,
            "assuming a null shift between datums without WGS84 offsets"
        );
    }
    let s = src_offsets.unwrap_or([0.0; 3]);
    let d = dst_offsets.unwrap_or([0.0; 3]);
    let delta = [s[0] - d[0], s[1] - d[1], s[2] - d[2]];
    Ok(Some(Box::new(GeocentricShift::new(
        &src.ellipsoid,
        &dst.ellipsoid,
        delta,
        format!("{} to {}", src.name, dst.name),
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_utils::fixtures;

    fn parse(wkt: &str) -> Crs {
        wkt_parser::parse(wkt).unwrap()
    }

    fn strict() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn equal_endpoints_give_identity() {
        let a = parse(fixtures::WGS84_WKT);
        let b = parse(fixtures::WGS84_WKT);
        let t = find_transform(&a, &b, &strict()).unwrap();
        assert!(t.is_identity());
    }

    #[test]
    fn geographic_to_utm_binds_declared_parameters() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let utm10 = parse(fixtures::UTM10N_WKT);
        let t = find_transform(&wgs84, &utm10, &strict()).unwrap();
        let params = t.parameters();
        let get = |name: &str| {
            params
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v)
                .unwrap()
        };
        assert_relative_eq!(get("central_meridian"), -123.0, epsilon = 1e-9);
        assert_eq!(get("scale_factor"), 0.9996);
    }

    #[test]
    fn geographic_to_utm_projects_lat_lon_input() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let utm10 = parse(fixtures::UTM10N_WKT);
        let t = find_transform(&wgs84, &utm10, &strict()).unwrap();

        // EPSG:4326 leads with latitude.
        let [e, n] = t.transform([47.6, -122.3]).unwrap();
        assert!(e > 500_000.0 && e < 620_000.0, "easting = {e}");
        assert!(n > 5_200_000.0 && n < 5_350_000.0, "northing = {n}");

        // And back.
        let back = find_transform(&utm10, &wgs84, &strict()).unwrap();
        let [lat, lon] = back.transform([e, n]).unwrap();
        assert_relative_eq!(lat, 47.6, epsilon = 1e-8);
        assert_relative_eq!(lon, -122.3, epsilon = 1e-8);
    }

    #[test]
    fn projected_to_projected_reprojects_without_datum_step() {
        let utm33 = parse(fixtures::UTM33N_WKT);
        let utm10 = parse(fixtures::UTM10N_WKT);
        let t = find_transform(&utm33, &utm10, &strict()).unwrap();
        let description = t.description();
        assert!(description.contains("inverse Transverse_Mercator"), "{description}");
        assert!(!description.contains("WGS_1984 to"), "{description}");
    }

    #[test]
    fn web_mercator_round_trip_through_geographic() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let web = parse(fixtures::WEB_MERCATOR_WKT);
        let there = find_transform(&wgs84, &web, &strict()).unwrap();
        let back = find_transform(&web, &wgs84, &strict()).unwrap();

        let [x, y] = there.transform([40.7484, -73.9857]).unwrap();
        assert!(x < 0.0 && y > 0.0);
        let [lat, lon] = back.transform([x, y]).unwrap();
        assert_relative_eq!(lat, 40.7484, epsilon = 1e-9);
        assert_relative_eq!(lon, -73.9857, epsilon = 1e-9);
    }

    #[test]
    fn datum_shift_built_from_declared_offsets() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let ed50 = parse(fixtures::ED50_WKT);
        let t = find_transform(&ed50, &wgs84, &strict()).unwrap();
        assert!(t.description().contains("European_Datum_1950 to WGS_1984"));

        // ED50 positions move on the order of 100 m toward WGS84.
        let [lat, lon] = t.transform([48.0, 9.0]).unwrap();
        assert!((lat - 48.0).abs() > 1e-4 || (lon - 9.0).abs() > 1e-4);
        assert!((lat - 48.0).abs() < 0.01 && (lon - 9.0).abs() < 0.01);
    }

    #[test]
    fn missing_offsets_fail_strict_and_pass_lenient() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let bare = parse(
            "GEOGCS[\"Unanchored\",DATUM[\"Unanchored_Datum\",\
             SPHEROID[\"International 1924\",6378388,297]],\
             PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]",
        );

        let err = find_transform(&bare, &wgs84, &strict()).unwrap_err();
        match err {
            CrsError::OperationNotFound { reason, .. } => {
                assert!(reason.contains("WGS84 offsets"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let lenient = EngineConfig {
            allow_lenient_datum_shift: true,
        };
        let t = find_transform(&bare, &wgs84, &lenient).unwrap();
        // Null translation, but the ellipsoid change still applies.
        // The unanchored CRS declares no axes, so its input is
        // longitude first; WGS 84 output stays latitude first.
        let [lat, lon] = t.transform([9.0, 48.0]).unwrap();
        assert_relative_eq!(lon, 9.0, epsilon = 1e-9);
        assert!((lat - 48.0).abs() < 0.01);
    }

    #[test]
    fn out_of_range_stored_parameter_fails_at_bind() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let bad = parse(
            "PROJCS[\"Broken UTM\",GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",\
             SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],\
             UNIT[\"degree\",0.0174532925199433]],PROJECTION[\"Transverse_Mercator\"],\
             PARAMETER[\"central_meridian\",200],UNIT[\"metre\",1]]",
        );
        let err = find_transform(&wgs84, &bad, &strict()).unwrap_err();
        assert!(matches!(err, CrsError::InvalidParameter(_)));
    }

    #[test]
    fn unsupported_method_reports_operation_not_found() {
        let wgs84 = parse(fixtures::WGS84_WKT);
        let exotic = parse(
            "PROJCS[\"Exotic\",GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",\
             SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],\
             UNIT[\"degree\",0.0174532925199433]],PROJECTION[\"Cassini_Soldner\"],\
             PARAMETER[\"central_meridian\",0],UNIT[\"metre\",1]]",
        );
        let err = find_transform(&wgs84, &exotic, &strict()).unwrap_err();
        match err {
            CrsError::OperationNotFound { reason, .. } => {
                assert!(reason.contains("Cassini_Soldner"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn engineering_to_geodetic_is_refused() {
        let local = parse(fixtures::LOCAL_WKT);
        let wgs84 = parse(fixtures::WGS84_WKT);
        assert!(matches!(
            find_transform(&local, &wgs84, &strict()),
            Err(CrsError::OperationNotFound { .. })
        ));
    }

    #[test]
    fn engineering_unit_conversion() {
        let metres = parse(fixtures::LOCAL_WKT);
        let feet = parse(&fixtures::LOCAL_WKT.replace(
            "UNIT[\"metre\",1]",
            "UNIT[\"foot\",0.3048]",
        ));
        let t = find_transform(&metres, &feet, &strict()).unwrap();
        let [x, _] = t.transform([0.3048, 0.0]).unwrap();
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
    }
}
