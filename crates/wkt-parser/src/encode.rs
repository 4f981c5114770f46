//! WKT encoder, the structural inverse of the parser.

use std::fmt::Write;

use crs_common::{AuthorityCode, Axis, Crs, GeodeticDatum, ProjectedCrs, Unit};

/// Encode a CRS as single-line WKT 1.
///
/// Keyword order is fixed and floats use the shortest representation that
/// round-trips, so encoding a parsed CRS and reparsing yields an equal value.
pub fn encode(crs: &Crs) -> String {
    let mut out = String::new();
    write_crs(&mut out, crs);
    out
}

fn write_crs(out: &mut String, crs: &Crs) {
    match crs {
        Crs::Geographic(geo) => {
            write!(out, "GEOGCS[\"{}\",", geo.name).unwrap();
            write_datum(out, &geo.datum);
            write!(
                out,
                ",PRIMEM[\"{}\",{}],",
                geo.datum.prime_meridian.name,
                num(geo.datum.prime_meridian.greenwich_longitude)
            )
            .unwrap();
            write_unit(out, &geo.unit);
            write_axes(out, &geo.axes);
            write_ids(out, &geo.ids);
            out.push(']');
        }
        Crs::Projected(projected) => write_projcs(out, projected),
        Crs::Engineering(local) => {
            write!(
                out,
                "LOCAL_CS[\"{}\",LOCAL_DATUM[\"{}\",0],",
                local.name, local.datum_name
            )
            .unwrap();
            write_unit(out, &local.unit);
            write_axes(out, &local.axes);
            write_ids(out, &local.ids);
            out.push(']');
        }
    }
}

fn write_projcs(out: &mut String, projected: &ProjectedCrs) {
    write!(out, "PROJCS[\"{}\",", projected.name).unwrap();
    write_crs(out, &projected.base);
    write!(out, ",PROJECTION[\"{}\"]", projected.projection.method).unwrap();
    for param in &projected.projection.parameters {
        write!(out, ",PARAMETER[\"{}\",{}]", param.name, num(param.value)).unwrap();
    }
    out.push(',');
    write_unit(out, &projected.unit);
    write_axes(out, &projected.axes);
    write_ids(out, &projected.ids);
    out.push(']');
}

fn write_datum(out: &mut String, datum: &GeodeticDatum) {
    write!(
        out,
        "DATUM[\"{}\",SPHEROID[\"{}\",{},{}]",
        datum.name,
        datum.ellipsoid.name,
        num(datum.ellipsoid.semi_major),
        num(datum.ellipsoid.inverse_flattening)
    )
    .unwrap();
    if let Some(offsets) = &datum.to_wgs84 {
        out.push_str(",TOWGS84[");
        for (i, v) in offsets.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&num(*v));
        }
        out.push(']');
    }
    out.push(']');
}

fn write_unit(out: &mut String, unit: &Unit) {
    write!(out, "UNIT[\"{}\",{}]", unit.name, num(unit.to_base)).unwrap();
}

fn write_axes(out: &mut String, axes: &[Axis]) {
    for axis in axes {
        write!(out, ",AXIS[\"{}\",{}]", axis.name, axis.direction.as_wkt()).unwrap();
    }
}

fn write_ids(out: &mut String, ids: &[AuthorityCode]) {
    for id in ids {
        write!(out, ",AUTHORITY[\"{}\",\"{}\"]", id.authority(), id.code()).unwrap();
    }
}

/// Shortest decimal form that parses back to the identical f64.
fn num(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use crate::{encode, parse};
    use test_utils::fixtures;

    #[test]
    fn round_trip_is_value_equal() {
        for wkt in [
            fixtures::WGS84_WKT,
            fixtures::NAD83_WKT,
            fixtures::ED50_WKT,
            fixtures::UTM10N_WKT,
            fixtures::WEB_MERCATOR_WKT,
            fixtures::LOCAL_WKT,
        ] {
            let first = parse(wkt).unwrap();
            let encoded = encode(&first);
            let second = parse(&encoded).unwrap();
            assert_eq!(first, second, "round trip changed value for {encoded}");
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let crs = parse(fixtures::UTM10N_WKT).unwrap();
        assert_eq!(encode(&crs), encode(&crs));
    }

    #[test]
    fn float_formatting_preserves_precision() {
        let crs = parse(fixtures::WGS84_WKT).unwrap();
        let encoded = encode(&crs);
        assert!(encoded.contains("298.257223563"));
        assert!(encoded.contains("0.0174532925199433"));
    }
}
