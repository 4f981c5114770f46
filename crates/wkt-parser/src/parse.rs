//! Recursive-descent WKT parser.

use std::sync::Arc;

use crs_common::{
    AuthorityCode, Axis, AxisDirection, Crs, Ellipsoid, EngineeringCrs, GeodeticDatum,
    GeographicCrs, ParseError, PrimeMeridian, ProjectedCrs, Projection, ProjectionParam, Unit,
    UnitKind,
};

use crate::token::{tokenize, Token, TokenKind};

/// Parse a WKT 1 CRS definition.
pub fn parse(text: &str) -> Result<Crs, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        src_len: text.len(),
    };
    let crs = match parser.peek_keyword() {
        Some("GEOGCS") => Crs::Geographic(parser.parse_geogcs()?),
        Some("PROJCS") => Crs::Projected(parser.parse_projcs()?),
        Some("LOCAL_CS") => Crs::Engineering(parser.parse_local_cs()?),
        _ => {
            return Err(parser.error("expected GEOGCS, PROJCS, or LOCAL_CS"));
        }
    };
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing content after CRS element"));
    }
    Ok(crs)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    src_len: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(t) => ParseError::new(message, t.raw.clone(), t.offset),
            None => ParseError::new(message, "<end of input>", self.src_len),
        }
    }

    fn next(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_keyword(&self) -> Option<&str> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(k)) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Consume the expected element keyword (already matched by the caller).
    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        match self.peek_keyword() {
            Some(k) if k.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(format!("expected {keyword}"))),
        }
    }

    fn expect_open(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Open) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error("expected '['")),
        }
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Close) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error("expected ']'")),
        }
    }

    fn expect_comma(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Comma) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error("expected ','")),
        }
    }

    fn accept_comma(&mut self) -> bool {
        if matches!(self.peek_kind(), Some(TokenKind::Comma)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next_text(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Text(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.error("expected a quoted string")),
        }
    }

    fn next_number(&mut self) -> Result<f64, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Number(v)) => {
                let v = *v;
                self.pos += 1;
                Ok(v)
            }
            _ => Err(self.error("expected a number")),
        }
    }

    fn next_bare_keyword(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Keyword(k)) => {
                let k = k.clone();
                self.pos += 1;
                Ok(k)
            }
            _ => Err(self.error("expected a bare keyword")),
        }
    }

    fn parse_geogcs(&mut self) -> Result<GeographicCrs, ParseError> {
        self.expect_keyword("GEOGCS")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let datum = self.parse_datum()?;
        self.expect_comma()?;
        let prime_meridian = self.parse_primem()?;
        self.expect_comma()?;
        let unit = self.parse_unit(UnitKind::Angular)?;

        let mut axes = Vec::new();
        let mut ids = Vec::new();
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AXIS") => axes.push(self.parse_axis(&unit)?),
                Some("AUTHORITY") => ids.push(self.parse_authority()?),
                _ => return Err(self.error("unexpected element in GEOGCS")),
            }
        }
        self.expect_close()?;

        if axes.is_empty() {
            // WKT 1 default for geographic systems is longitude first.
            axes = vec![
                Axis::new("Longitude", AxisDirection::East, unit.clone()),
                Axis::new("Latitude", AxisDirection::North, unit.clone()),
            ];
        }

        Ok(GeographicCrs {
            name,
            datum: GeodeticDatum {
                prime_meridian,
                ..datum
            },
            unit,
            axes,
            ids,
        })
    }

    fn parse_projcs(&mut self) -> Result<ProjectedCrs, ParseError> {
        self.expect_keyword("PROJCS")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let base = Crs::Geographic(self.parse_geogcs()?);
        self.expect_comma()?;
        let method = self.parse_projection()?;

        let mut parameters = Vec::new();
        let mut unit = None;
        let mut axes = Vec::new();
        let mut ids = Vec::new();
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("PARAMETER") => parameters.push(self.parse_parameter()?),
                Some("UNIT") => unit = Some(self.parse_unit(UnitKind::Linear)?),
                Some("AXIS") => {
                    let u = unit.clone().unwrap_or_else(Unit::metre);
                    axes.push(self.parse_axis(&u)?);
                }
                Some("AUTHORITY") => ids.push(self.parse_authority()?),
                _ => return Err(self.error("unexpected element in PROJCS")),
            }
        }
        let unit = unit.ok_or_else(|| self.error("PROJCS is missing its UNIT"))?;
        self.expect_close()?;

        if axes.is_empty() {
            axes = vec![
                Axis::new("Easting", AxisDirection::East, unit.clone()),
                Axis::new("Northing", AxisDirection::North, unit.clone()),
            ];
        }

        Ok(ProjectedCrs {
            name,
            base: Arc::new(base),
            projection: Projection {
                method,
                parameters,
            },
            unit,
            axes,
            ids,
        })
    }

    fn parse_local_cs(&mut self) -> Result<EngineeringCrs, ParseError> {
        self.expect_keyword("LOCAL_CS")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let datum_name = self.parse_local_datum()?;
        self.expect_comma()?;
        let unit = self.parse_unit(UnitKind::Linear)?;

        let mut axes = Vec::new();
        let mut ids = Vec::new();
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AXIS") => axes.push(self.parse_axis(&unit)?),
                Some("AUTHORITY") => ids.push(self.parse_authority()?),
                _ => return Err(self.error("unexpected element in LOCAL_CS")),
            }
        }
        self.expect_close()?;

        if axes.is_empty() {
            axes = vec![
                Axis::new("X", AxisDirection::East, unit.clone()),
                Axis::new("Y", AxisDirection::North, unit.clone()),
            ];
        }

        Ok(EngineeringCrs {
            name,
            datum_name,
            unit,
            axes,
            ids,
        })
    }

    fn parse_local_datum(&mut self) -> Result<String, ParseError> {
        self.expect_keyword("LOCAL_DATUM")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        // Datum type code, kept only for grammar compatibility.
        let _ = self.next_number()?;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in LOCAL_DATUM")),
            }
        }
        self.expect_close()?;
        Ok(name)
    }

    /// DATUM with its SPHEROID and optional TOWGS84. The prime meridian is
    /// filled in by the caller, since WKT places PRIMEM outside DATUM.
    fn parse_datum(&mut self) -> Result<GeodeticDatum, ParseError> {
        self.expect_keyword("DATUM")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let ellipsoid = self.parse_spheroid()?;

        let mut to_wgs84 = None;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("TOWGS84") => to_wgs84 = Some(self.parse_towgs84()?),
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in DATUM")),
            }
        }
        self.expect_close()?;

        Ok(GeodeticDatum {
            name,
            ellipsoid,
            prime_meridian: PrimeMeridian::greenwich(),
            to_wgs84,
            anchor: None,
        })
    }

    fn parse_spheroid(&mut self) -> Result<Ellipsoid, ParseError> {
        match self.peek_keyword() {
            Some(k) if k.eq_ignore_ascii_case("SPHEROID") || k.eq_ignore_ascii_case("ELLIPSOID") => {
                self.pos += 1;
            }
            _ => return Err(self.error("expected SPHEROID")),
        }
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let semi_major = self.next_number()?;
        self.expect_comma()?;
        let inverse_flattening = self.next_number()?;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in SPHEROID")),
            }
        }
        self.expect_close()?;
        Ok(Ellipsoid {
            name,
            semi_major,
            inverse_flattening,
        })
    }

    fn parse_towgs84(&mut self) -> Result<Vec<f64>, ParseError> {
        self.expect_keyword("TOWGS84")?;
        self.expect_open()?;
        let mut offsets = vec![self.next_number()?];
        while self.accept_comma() {
            offsets.push(self.next_number()?);
        }
        self.expect_close()?;
        if offsets.len() != 3 && offsets.len() != 7 {
            return Err(self.error(format!(
                "TOWGS84 takes 3 or 7 values, found {}",
                offsets.len()
            )));
        }
        Ok(offsets)
    }

    fn parse_primem(&mut self) -> Result<PrimeMeridian, ParseError> {
        self.expect_keyword("PRIMEM")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let greenwich_longitude = self.next_number()?;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in PRIMEM")),
            }
        }
        self.expect_close()?;
        Ok(PrimeMeridian {
            name,
            greenwich_longitude,
        })
    }

    fn parse_unit(&mut self, kind: UnitKind) -> Result<Unit, ParseError> {
        self.expect_keyword("UNIT")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let to_base = self.next_number()?;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in UNIT")),
            }
        }
        self.expect_close()?;
        Ok(Unit::new(name, kind, to_base))
    }

    fn parse_axis(&mut self, unit: &Unit) -> Result<Axis, ParseError> {
        self.expect_keyword("AXIS")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let direction = AxisDirection::from_wkt(&self.next_bare_keyword()?);
        self.expect_close()?;
        Ok(Axis::new(name, direction, unit.clone()))
    }

    fn parse_projection(&mut self) -> Result<String, ParseError> {
        self.expect_keyword("PROJECTION")?;
        self.expect_open()?;
        let method = self.next_text()?;
        while self.accept_comma() {
            match self.peek_keyword() {
                Some("AUTHORITY") => {
                    let _ = self.parse_authority()?;
                }
                _ => return Err(self.error("unexpected element in PROJECTION")),
            }
        }
        self.expect_close()?;
        Ok(method)
    }

    fn parse_parameter(&mut self) -> Result<ProjectionParam, ParseError> {
        self.expect_keyword("PARAMETER")?;
        self.expect_open()?;
        let name = self.next_text()?;
        self.expect_comma()?;
        let value = self.next_number()?;
        self.expect_close()?;
        Ok(ProjectionParam { name, value })
    }

    fn parse_authority(&mut self) -> Result<AuthorityCode, ParseError> {
        self.expect_keyword("AUTHORITY")?;
        self.expect_open()?;
        let authority = self.next_text()?;
        self.expect_comma()?;
        let code = self.next_text()?;
        self.expect_close()?;
        AuthorityCode::new(&authority, &code)
            .map_err(|e| self.error(format!("invalid AUTHORITY element: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_common::CrsKind;
    use test_utils::fixtures;

    #[test]
    fn parses_wgs84() {
        let crs = parse(fixtures::WGS84_WKT).unwrap();
        assert_eq!(crs.kind(), CrsKind::Geographic);
        assert_eq!(crs.name(), "WGS 84");

        let geo = crs.as_geographic().unwrap();
        assert_eq!(geo.datum.ellipsoid.semi_major, 6_378_137.0);
        assert_eq!(geo.datum.ellipsoid.inverse_flattening, 298.257223563);
        assert!(crs.axis_order_is_lat_lon());
        assert_eq!(
            crs.identifier("EPSG").map(|id| id.code()),
            Some("4326")
        );
    }

    #[test]
    fn parses_utm_zone_10n() {
        let crs = parse(fixtures::UTM10N_WKT).unwrap();
        let projected = crs.as_projected().unwrap();
        assert_eq!(projected.projection.method, "Transverse_Mercator");
        assert_eq!(projected.projection.parameter("central_meridian"), Some(-123.0));
        assert_eq!(projected.projection.parameter("scale_factor"), Some(0.9996));
        assert_eq!(projected.unit, Unit::metre());
        assert!(projected.base.is_geographic());
    }

    #[test]
    fn parses_towgs84_offsets() {
        let crs = parse(fixtures::ED50_WKT).unwrap();
        let datum = crs.geodetic_datum().unwrap();
        assert_eq!(datum.wgs84_translation(), Some([-87.0, -98.0, -121.0]));
    }

    #[test]
    fn parses_local_cs() {
        let crs = parse(fixtures::LOCAL_WKT).unwrap();
        assert_eq!(crs.kind(), CrsKind::Engineering);
    }

    #[test]
    fn missing_axes_default_to_lon_lat() {
        let crs = parse(
            r#"GEOGCS["bare",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#,
        )
        .unwrap();
        assert!(!crs.axis_order_is_lat_lon());
        assert_eq!(crs.axes().len(), 2);
    }

    #[test]
    fn arity_mismatch_reports_offset() {
        let src = fixtures::broken::MISSING_ARITY;
        let err = parse(src).unwrap_err();
        // Fails at the ']' where the longitude should have been.
        assert_eq!(err.fragment, "]");
        assert_eq!(err.offset, src.find("\"]").map(|i| i + 1).unwrap());
        assert!(err.message.contains("','"));
    }

    #[test]
    fn unknown_keyword_rejected() {
        let err = parse(r#"GEODCRS["x"]"#).unwrap_err();
        assert!(err.message.contains("expected GEOGCS"));
        assert_eq!(err.fragment, "GEODCRS");
    }

    #[test]
    fn trailing_content_rejected() {
        let src = format!("{} junk", fixtures::WGS84_WKT);
        let err = parse(&src).unwrap_err();
        assert!(err.message.contains("trailing"));
    }

    #[test]
    fn towgs84_arity_checked() {
        let err = parse(
            r#"GEOGCS["x",DATUM["d",SPHEROID["s",6378137,298.3],TOWGS84[1,2]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#,
        )
        .unwrap_err();
        assert!(err.message.contains("3 or 7"));
    }
}
