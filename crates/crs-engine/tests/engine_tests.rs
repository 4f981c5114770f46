//! End-to-end tests over the engine facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Once};
use std::thread;

use approx::assert_relative_eq;

use crs_engine::{
    AuthorityCode, AuthorityFactory, Citation, Crs, CrsEngine, CrsError, EngineConfig,
    FactoryError, Row, SqlStore, SqlValue, VendorSrsFactory,
};
use test_utils::fixtures;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn engine() -> CrsEngine {
    init_tracing();
    CrsEngine::with_default_factories(EngineConfig::default())
}

#[test]
fn decode_returns_shared_handles() {
    let engine = engine();
    let first = engine.decode("EPSG:4326").unwrap();
    let second = engine.decode("EPSG:4326").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn decoded_wgs84_keeps_declared_shape() {
    let engine = engine();
    let crs = engine.decode("EPSG:4326").unwrap();
    assert!(crs.is_geographic());
    assert!(crs.axis_order_is_lat_lon());
    assert_eq!(crs.identifier("EPSG").map(|id| id.code()), Some("4326"));
    assert_eq!(crs.name(), "WGS 84");
}

#[test]
fn end_to_end_transform_binds_utm_parameters() {
    let engine = engine();
    let wgs84 = engine.decode("EPSG:4326").unwrap();
    let utm10 = engine.decode("EPSG:32610").unwrap();

    let transform = engine.find_transform(&wgs84, &utm10).unwrap();
    let params = transform.parameters();
    let get = |name: &str| {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .unwrap()
    };
    assert_relative_eq!(get("central_meridian"), -123.0, epsilon = 1e-9);
    assert_eq!(get("scale_factor"), 0.9996);

    // Seattle, latitude first per the declared axis order.
    let [easting, northing] = transform.transform([47.6, -122.3]).unwrap();
    assert!(easting > 500_000.0 && easting < 620_000.0, "easting = {easting}");
    assert!(
        northing > 5_200_000.0 && northing < 5_350_000.0,
        "northing = {northing}"
    );
}

#[test]
fn wkt_round_trip_is_value_equal() {
    let engine = engine();
    for wkt in [
        fixtures::WGS84_WKT,
        fixtures::UTM10N_WKT,
        fixtures::ED50_WKT,
        fixtures::LOCAL_WKT,
    ] {
        let parsed = engine.parse_wkt(wkt).unwrap();
        let encoded = engine.encode_wkt(&parsed);
        let reparsed = engine.parse_wkt(&encoded).unwrap();
        assert_eq!(parsed, reparsed, "round trip diverged for {wkt}");
    }
}

#[test]
fn malformed_code_is_not_a_lookup_miss() {
    let engine = engine();
    assert!(matches!(
        engine.decode("4326"),
        Err(CrsError::Factory(FactoryError::MalformedCode(_)))
    ));
}

#[test]
fn unknown_code_reports_consulted_authorities() {
    let engine = engine();
    match engine.decode("EPSG:999999") {
        Err(CrsError::NoSuchAuthorityCode { authorities, .. }) => {
            assert_eq!(authorities, vec!["EPSG".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn failed_lookups_are_cached() {
    let engine = CrsEngine::new(EngineConfig::default());
    let counting = Arc::new(CountingFactory::answering("4326", fixtures::WGS84_WKT));
    engine.register_authority_factory(Arc::clone(&counting) as Arc<dyn AuthorityFactory>, 0);

    for _ in 0..3 {
        assert!(engine.decode("EPSG:77777").is_err());
    }
    // One consultation; the cached error served the rest.
    assert_eq!(counting.calls(), 1);
}

#[test]
fn reset_cache_forces_fresh_resolution() {
    let engine = CrsEngine::new(EngineConfig::default());
    let counting = Arc::new(CountingFactory::answering("4326", fixtures::WGS84_WKT));
    engine.register_authority_factory(Arc::clone(&counting) as Arc<dyn AuthorityFactory>, 0);

    engine.decode("EPSG:4326").unwrap();
    engine.decode("EPSG:4326").unwrap();
    assert_eq!(counting.calls(), 1);

    engine.reset_cache();
    engine.decode("EPSG:4326").unwrap();
    assert_eq!(counting.calls(), 2);

    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 1);
}

#[test]
fn higher_priority_factory_shadows_bundled_table() {
    let engine = engine();
    // The bundled table spells EPSG:4326 "WGS 84"; this factory
    // disagrees and outranks it.
    let custom = Arc::new(CountingFactory::answering(
        "4326",
        &fixtures::WGS84_WKT.replace("\"WGS 84\"", "\"Custom WGS 84\""),
    ));
    engine.register_authority_factory(custom, 20);

    let crs = engine.decode("EPSG:4326").unwrap();
    assert_eq!(crs.name(), "Custom WGS 84");
}

#[test]
fn concurrent_decodes_resolve_once() {
    let engine = Arc::new(CrsEngine::new(EngineConfig::default()));
    let counting = Arc::new(CountingFactory::answering("32610", fixtures::UTM10N_WKT));
    engine.register_authority_factory(Arc::clone(&counting) as Arc<dyn AuthorityFactory>, 0);

    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.decode("EPSG:32610").unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<Crs>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counting.calls(), 1);
    for pair in results.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

#[test]
fn decode_stress_over_a_shared_code_pool() {
    let engine = Arc::new(engine());
    let codes = ["EPSG:4326", "EPSG:4269", "EPSG:32610", "EPSG:32633", "EPSG:3857"];
    let threads = 32;
    let iterations = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..iterations {
                    let code = codes[(t + i) % codes.len()];
                    let crs = engine.decode(code).unwrap();
                    assert!(!crs.name().is_empty());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.cache_stats();
    // Each distinct code resolved at most once.
    assert_eq!(stats.entries, codes.len());
    assert_eq!(stats.misses as usize, codes.len());
}

#[test]
fn vendor_fallback_bridges_a_store_outage() {
    let engine = CrsEngine::new(EngineConfig::default());
    let bundled = Arc::new(crs_engine::BundledFactory::new());
    let vendor = VendorSrsFactory::new("POSTGIS", Arc::new(FailingStore)).with_fallback(bundled);
    engine.register_authority_factory(Arc::new(vendor), 10);

    let crs = engine.decode("POSTGIS:4326").unwrap();
    assert_eq!(crs.name(), "WGS 84");
}

#[test]
fn datum_shift_strict_and_lenient() {
    let strict = engine();
    let wgs84 = strict.decode("EPSG:4326").unwrap();
    let ed50 = strict.decode("EPSG:4230").unwrap();

    // ED50 declares TOWGS84, so the strict engine builds the shift.
    let t = strict.find_transform(&ed50, &wgs84).unwrap();
    let [lat, lon] = t.transform([48.0, 9.0]).unwrap();
    assert!((lat - 48.0).abs() < 0.01 && (lon - 9.0).abs() < 0.01);
    assert!((lat - 48.0).abs() > 1e-4 || (lon - 9.0).abs() > 1e-4);

    // A datum with no offsets fails strict and passes lenient.
    let bare = strict
        .parse_wkt(
            r#"GEOGCS["Unanchored",DATUM["Unanchored_Datum",SPHEROID["International 1924",6378388,297]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#,
        )
        .unwrap();
    assert!(matches!(
        strict.find_transform(&bare, &wgs84),
        Err(CrsError::OperationNotFound { .. })
    ));

    let lenient = CrsEngine::with_default_factories(EngineConfig {
        allow_lenient_datum_shift: true,
    });
    assert!(lenient.find_transform(&bare, &wgs84).is_ok());
}

#[test]
fn ed50_utm_to_wgs84_composes_three_stages() {
    let engine = engine();
    let ed50_utm = engine.decode("EPSG:23032").unwrap();
    let wgs84 = engine.decode("EPSG:4326").unwrap();

    let t = engine.find_transform(&ed50_utm, &wgs84).unwrap();
    let description = t.description();
    assert!(description.contains("inverse Transverse_Mercator"), "{description}");
    assert!(description.contains("European_Datum_1950 to WGS_1984"), "{description}");

    // Zone 32 false easting on the central meridian, mid latitudes.
    let [lat, lon] = t.transform([500_000.0, 5_300_000.0]).unwrap();
    assert!((lat - 47.8).abs() < 0.3, "lat = {lat}");
    assert!((lon - 9.0).abs() < 0.1, "lon = {lon}");
}

/// Factory answering one code from a fixed WKT string, counting calls.
struct CountingFactory {
    code: String,
    wkt: String,
    calls: AtomicUsize,
}

impl CountingFactory {
    fn answering(code: &str, wkt: &str) -> Self {
        Self {
            code: code.to_string(),
            wkt: wkt.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AuthorityFactory for CountingFactory {
    fn authority(&self) -> &str {
        "EPSG"
    }

    fn citation(&self) -> Citation {
        Citation::new("test factory")
    }

    fn create_crs(&self, code: &AuthorityCode) -> Result<Crs, FactoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code.code() != self.code {
            return Err(FactoryError::UnknownCode(code.to_string()));
        }
        Ok(wkt_parser::parse(&self.wkt)?)
    }
}

struct FailingStore;

impl SqlStore for FailingStore {
    fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>, FactoryError> {
        Err(FactoryError::Store("connection refused".into()))
    }
}
