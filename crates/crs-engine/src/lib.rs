//! The engine facade: one object wiring the authority registry, the
//! single-flight object cache, and the transform resolver behind a
//! synchronous API.
//!
//! ```
//! use crs_engine::{CrsEngine, EngineConfig, MathTransform};
//!
//! let engine = CrsEngine::with_default_factories(EngineConfig::default());
//! let wgs84 = engine.decode("EPSG:4326").unwrap();
//! let utm10 = engine.decode("EPSG:32610").unwrap();
//! let transform = engine.find_transform(&wgs84, &utm10).unwrap();
//! let [easting, northing] = transform.transform([47.6, -122.3]).unwrap();
//! assert!(easting > 500_000.0 && northing > 5_000_000.0);
//! ```

use std::sync::Arc;

use tracing::info;

use crs_registry::{AuthorityRegistry, ObjectCache};

pub use crs_common::{
    AuthorityCode, Axis, AxisDirection, Crs, CrsError, CrsKind, CrsResult, Ellipsoid,
    FactoryError, GeodeticDatum, GeographicCrs, InvalidParameterValue, ParseError, PrimeMeridian,
    ProjectedCrs, Unit, UnitKind,
};
pub use crs_registry::{
    AuthorityFactory, BundledFactory, CacheStats, Citation, EpsgSqlConfig, EpsgSqlFactory, Row,
    SqlStore, SqlValue, SqlitePool, VendorSrsFactory,
};
pub use crs_transform::{EngineConfig, MathTransform, TransformError};

/// Thread-safe CRS resolution and transform-pipeline engine.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct CrsEngine {
    registry: AuthorityRegistry,
    cache: ObjectCache,
    config: EngineConfig,
}

impl CrsEngine {
    /// An engine with no factories registered.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: AuthorityRegistry::new(),
            cache: ObjectCache::new(),
            config,
        }
    }

    /// An engine with the bundled EPSG table registered at priority 0,
    /// so richer stores registered later with positive priorities are
    /// consulted first.
    pub fn with_default_factories(config: EngineConfig) -> Self {
        let engine = Self::new(config);
        engine.register_authority_factory(Arc::new(BundledFactory::new()), 0);
        engine
    }

    pub fn register_authority_factory(&self, factory: Arc<dyn AuthorityFactory>, priority: i32) {
        info!(
            authority = factory.authority(),
            priority, "registering factory"
        );
        self.registry.register(factory, priority);
    }

    /// Resolve "AUTHORITY:CODE" text to a shared CRS object.
    ///
    /// Results are cached per code: repeats return the same `Arc`, and
    /// concurrent first requests coalesce into one factory call.
    pub fn decode(&self, text: &str) -> CrsResult<Arc<Crs>> {
        let code = AuthorityCode::parse(text)?;
        self.cache
            .get_or_resolve(&code, || self.registry.decode_code(&code))
    }

    pub fn parse_wkt(&self, text: &str) -> Result<Crs, ParseError> {
        wkt_parser::parse(text)
    }

    pub fn encode_wkt(&self, crs: &Crs) -> String {
        wkt_parser::encode(crs)
    }

    /// Resolve a coordinate transform between two CRSs under this
    /// engine's configuration.
    pub fn find_transform(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Box<dyn MathTransform>, CrsError> {
        crs_transform::find_transform(source, target, &self.config)
    }

    /// Drop cached objects; subsequent decodes consult the factories
    /// again.
    pub fn reset_cache(&self) {
        self.cache.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
