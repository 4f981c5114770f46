//! Vendor `spatial_ref_sys` factory with a fallback path.
//!
//! PostGIS-style deployments keep their definitions in a
//! `spatial_ref_sys(srid, srtext)` table. When that store is reachable
//! it is authoritative: an absent row means the code does not exist and
//! no fallback applies. Only when the store itself fails (connection
//! loss, timeout, corrupt schema) does the factory retry the numeric
//! code against a fallback factory, so that well-known codes keep
//! resolving through an outage.

use std::sync::Arc;

use tracing::warn;

use crs_common::{AuthorityCode, Crs, FactoryError};

use crate::factory::{AuthorityFactory, Citation};
use crate::sql::{SqlStore, SqlValue};

const SELECT_SRTEXT: &str = "SELECT srtext FROM spatial_ref_sys WHERE srid = ?";

pub struct VendorSrsFactory {
    authority: String,
    store: Arc<dyn SqlStore>,
    fallback: Option<Arc<dyn AuthorityFactory>>,
}

impl VendorSrsFactory {
    pub fn new(authority: impl Into<String>, store: Arc<dyn SqlStore>) -> Self {
        Self {
            authority: authority.into().to_ascii_uppercase(),
            store,
            fallback: None,
        }
    }

    /// Consult `fallback` with `EPSG:<srid>` when the store fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn AuthorityFactory>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn query_store(&self, code: &AuthorityCode) -> Result<Crs, FactoryError> {
        let srid: i64 = code.code().parse().map_err(|_| {
            FactoryError::Definition {
                code: code.to_string(),
                message: "vendor codes are numeric SRIDs".into(),
            }
        })?;
        let rows = self.store.query(SELECT_SRTEXT, &[SqlValue::Integer(srid)])?;
        let Some(row) = rows.first() else {
            return Err(FactoryError::UnknownCode(code.to_string()));
        };
        let srtext = row.text(0).ok_or_else(|| FactoryError::Definition {
            code: code.to_string(),
            message: "srtext column is not text".into(),
        })?;
        let crs = wkt_parser::parse(srtext).map_err(|e| FactoryError::Definition {
            code: code.to_string(),
            message: e.to_string(),
        })?;
        Ok(crs)
    }
}

impl AuthorityFactory for VendorSrsFactory {
    fn authority(&self) -> &str {
        &self.authority
    }

    fn citation(&self) -> Citation {
        Citation::new(format!("{} spatial_ref_sys table", self.authority))
    }

    fn create_crs(&self, code: &AuthorityCode) -> Result<Crs, FactoryError> {
        match self.query_store(code) {
            Ok(crs) => Ok(crs),
            // The store answered: the code genuinely does not exist, or
            // its definition is broken. Fallback would mask that.
            Err(err @ (FactoryError::UnknownCode(_) | FactoryError::Definition { .. })) => Err(err),
            Err(store_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(store_err);
                };
                warn!(
                    code = %code,
                    error = %store_err,
                    "vendor store failed, retrying against fallback"
                );
                let epsg_code = AuthorityCode::new("EPSG", code.code())
                    .map_err(|_| store_err.clone())?;
                fallback.create_crs(&epsg_code).map_err(|fallback_err| {
                    FactoryError::Store(format!(
                        "store failed ({store_err}); fallback failed ({fallback_err})"
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundled::BundledFactory;
    use crate::sql::{Row, SqlitePool};
    use test_utils::fixtures;

    struct FailingStore;

    impl SqlStore for FailingStore {
        fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>, FactoryError> {
            Err(FactoryError::Store("connection refused".into()))
        }
    }

    fn code(c: &str) -> AuthorityCode {
        AuthorityCode::new("POSTGIS", c).unwrap()
    }

    fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::open_in_memory().unwrap();
        pool.execute("CREATE TABLE spatial_ref_sys (srid INTEGER PRIMARY KEY, srtext TEXT);")
            .unwrap();
        pool.execute(&format!(
            "INSERT INTO spatial_ref_sys VALUES (4269, '{}');",
            fixtures::NAD83_WKT.replace('\'', "''"),
        ))
        .unwrap();
        pool
    }

    #[test]
    fn resolves_from_store() {
        let factory = VendorSrsFactory::new("POSTGIS", Arc::new(seeded_pool()));
        let crs = factory.create_crs(&code("4269")).unwrap();
        assert_eq!(crs.name(), "NAD83");
    }

    #[test]
    fn absent_row_does_not_fall_back() {
        let factory = VendorSrsFactory::new("POSTGIS", Arc::new(seeded_pool()))
            .with_fallback(Arc::new(BundledFactory::new()));
        // 4326 is in the bundled table but not in this store; a healthy
        // store's answer is final.
        assert!(matches!(
            factory.create_crs(&code("4326")),
            Err(FactoryError::UnknownCode(_))
        ));
    }

    #[test]
    fn store_failure_falls_back_to_epsg() {
        let factory = VendorSrsFactory::new("POSTGIS", Arc::new(FailingStore))
            .with_fallback(Arc::new(BundledFactory::new()));
        let crs = factory.create_crs(&code("4326")).unwrap();
        assert!(crs.is_geographic());
        assert_eq!(crs.name(), "WGS 84");
    }

    #[test]
    fn store_failure_without_fallback_surfaces() {
        let factory = VendorSrsFactory::new("POSTGIS", Arc::new(FailingStore));
        assert!(matches!(
            factory.create_crs(&code("4326")),
            Err(FactoryError::Store(_))
        ));
    }

    #[test]
    fn non_numeric_code_is_rejected() {
        let factory = VendorSrsFactory::new("POSTGIS", Arc::new(seeded_pool()));
        assert!(matches!(
            factory.create_crs(&code("WGS84")),
            Err(FactoryError::Definition { .. })
        ));
    }
}
