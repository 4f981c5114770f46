//! EPSG factory backed by a relational table of WKT definitions.

use std::sync::Arc;

use tracing::debug;

use crs_common::{AuthorityCode, Crs, FactoryError};

use crate::factory::{AuthorityFactory, Citation};
use crate::sql::{SqlStore, SqlValue};

/// Table layout for the backing store. Defaults match the conventional
/// `epsg_wkt(code, wkt)` shape; point the columns elsewhere to reuse an
/// existing schema.
#[derive(Debug, Clone)]
pub struct EpsgSqlConfig {
    pub table: String,
    pub code_column: String,
    pub wkt_column: String,
}

impl Default for EpsgSqlConfig {
    fn default() -> Self {
        Self {
            table: "epsg_wkt".into(),
            code_column: "code".into(),
            wkt_column: "wkt".into(),
        }
    }
}

impl EpsgSqlConfig {
    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?",
            self.wkt_column, self.table, self.code_column
        )
    }
}

/// Resolves EPSG codes by querying a `SqlStore` for WKT text.
pub struct EpsgSqlFactory {
    store: Arc<dyn SqlStore>,
    select_sql: String,
}

impl EpsgSqlFactory {
    pub fn new(store: Arc<dyn SqlStore>, config: EpsgSqlConfig) -> Self {
        let select_sql = config.select_sql();
        Self { store, select_sql }
    }
}

impl AuthorityFactory for EpsgSqlFactory {
    fn authority(&self) -> &str {
        "EPSG"
    }

    fn citation(&self) -> Citation {
        Citation::new("EPSG Geodetic Parameter Dataset")
            .with_url("https://epsg.org/")
    }

    fn create_crs(&self, code: &AuthorityCode) -> Result<Crs, FactoryError> {
        let rows = self
            .store
            .query(&self.select_sql, &[SqlValue::Text(code.code().to_string())])?;
        let Some(row) = rows.first() else {
            return Err(FactoryError::UnknownCode(code.to_string()));
        };
        let wkt = row.text(0).ok_or_else(|| FactoryError::Definition {
            code: code.to_string(),
            message: "WKT column is not text".into(),
        })?;
        debug!(code = %code, "resolving from SQL store");
        let crs = wkt_parser::parse(wkt).map_err(|e| FactoryError::Definition {
            code: code.to_string(),
            message: e.to_string(),
        })?;
        Ok(crs)
    }
}
