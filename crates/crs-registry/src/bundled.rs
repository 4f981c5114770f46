//! Bundled-table authority factory.
//!
//! Backed by a packaged `code=WKT` properties file parsed into an
//! in-memory map once per process. Fast, dependency-free, and the
//! fallback of last resort when no richer store is registered.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crs_common::{AuthorityCode, Crs, FactoryError};

use crate::factory::{AuthorityFactory, Citation};

const EPSG_TABLE: &str = include_str!("../data/epsg.properties");

static BUNDLED: Lazy<HashMap<String, &'static str>> = Lazy::new(|| parse_table(EPSG_TABLE));

fn parse_table(text: &'static str) -> HashMap<String, &'static str> {
    let mut table = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((code, wkt)) = line.split_once('=') {
            table.insert(code.trim().to_string(), wkt.trim());
        }
    }
    table
}

/// Authority factory over the packaged EPSG property table.
pub struct BundledFactory {
    table: &'static HashMap<String, &'static str>,
}

impl BundledFactory {
    pub fn new() -> Self {
        Self { table: &BUNDLED }
    }

    /// Codes present in the table, unordered.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl Default for BundledFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorityFactory for BundledFactory {
    fn authority(&self) -> &str {
        "EPSG"
    }

    fn citation(&self) -> Citation {
        Citation::new("Bundled EPSG property table")
    }

    fn create_crs(&self, code: &AuthorityCode) -> Result<Crs, FactoryError> {
        let wkt = self
            .table
            .get(code.code())
            .ok_or_else(|| FactoryError::UnknownCode(code.to_string()))?;
        debug!(code = %code, "resolving from bundled table");
        let crs = wkt_parser::parse(wkt)?;
        Ok(crs)
    }
}
