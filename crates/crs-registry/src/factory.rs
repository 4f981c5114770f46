//! The authority factory contract.

use crs_common::{AuthorityCode, Crs, FactoryError};

/// Identifies the organisation behind a factory's definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub url: Option<String>,
}

impl Citation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Resolves authority codes to CRS definitions from one backing store.
///
/// Implementations must be safe to call concurrently; any owned
/// connection or resource is acquired and released within a single
/// `create_crs` call, never held across calls.
pub trait AuthorityFactory: Send + Sync {
    /// The authority namespace this factory answers for, e.g. "EPSG".
    fn authority(&self) -> &str;

    fn citation(&self) -> Citation;

    /// Resolve one code. `FactoryError::UnknownCode` means the store is
    /// healthy but does not know the code; other variants mean the store
    /// itself failed.
    fn create_crs(&self, code: &AuthorityCode) -> Result<Crs, FactoryError>;
}
