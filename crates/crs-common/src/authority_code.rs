//! Authority code parsing and normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::FactoryError;

/// A namespaced identifier naming a CRS, e.g. "EPSG:4326".
///
/// The authority half is stored upper-cased; the code half keeps its
/// original spelling but compares and hashes case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityCode {
    authority: String,
    code: String,
}

impl AuthorityCode {
    /// Build a code from already-split halves. Both halves are trimmed;
    /// empty halves are rejected.
    pub fn new(authority: &str, code: &str) -> Result<Self, FactoryError> {
        let authority = authority.trim();
        let code = code.trim();
        if authority.is_empty() || code.is_empty() {
            return Err(FactoryError::MalformedCode(format!("{authority}:{code}")));
        }
        Ok(Self {
            authority: authority.to_uppercase(),
            code: code.to_string(),
        })
    }

    /// Parse "AUTHORITY:CODE" text. A missing separator is a
    /// `FactoryError::MalformedCode`, not an authority-resolution failure.
    pub fn parse(text: &str) -> Result<Self, FactoryError> {
        let (authority, code) = text
            .split_once(':')
            .ok_or_else(|| FactoryError::MalformedCode(text.to_string()))?;
        Self::new(authority, code)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AuthorityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl PartialEq for AuthorityCode {
    fn eq(&self, other: &Self) -> bool {
        self.authority == other.authority && self.code.eq_ignore_ascii_case(&other.code)
    }
}

impl Eq for AuthorityCode {}

impl Hash for AuthorityCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.authority.hash(state);
        for b in self.code.bytes() {
            state.write_u8(b.to_ascii_uppercase());
        }
    }
}
