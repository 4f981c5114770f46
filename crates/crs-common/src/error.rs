//! Error types for CRS resolution and transformation.

use thiserror::Error;

use crate::param::InvalidParameterValue;

/// Result type alias using CrsError.
pub type CrsResult<T> = Result<T, CrsError>;

/// WKT text is syntactically invalid.
///
/// Carries the offending fragment and its byte offset so callers can
/// diagnose the failure without re-parsing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("WKT parse error at offset {offset} near '{fragment}': {message}")]
pub struct ParseError {
    pub message: String,
    pub fragment: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, fragment: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            fragment: fragment.into(),
            offset,
        }
    }
}

/// A backing store or parser failed for reasons unrelated to whether the
/// code exists.
#[derive(Debug, Clone, Error)]
pub enum FactoryError {
    #[error("Malformed authority code '{0}': expected AUTHORITY:CODE")]
    MalformedCode(String),

    #[error("Authority code not found in backing store: {0}")]
    UnknownCode(String),

    #[error("Backing store error: {0}")]
    Store(String),

    #[error("Timed out after {waited_ms} ms acquiring {resource}")]
    Timeout { resource: String, waited_ms: u64 },

    #[error("Invalid definition for {code}: {message}")]
    Definition { code: String, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Primary error type for the engine's public surface.
///
/// Distinct variants per failure kind: a malformed code string, an
/// unrecognized code, an out-of-range parameter, and a missing operation
/// path are different conditions and are never collapsed into one.
#[derive(Debug, Clone, Error)]
pub enum CrsError {
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Every matching, healthy factory was consulted and none recognizes
    /// the code.
    #[error("No authority factory recognizes '{code}' (authorities tried: {})", .authorities.join(", "))]
    NoSuchAuthorityCode {
        code: String,
        authorities: Vec<String>,
        causes: Vec<String>,
    },

    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterValue),

    /// No operation method or datum-shift path connects two otherwise
    /// valid CRSs. The CRS names are plain fields, not an error source.
    #[error("No coordinate operation from '{source_crs}' to '{target_crs}': {reason}")]
    OperationNotFound {
        source_crs: String,
        target_crs: String,
        reason: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}
