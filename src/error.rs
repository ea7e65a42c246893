//! Typed error handling for the sift engine
//!
//! Shape errors abort the whole call; everything else (unknown attributes,
//! denied relations) is handled locally by dropping the offending node and
//! never surfaces here.

use thiserror::Error;

/// The main error type for the sift engine.
#[derive(Debug, Error)]
pub enum SiftError {
    /// Sort input had an unsupported runtime shape.
    #[error("invalid sort: expected a string, an array, or an object")]
    InvalidSort,

    /// Fields input had an unsupported runtime shape.
    #[error("invalid fields: expected a string or an array of strings")]
    InvalidFields,

    /// Populate input had an unsupported runtime shape.
    #[error("invalid populate: expected a string, an array, an object, or a boolean")]
    InvalidPopulate,

    /// Strict validation found a path segment that resolves to no attribute.
    #[error("unrecognized field: {path}")]
    UnrecognizedField { path: String },

    /// Strict validation found a private or password field in the input.
    #[error("restricted field: {path}")]
    RestrictedField { path: String },

    /// A visitor or extension failed for reasons of its own.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
