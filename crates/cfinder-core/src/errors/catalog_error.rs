//! Pattern catalog errors. Any of these invalidates the whole run.

use super::error_code::{self, CfinderErrorCode};

/// Errors raised while loading or validating the pattern catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {message}")]
    Read { path: String, message: String },

    #[error("Catalog TOML error: {0}")]
    Toml(String),

    #[error("Catalog has no version")]
    MissingVersion,

    #[error("Duplicate pattern id: {0}")]
    DuplicatePattern(String),

    #[error("Unknown constraint kind '{kind}' in pattern '{pattern}'")]
    UnknownKind { pattern: String, kind: String },

    #[error("Invalid template in pattern '{pattern}': {message}")]
    InvalidTemplate { pattern: String, message: String },

    #[error("Pattern '{pattern}' requires binding '{binding}' that no slot provides")]
    UnboundVariable { pattern: String, binding: String },

    #[error("Regex error in pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

impl CfinderErrorCode for CatalogError {
    fn error_code(&self) -> &'static str {
        error_code::CATALOG_LOAD_ERROR
    }
}
