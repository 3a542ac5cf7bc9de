//! Schema loader errors. Scoped to one application.

use std::path::PathBuf;

use super::error_code::{self, CfinderErrorCode};

/// Errors raised while loading an application's declared schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("No schema source found for application {app}")]
    NotFound { app: String },

    #[error("IO error reading schema {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("SQL parse error in {path}: {message}")]
    Sql { path: PathBuf, message: String },

    #[error("JSON schema error in {path}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("Unknown schema source: {0}")]
    UnknownSource(String),
}

impl CfinderErrorCode for SchemaError {
    fn error_code(&self) -> &'static str {
        error_code::SCHEMA_LOAD_ERROR
    }
}
