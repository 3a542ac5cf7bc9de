//! Scanner errors.

use std::path::PathBuf;

use super::error_code::{self, CfinderErrorCode};

/// Errors that can occur while discovering applications and source files.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error scanning {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Root not found or not a directory: {path}")]
    RootNotFound { path: PathBuf },

    #[error("File too large: {path} ({size} bytes, max {max})")]
    MaxFileSizeExceeded { path: PathBuf, size: u64, max: u64 },

    #[error("Unsupported encoding in {path}: {encoding}")]
    UnsupportedEncoding { path: PathBuf, encoding: String },
}

impl CfinderErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        error_code::SCAN_ERROR
    }
}
