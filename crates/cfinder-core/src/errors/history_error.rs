//! History dataset errors.

use std::path::PathBuf;

use super::error_code::{self, CfinderErrorCode};

/// Errors raised while loading a history-issue dataset manifest.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to read manifest {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Manifest parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Issue {issue} references unknown application {app}")]
    UnknownApplication { issue: String, app: String },

    #[error("Issue {issue} has an invalid expectation: {message}")]
    InvalidExpectation { issue: String, message: String },
}

impl CfinderErrorCode for HistoryError {
    fn error_code(&self) -> &'static str {
        error_code::HISTORY_ERROR
    }
}
