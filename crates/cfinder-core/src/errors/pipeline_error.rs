//! Pipeline errors and non-fatal error collection.

use super::error_code::CfinderErrorCode;
use super::{CatalogError, ConfigError, HistoryError, ScanError};
use super::diagnostic::Diagnostic;

/// Run-fatal errors. Everything narrower than a run is recorded as a
/// [`Diagnostic`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("History dataset error: {0}")]
    History(#[from] HistoryError),

    #[error("Worker pool error: {0}")]
    ThreadPool(String),
}

impl CfinderErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Catalog(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Scan(e) => e.error_code(),
            Self::History(e) => e.error_code(),
            Self::ThreadPool(_) => super::error_code::CONFIG_ERROR,
        }
    }
}

/// Result of a pipeline stage that accumulates non-fatal diagnostics.
/// Allows partial results to be returned even when some files fail.
#[derive(Debug, Default)]
pub struct PipelineResult<T: Default = ()> {
    /// The successful result data.
    pub data: T,
    /// Non-fatal diagnostics collected during the stage.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T: Default> PipelineResult<T> {
    /// Create a new pipeline result with no diagnostics.
    pub fn new(data: T) -> Self {
        Self {
            data,
            diagnostics: Vec::new(),
        }
    }

    /// Add a non-fatal diagnostic to the result.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Returns true if there are no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.len()
    }
}
