//! Pattern matcher errors.

use std::path::PathBuf;

use super::error_code::{self, CfinderErrorCode};

/// Errors raised while matching a file against the catalog.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Matching {path} exceeded the {budget_ms}ms budget")]
    BudgetExceeded { path: PathBuf, budget_ms: u64 },
}

impl CfinderErrorCode for MatchError {
    fn error_code(&self) -> &'static str {
        error_code::MATCH_TIMEOUT
    }
}
