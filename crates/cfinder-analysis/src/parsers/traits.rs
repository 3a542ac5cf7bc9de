//! The per-language parser seam.

use std::path::Path;

use cfinder_core::config::AnalysisConfig;
use cfinder_core::errors::ParseError;

use super::types::RepresentationTree;
use crate::scanner::language_detect::Language;

/// Per-file bounds applied while building a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Wall-clock budget for parse and normalization.
    pub budget_ms: u64,
    /// Expression/statement nesting past which the file is rejected.
    pub max_nesting: usize,
}

impl ParseLimits {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            budget_ms: config.effective_file_budget_ms(),
            max_nesting: config.effective_max_nesting(),
        }
    }
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Builds a [`RepresentationTree`] from source bytes.
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    fn extensions(&self) -> &[&str];

    /// Parse and normalize one file within `limits`.
    fn parse(
        &self,
        source: &[u8],
        path: &Path,
        limits: ParseLimits,
    ) -> Result<RepresentationTree, ParseError>;
}
