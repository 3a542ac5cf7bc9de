//! Parser errors.

use std::path::PathBuf;

use super::error_code::{self, CfinderErrorCode};

/// Errors that can occur while building a file's representation tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Grammar not found for language: {language}")]
    GrammarNotFound { language: String },

    #[error("Tree-sitter error parsing {path}: {message}")]
    TreeSitterError { path: PathBuf, message: String },

    #[error("Syntax error in {path} at {line}:{column} ({error_count} error node(s))")]
    SyntaxError {
        path: PathBuf,
        line: u32,
        column: u32,
        error_count: u32,
    },

    #[error("Partial parse of {path}: {error_count} error node(s), first at {line}:{column}")]
    PartialTree {
        path: PathBuf,
        line: u32,
        column: u32,
        error_count: u32,
    },

    #[error("Nesting in {path} exceeds the limit of {limit} levels")]
    NestingTooDeep { path: PathBuf, limit: usize },

    #[error("Parse timeout for {path} after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("Unsupported language: {extension}")]
    UnsupportedLanguage { extension: String },
}

impl ParseError {
    /// Source location of the failure, when the error carries one.
    pub fn location(&self) -> Option<(u32, u32)> {
        match self {
            Self::SyntaxError { line, column, .. } | Self::PartialTree { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }
}

impl CfinderErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage { .. } => error_code::UNSUPPORTED_LANGUAGE,
            _ => error_code::PARSE_ERROR,
        }
    }
}
