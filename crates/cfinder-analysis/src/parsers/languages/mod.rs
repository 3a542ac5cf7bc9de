//! Per-language parser implementations.

pub mod python;

use std::path::Path;
use std::time::Instant;

use cfinder_core::errors::ParseError;
use tree_sitter::{Node, Parser};

use super::error_tolerant::count_errors;
use super::traits::ParseLimits;
use super::types::{RepresentationNode, RepresentationTree};
use crate::scanner::hasher::hash_content;
use crate::scanner::language_detect::Language;

/// Converts a tree-sitter root into a representation root, or `None` when
/// the source nests deeper than the given limit.
pub type Normalize = fn(Node, &[u8], usize) -> Option<RepresentationNode>;

/// Shared parsing logic: tree-sitter parse, error census, normalization,
/// nesting limit and budget check.
pub fn parse_with_language(
    source: &[u8],
    path: &Path,
    language: Language,
    ts_language: tree_sitter::Language,
    normalize: Normalize,
    limits: ParseLimits,
) -> Result<RepresentationTree, ParseError> {
    let start = Instant::now();

    let mut parser = Parser::new();
    parser
        .set_language(&ts_language)
        .map_err(|_| ParseError::GrammarNotFound {
            language: language.name().to_string(),
        })?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::TreeSitterError {
            path: path.to_path_buf(),
            message: "tree-sitter returned None".to_string(),
        })?;

    let root = tree.root_node();
    let (error_count, first_error) = count_errors(root);
    let normalized = normalize(root, source, limits.max_nesting).ok_or_else(|| {
        ParseError::NestingTooDeep {
            path: path.to_path_buf(),
            limit: limits.max_nesting,
        }
    })?;

    let elapsed = start.elapsed();
    if elapsed.as_millis() as u64 > limits.budget_ms {
        return Err(ParseError::Timeout {
            path: path.to_path_buf(),
            timeout_ms: limits.budget_ms,
        });
    }

    Ok(RepresentationTree {
        path: path.to_path_buf(),
        root: normalized,
        content_hash: hash_content(source),
        error_count,
        first_error,
        parse_time_us: elapsed.as_micros() as u64,
    })
}
