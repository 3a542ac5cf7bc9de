//! ParserManager: routes files to the language parser, consults the parse
//! cache and applies the partial-parse policy.

use std::path::Path;
use std::sync::Arc;

use cfinder_core::config::AnalysisConfig;
use cfinder_core::errors::ParseError;

use super::cache::ParseCache;
use super::languages::python::PythonParser;
use super::traits::{LanguageParser, ParseLimits};
use super::types::RepresentationTree;
use crate::scanner::hasher::hash_content;
use crate::scanner::language_detect::Language;
use crate::scanner::types::SourceUnit;

/// Manages language parsers and the parse cache.
pub struct ParserManager {
    cache: ParseCache,
    python: PythonParser,
    allow_partial: bool,
    limits: ParseLimits,
}

impl Default for ParserManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserManager {
    pub fn new() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            cache: ParseCache::new(config.effective_parse_cache_capacity()),
            python: PythonParser::new(),
            allow_partial: config.effective_allow_partial_parse(),
            limits: ParseLimits::from_config(config),
        }
    }

    fn parser_for(&self, lang: Language) -> Option<&dyn LanguageParser> {
        match lang {
            Language::Python => Some(&self.python),
            Language::Sql => None,
        }
    }

    /// Parse a source unit.
    pub fn parse_unit(&self, unit: &SourceUnit) -> Result<Arc<RepresentationTree>, ParseError> {
        self.parse(unit.text.as_bytes(), &unit.path)
    }

    /// Parse a file, using the cache if available.
    ///
    /// A tree with syntax errors is rejected unless partial parses are
    /// allowed, in which case the caller sees `error_count > 0` and
    /// [`RepresentationTree::partial_error`] describes the damage.
    pub fn parse(&self, source: &[u8], path: &Path) -> Result<Arc<RepresentationTree>, ParseError> {
        let ext = path.extension().and_then(|e| e.to_str());
        let lang = Language::from_extension(ext).ok_or_else(|| ParseError::UnsupportedLanguage {
            extension: ext.unwrap_or("unknown").to_string(),
        })?;
        let parser = self
            .parser_for(lang)
            .ok_or_else(|| ParseError::UnsupportedLanguage {
                extension: ext.unwrap_or("unknown").to_string(),
            })?;

        let content_hash = hash_content(source);
        let tree = match self.cache.get(content_hash, lang) {
            Some(cached) if cached.path == path => cached,
            Some(cached) => Arc::new(RepresentationTree {
                path: path.to_path_buf(),
                ..(*cached).clone()
            }),
            None => {
                let tree = Arc::new(parser.parse(source, path, self.limits)?);
                self.cache.insert(content_hash, lang, Arc::clone(&tree));
                tree
            }
        };

        if tree.has_errors() && !self.allow_partial {
            let first = tree.first_error.unwrap_or_default();
            return Err(ParseError::SyntaxError {
                path: path.to_path_buf(),
                line: first.line,
                column: first.column,
                error_count: tree.error_count,
            });
        }
        Ok(tree)
    }

    /// Number of cached trees.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
