//! Parse cache: Moka in-memory, keyed by (content_hash, language).
//!
//! Vendored copies of the same file across applications are parsed once per
//! run.

use std::sync::Arc;

use moka::sync::Cache;

use super::types::RepresentationTree;
use crate::scanner::language_detect::Language;

type CacheKey = (u64, Language);

/// In-memory parse cache using Moka (TinyLFU admission).
pub struct ParseCache {
    inner: Cache<CacheKey, Arc<RepresentationTree>>,
}

impl ParseCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn get(&self, content_hash: u64, lang: Language) -> Option<Arc<RepresentationTree>> {
        self.inner.get(&(content_hash, lang))
    }

    pub fn insert(&self, content_hash: u64, lang: Language, tree: Arc<RepresentationTree>) {
        self.inner.insert((content_hash, lang), tree);
    }

    /// Approximate entry count (Moka updates it lazily).
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(cfinder_core::constants::DEFAULT_PARSE_CACHE_CAPACITY)
    }
}
