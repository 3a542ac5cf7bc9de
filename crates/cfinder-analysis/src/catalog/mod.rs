//! Pattern Catalog: an immutable, versioned set of pattern definitions.
//!
//! Loaded once per run and shared as `Arc<PatternCatalog>` with every
//! matcher invocation.

mod loader;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use cfinder_core::errors::CatalogError;

pub use types::{Binding, Pattern, PatternSummary, ShapeKind, ShapeSpec, Slot};

/// The catalog shipped with the engine.
pub const BUILTIN_CATALOG: &str = include_str!("../../catalog/django.toml");

/// Immutable pattern set.
#[derive(Debug)]
pub struct PatternCatalog {
    name: String,
    version: String,
    patterns: Vec<Pattern>,
}

impl PatternCatalog {
    /// Parse and validate a catalog from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let loaded = loader::load_from_str(toml_str)?;
        Ok(Self {
            name: loaded.name,
            version: loaded.version,
            patterns: loaded.patterns,
        })
    }

    /// Load a catalog file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let loaded = loader::load_from_file(path)?;
        Ok(Self {
            name: loaded.name,
            version: loaded.version,
            patterns: loaded.patterns,
        })
    }

    /// The built-in Django catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    /// The configured catalog path, or the built-in catalog.
    pub fn load(path: Option<&str>) -> Result<Arc<Self>, CatalogError> {
        let catalog = match path {
            Some(p) => Self::from_file(Path::new(p))?,
            None => Self::builtin()?,
        };
        tracing::info!(
            catalog = %catalog.name,
            version = %catalog.version,
            patterns = catalog.patterns.len(),
            "pattern catalog loaded"
        );
        Ok(Arc::new(catalog))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn get(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn summaries(&self) -> Vec<PatternSummary> {
        self.patterns
            .iter()
            .map(|p| PatternSummary {
                id: p.id.clone(),
                kind: p.kind,
                effect: p.effect,
                confidence: p.confidence,
                slots: p.template.len(),
                include_tests: p.include_tests,
                description: p.description.clone(),
            })
            .collect()
    }
}
