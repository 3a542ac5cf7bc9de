//! Scanner output types.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::language_detect::Language;

/// A file found by the walker.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub file_size: u64,
    pub language: Option<Language>,
}

/// One target application: a directory analyzed as a unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Application {
    /// Application identifier (directory name).
    pub id: String,
    pub root: PathBuf,
}

impl Application {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }
}

/// One source file of one application, loaded into memory.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub app: String,
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the application root, `/`-separated.
    pub rel_path: String,
    pub text: Arc<str>,
    pub content_hash: u64,
    /// Path contains one of the configured test markers.
    pub is_test: bool,
}

impl SourceUnit {
    /// Build a unit from in-memory text (tests, history snippets).
    pub fn from_text(app: &str, rel_path: &str, text: &str) -> Self {
        Self {
            app: app.to_string(),
            path: PathBuf::from(rel_path),
            rel_path: rel_path.to_string(),
            text: Arc::from(text),
            content_hash: super::hasher::hash_content(text.as_bytes()),
            is_test: false,
        }
    }

    /// Parent directory name of the file, which is Django's app label for
    /// `models.py`; `models/` packages use the directory above.
    pub fn app_label(&self) -> String {
        app_label_for(&self.rel_path, &self.app)
    }
}

/// Compute the Django app label for a relative path.
pub fn app_label_for(rel_path: &str, fallback: &str) -> String {
    let mut parts: Vec<&str> = rel_path.split('/').filter(|p| !p.is_empty()).collect();
    parts.pop();
    if parts.last() == Some(&"models") {
        parts.pop();
    }
    parts
        .last()
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Loaded sources of one application plus the schema files seen next to
/// them.
#[derive(Debug, Clone, Default)]
pub struct AppSources {
    pub units: Vec<SourceUnit>,
    pub sql_files: Vec<PathBuf>,
    pub total_bytes: u64,
}
