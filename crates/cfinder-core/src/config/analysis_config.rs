//! Analysis configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FILE_BUDGET_MS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING, DEFAULT_MAX_UNIQUE_COLUMNS,
    DEFAULT_MODEL_BASES, DEFAULT_PARSE_CACHE_CAPACITY, DEFAULT_WINDOW,
};

/// Configuration for parsing, matching and resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Statements a multi-slot pattern may span. Default: 8.
    pub window: Option<usize>,
    /// Depth a slot shape searches within one statement. Default: 12.
    pub max_depth: Option<usize>,
    /// Expression/statement nesting a file may reach before it is skipped. Default: 128.
    pub max_nesting: Option<usize>,
    /// Per-file parse + match budget in milliseconds. Default: 5000.
    pub file_budget_ms: Option<u64>,
    /// Widest UNIQUE column set kept as a candidate. Default: 3.
    pub max_unique_columns: Option<usize>,
    /// Parse cache capacity. Default: 10_000.
    pub parse_cache_capacity: Option<u64>,
    /// Keep trees that contain syntax errors. Default: false.
    pub allow_partial_parse: Option<bool>,
    /// Path to a catalog TOML replacing the built-in catalog.
    pub catalog: Option<String>,
    /// Base classes that make a class a data model.
    #[serde(default)]
    pub model_bases: Vec<String>,
}

impl AnalysisConfig {
    /// Returns the effective statement window, defaulting to 8.
    pub fn effective_window(&self) -> usize {
        self.window.unwrap_or(DEFAULT_WINDOW)
    }

    /// Returns the effective shape search depth, defaulting to 12.
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Returns the effective nesting limit, defaulting to 128.
    pub fn effective_max_nesting(&self) -> usize {
        self.max_nesting.unwrap_or(DEFAULT_MAX_NESTING)
    }

    /// Returns the effective per-file budget, defaulting to 5000ms.
    pub fn effective_file_budget_ms(&self) -> u64 {
        self.file_budget_ms.unwrap_or(DEFAULT_FILE_BUDGET_MS)
    }

    /// Returns the effective UNIQUE width limit, defaulting to 3.
    pub fn effective_max_unique_columns(&self) -> usize {
        self.max_unique_columns.unwrap_or(DEFAULT_MAX_UNIQUE_COLUMNS)
    }

    /// Returns the effective parse cache capacity, defaulting to 10_000.
    pub fn effective_parse_cache_capacity(&self) -> u64 {
        self.parse_cache_capacity
            .unwrap_or(DEFAULT_PARSE_CACHE_CAPACITY)
    }

    /// Returns whether partial trees are kept, defaulting to false.
    pub fn effective_allow_partial_parse(&self) -> bool {
        self.allow_partial_parse.unwrap_or(false)
    }

    /// Returns the model base classes, falling back to the Django defaults.
    pub fn effective_model_bases(&self) -> Vec<String> {
        if self.model_bases.is_empty() {
            DEFAULT_MODEL_BASES.iter().map(|s| s.to_string()).collect()
        } else {
            self.model_bases.clone()
        }
    }
}
