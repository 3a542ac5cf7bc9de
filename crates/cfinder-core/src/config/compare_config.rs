//! Comparator configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IGNORED_COLUMNS, DEFAULT_IGNORED_TABLE_KEYWORDS};

/// Configuration for candidate/schema comparison.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompareConfig {
    /// Treat a declared UNIQUE on a subset of a candidate's columns as a
    /// match. Default: false.
    pub implied_unique: Option<bool>,
    /// Table name fragments excluded from both sides.
    #[serde(default)]
    pub ignored_table_keywords: Vec<String>,
    /// Column names excluded from both sides.
    #[serde(default)]
    pub ignored_columns: Vec<String>,
}

impl CompareConfig {
    /// Returns whether implied UNIQUE matching is enabled, defaulting to false.
    pub fn effective_implied_unique(&self) -> bool {
        self.implied_unique.unwrap_or(false)
    }

    pub fn effective_ignored_table_keywords(&self) -> Vec<String> {
        if self.ignored_table_keywords.is_empty() {
            DEFAULT_IGNORED_TABLE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.ignored_table_keywords.clone()
        }
    }

    pub fn effective_ignored_columns(&self) -> Vec<String> {
        if self.ignored_columns.is_empty() {
            DEFAULT_IGNORED_COLUMNS.iter().map(|s| s.to_string()).collect()
        } else {
            self.ignored_columns.clone()
        }
    }
}
