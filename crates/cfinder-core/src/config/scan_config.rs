//! Scanner configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_FILE_SIZE, DEFAULT_TEST_MARKERS, DEFAULT_THREADS};

/// Configuration for application and source file discovery.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum file size in bytes. Default: 1MB (1_048_576).
    pub max_file_size: Option<u64>,
    /// Number of worker threads. 0 = rayon default.
    pub threads: Option<usize>,
    /// Include glob patterns; if non-empty, only matching paths are scanned.
    #[serde(default)]
    pub include: Vec<String>,
    /// Additional ignore patterns beyond .gitignore/.cfinderignore.
    #[serde(default)]
    pub extra_ignore: Vec<String>,
    /// Follow symbolic links. Default: false.
    pub follow_symlinks: Option<bool>,
    /// Path components that mark a file as test code.
    #[serde(default)]
    pub test_markers: Vec<String>,
}

impl ScanConfig {
    /// Returns the effective max file size, defaulting to 1MB.
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    /// Returns the effective thread count, defaulting to 0 (auto-detect).
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(DEFAULT_THREADS)
    }

    /// Returns the test path markers, defaulting to `test` and `tests`.
    pub fn effective_test_markers(&self) -> Vec<String> {
        if self.test_markers.is_empty() {
            DEFAULT_TEST_MARKERS.iter().map(|s| s.to_string()).collect()
        } else {
            self.test_markers.clone()
        }
    }
}
