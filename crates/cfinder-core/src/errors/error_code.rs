//! CfinderErrorCode trait for diagnostics and report output.

/// Trait for converting CFinder errors to stable error codes.
/// Every error enum implements this so diagnostics carry a machine-readable
/// code alongside the human message.
pub trait CfinderErrorCode {
    /// Returns the error code string (e.g., "PARSE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted diagnostic string: `[ERROR_CODE] message`.
    fn diagnostic_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Error code constants surfaced in reports.
pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const MATCH_TIMEOUT: &str = "MATCH_TIMEOUT";
pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";
pub const RESOLUTION_FAILED: &str = "RESOLUTION_FAILED";
pub const SCHEMA_LOAD_ERROR: &str = "SCHEMA_LOAD_ERROR";
pub const CATALOG_LOAD_ERROR: &str = "CATALOG_LOAD_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const HISTORY_ERROR: &str = "HISTORY_ERROR";
