//! Top-level CFinder configuration with 4-layer resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    AnalysisConfig, CompareConfig, ScanConfig, SchemaConfig, SchemaSourceKind, SqlDialectKind,
};
use crate::constants::PROJECT_CONFIG_FILE;
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`CFINDER_*`)
/// 3. Project config (`cfinder.toml` in the run root)
/// 4. User config (`~/.cfinder/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CfinderConfig {
    pub scan: ScanConfig,
    pub analysis: AnalysisConfig,
    pub schema: SchemaConfig,
    pub compare: CompareConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub scan_threads: Option<usize>,
    pub analysis_window: Option<usize>,
    pub analysis_file_budget_ms: Option<u64>,
    pub analysis_catalog: Option<String>,
    pub schema_source: Option<String>,
    pub schema_dialect: Option<String>,
}

impl CfinderConfig {
    /// Load configuration with 4-layer resolution rooted at `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(ConfigError::ParseError { message, .. }) => {
                        return Err(ConfigError::ParseError {
                            path: user_config_path.display().to_string(),
                            message,
                        });
                    }
                    Err(e) => {
                        ::tracing::debug!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): CLI flags
        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &CfinderConfig) -> Result<(), ConfigError> {
        if config.scan.max_file_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "scan.max_file_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.analysis.window == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.window".to_string(),
                message: "must be at least 1 statement".to_string(),
            });
        }
        if config.analysis.max_depth == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.max_depth".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.analysis.max_nesting == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.max_nesting".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.analysis.file_budget_ms == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.file_budget_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.analysis.max_unique_columns == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "analysis.max_unique_columns".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(ref source) = config.schema.source {
            if SchemaSourceKind::parse_str(source).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "schema.source".to_string(),
                    message: format!("unknown source '{source}' (auto, sql, json, models)"),
                });
            }
        }
        if let Some(ref dialect) = config.schema.dialect {
            if SqlDialectKind::parse_str(dialect).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "schema.dialect".to_string(),
                    message: format!(
                        "unknown dialect '{dialect}' (generic, postgres, mysql, sqlite)"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns the user config path: `~/.cfinder/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut CfinderConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: CfinderConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`, where `other` values override `base` values
    /// only when `other` has a `Some` value or a non-empty list.
    fn merge(base: &mut CfinderConfig, other: &CfinderConfig) {
        // Scan
        if other.scan.max_file_size.is_some() {
            base.scan.max_file_size = other.scan.max_file_size;
        }
        if other.scan.threads.is_some() {
            base.scan.threads = other.scan.threads;
        }
        if !other.scan.include.is_empty() {
            base.scan.include = other.scan.include.clone();
        }
        if !other.scan.extra_ignore.is_empty() {
            base.scan.extra_ignore = other.scan.extra_ignore.clone();
        }
        if other.scan.follow_symlinks.is_some() {
            base.scan.follow_symlinks = other.scan.follow_symlinks;
        }
        if !other.scan.test_markers.is_empty() {
            base.scan.test_markers = other.scan.test_markers.clone();
        }

        // Analysis
        if other.analysis.window.is_some() {
            base.analysis.window = other.analysis.window;
        }
        if other.analysis.max_depth.is_some() {
            base.analysis.max_depth = other.analysis.max_depth;
        }
        if other.analysis.max_nesting.is_some() {
            base.analysis.max_nesting = other.analysis.max_nesting;
        }
        if other.analysis.file_budget_ms.is_some() {
            base.analysis.file_budget_ms = other.analysis.file_budget_ms;
        }
        if other.analysis.max_unique_columns.is_some() {
            base.analysis.max_unique_columns = other.analysis.max_unique_columns;
        }
        if other.analysis.parse_cache_capacity.is_some() {
            base.analysis.parse_cache_capacity = other.analysis.parse_cache_capacity;
        }
        if other.analysis.allow_partial_parse.is_some() {
            base.analysis.allow_partial_parse = other.analysis.allow_partial_parse;
        }
        if other.analysis.catalog.is_some() {
            base.analysis.catalog = other.analysis.catalog.clone();
        }
        if !other.analysis.model_bases.is_empty() {
            base.analysis.model_bases = other.analysis.model_bases.clone();
        }

        // Schema
        if other.schema.source.is_some() {
            base.schema.source = other.schema.source.clone();
        }
        if other.schema.dialect.is_some() {
            base.schema.dialect = other.schema.dialect.clone();
        }
        if other.schema.dir.is_some() {
            base.schema.dir = other.schema.dir.clone();
        }

        // Compare
        if other.compare.implied_unique.is_some() {
            base.compare.implied_unique = other.compare.implied_unique;
        }
        if !other.compare.ignored_table_keywords.is_empty() {
            base.compare.ignored_table_keywords = other.compare.ignored_table_keywords.clone();
        }
        if !other.compare.ignored_columns.is_empty() {
            base.compare.ignored_columns = other.compare.ignored_columns.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `CFINDER_SCAN_THREADS`, `CFINDER_ANALYSIS_WINDOW`, etc.
    fn apply_env_overrides(config: &mut CfinderConfig) {
        if let Ok(val) = std::env::var("CFINDER_SCAN_MAX_FILE_SIZE") {
            if let Ok(v) = val.parse::<u64>() {
                config.scan.max_file_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_SCAN_THREADS") {
            if let Ok(v) = val.parse::<usize>() {
                config.scan.threads = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_ANALYSIS_WINDOW") {
            if let Ok(v) = val.parse::<usize>() {
                config.analysis.window = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_ANALYSIS_MAX_DEPTH") {
            if let Ok(v) = val.parse::<usize>() {
                config.analysis.max_depth = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_ANALYSIS_MAX_NESTING") {
            if let Ok(v) = val.parse::<usize>() {
                config.analysis.max_nesting = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_ANALYSIS_FILE_BUDGET_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.analysis.file_budget_ms = Some(v);
            }
        }
        if let Ok(val) = std::env::var("CFINDER_ANALYSIS_CATALOG") {
            config.analysis.catalog = Some(val);
        }
        if let Ok(val) = std::env::var("CFINDER_SCHEMA_SOURCE") {
            config.schema.source = Some(val);
        }
        if let Ok(val) = std::env::var("CFINDER_SCHEMA_DIALECT") {
            config.schema.dialect = Some(val);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut CfinderConfig, cli: &CliOverrides) {
        if let Some(v) = cli.scan_threads {
            config.scan.threads = Some(v);
        }
        if let Some(v) = cli.analysis_window {
            config.analysis.window = Some(v);
        }
        if let Some(v) = cli.analysis_file_budget_ms {
            config.analysis.file_budget_ms = Some(v);
        }
        if let Some(ref v) = cli.analysis_catalog {
            config.analysis.catalog = Some(v.clone());
        }
        if let Some(ref v) = cli.schema_source {
            config.schema.source = Some(v.clone());
        }
        if let Some(ref v) = cli.schema_dialect {
            config.schema.dialect = Some(v.clone());
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Returns the user-level config directory: `~/.cfinder/`.
fn dirs_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".cfinder"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
