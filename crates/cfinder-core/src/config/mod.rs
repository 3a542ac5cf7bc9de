//! Configuration system for CFinder.
//! TOML-based, 4-layer resolution: CLI > env > project > user > defaults.

pub mod analysis_config;
pub mod cfinder_config;
pub mod compare_config;
pub mod scan_config;
pub mod schema_config;

pub use analysis_config::AnalysisConfig;
pub use cfinder_config::{CfinderConfig, CliOverrides};
pub use compare_config::CompareConfig;
pub use scan_config::ScanConfig;
pub use schema_config::{SchemaConfig, SchemaSourceKind, SqlDialectKind};
