//! Error handling for CFinder.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod catalog_error;
pub mod config_error;
pub mod diagnostic;
pub mod error_code;
pub mod history_error;
pub mod match_error;
pub mod parse_error;
pub mod pipeline_error;
pub mod registry_error;
pub mod resolution_error;
pub mod scan_error;
pub mod schema_error;

pub use catalog_error::CatalogError;
pub use config_error::ConfigError;
pub use diagnostic::{Diagnostic, DiagnosticScope};
pub use error_code::CfinderErrorCode;
pub use history_error::HistoryError;
pub use match_error::MatchError;
pub use parse_error::ParseError;
pub use pipeline_error::{PipelineError, PipelineResult};
pub use registry_error::RegistryError;
pub use resolution_error::ResolutionError;
pub use scan_error::ScanError;
pub use schema_error::SchemaError;
