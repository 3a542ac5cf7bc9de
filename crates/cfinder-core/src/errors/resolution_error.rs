//! Finding resolution errors. Each one drops a single Finding.

use super::error_code::{self, CfinderErrorCode};

/// Reasons a Finding could not be turned into a constraint candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Field {field} not found on model {model}")]
    FieldNotFound { model: String, field: String },

    #[error("Could not infer a model for receiver '{receiver}'")]
    UnknownReceiver { receiver: String },

    #[error("Relationship path {path} does not resolve from model {model}")]
    BrokenPath { model: String, path: String },

    #[error("Field {field} on model {model} is not a many-to-many relation")]
    NotManyToMany { model: String, field: String },

    #[error("Finding is missing binding '{0}'")]
    MissingBinding(&'static str),
}

impl CfinderErrorCode for ResolutionError {
    fn error_code(&self) -> &'static str {
        error_code::RESOLUTION_FAILED
    }
}
