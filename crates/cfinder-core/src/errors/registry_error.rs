//! Model registry errors.

use super::error_code::{self, CfinderErrorCode};

/// Invalid model declarations found while building the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Inheritance cycle through model classes: {}", .classes.join(" -> "))]
    InheritanceCycle { classes: Vec<String> },

    #[error("Model {class} declared twice ({first} and {second})")]
    DuplicateModel {
        class: String,
        first: String,
        second: String,
    },
}

impl CfinderErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        error_code::REGISTRY_ERROR
    }
}
