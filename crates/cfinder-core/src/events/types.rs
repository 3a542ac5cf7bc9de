//! Event payload types.

use std::path::PathBuf;

use crate::errors::Diagnostic;

/// Payload for `on_run_started`.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    pub root: PathBuf,
    pub mode: &'static str,
    pub app_count: usize,
}

/// Payload for `on_app_started`.
#[derive(Debug, Clone)]
pub struct AppStartedEvent {
    pub app: String,
    pub file_count: usize,
}

/// Payload for `on_app_complete`.
#[derive(Debug, Clone)]
pub struct AppCompleteEvent {
    pub app: String,
    pub findings: usize,
    pub candidates: usize,
    pub missing: usize,
    pub schema_available: bool,
    pub elapsed_ms: u64,
}

/// Payload for `on_diagnostic`.
#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    pub diagnostic: Diagnostic,
}

/// Payload for `on_run_complete`.
#[derive(Debug, Clone)]
pub struct RunCompleteEvent {
    pub apps: usize,
    pub elapsed_ms: u64,
}
