//! AnalysisEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing a CFinder run.
///
/// Handlers override only the events they care about. `Send + Sync` because
/// applications are analyzed on worker threads.
pub trait AnalysisEventHandler: Send + Sync {
    fn on_run_started(&self, _event: &RunStartedEvent) {}
    fn on_app_started(&self, _event: &AppStartedEvent) {}
    fn on_app_complete(&self, _event: &AppCompleteEvent) {}
    fn on_diagnostic(&self, _event: &DiagnosticEvent) {}
    fn on_run_complete(&self, _event: &RunCompleteEvent) {}
}

/// Handler that ignores every event.
pub struct NoOpHandler;

impl AnalysisEventHandler for NoOpHandler {}
