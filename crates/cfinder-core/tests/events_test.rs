//! Tests for the run lifecycle events.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cfinder_core::errors::{Diagnostic, DiagnosticScope, SchemaError};
use cfinder_core::events::types::*;
use cfinder_core::events::{AnalysisEventHandler, NoOpHandler};

#[derive(Default)]
struct CountingHandler {
    apps_started: AtomicUsize,
    apps_complete: AtomicUsize,
    diagnostics: AtomicUsize,
}

impl AnalysisEventHandler for CountingHandler {
    fn on_app_started(&self, _event: &AppStartedEvent) {
        self.apps_started.fetch_add(1, Ordering::Relaxed);
    }

    fn on_app_complete(&self, _event: &AppCompleteEvent) {
        self.apps_complete.fetch_add(1, Ordering::Relaxed);
    }

    fn on_diagnostic(&self, _event: &DiagnosticEvent) {
        self.diagnostics.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_noop_handler_accepts_every_event() {
    let handler = NoOpHandler;
    handler.on_run_started(&RunStartedEvent {
        root: PathBuf::from("/apps"),
        mode: "run",
        app_count: 2,
    });
    handler.on_run_complete(&RunCompleteEvent {
        apps: 2,
        elapsed_ms: 10,
    });
}

#[test]
fn test_handler_overrides_only_chosen_events() {
    let handler = Arc::new(CountingHandler::default());
    let dyn_handler: Arc<dyn AnalysisEventHandler> = handler.clone();

    dyn_handler.on_run_started(&RunStartedEvent {
        root: PathBuf::from("/apps"),
        mode: "run",
        app_count: 1,
    });
    dyn_handler.on_app_started(&AppStartedEvent {
        app: "shop".to_string(),
        file_count: 4,
    });
    dyn_handler.on_diagnostic(&DiagnosticEvent {
        diagnostic: Diagnostic::from_error(
            DiagnosticScope::Application {
                app: "shop".to_string(),
            },
            &SchemaError::NotFound {
                app: "shop".to_string(),
            },
        ),
    });
    dyn_handler.on_app_complete(&AppCompleteEvent {
        app: "shop".to_string(),
        findings: 3,
        candidates: 2,
        missing: 1,
        schema_available: false,
        elapsed_ms: 5,
    });

    assert_eq!(handler.apps_started.load(Ordering::Relaxed), 1);
    assert_eq!(handler.apps_complete.load(Ordering::Relaxed), 1);
    assert_eq!(handler.diagnostics.load(Ordering::Relaxed), 1);
}
