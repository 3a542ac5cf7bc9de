//! Run lifecycle events.

pub mod handler;
pub mod types;

pub use handler::{AnalysisEventHandler, NoOpHandler};
pub use types::{AppCompleteEvent, AppStartedEvent, DiagnosticEvent, RunCompleteEvent, RunStartedEvent};
