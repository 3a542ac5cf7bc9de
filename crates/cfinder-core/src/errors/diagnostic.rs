//! Non-fatal error records attached to the smallest scope they affect.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error_code::CfinderErrorCode;

/// Where a diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DiagnosticScope {
    Run,
    Application {
        app: String,
    },
    File {
        app: String,
        path: String,
    },
    Class {
        app: String,
        class: String,
    },
    Finding {
        app: String,
        path: String,
        line: u32,
        pattern: String,
    },
}

impl fmt::Display for DiagnosticScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Application { app } => write!(f, "{app}"),
            Self::File { app, path } => write!(f, "{app}:{path}"),
            Self::Class { app, class } => write!(f, "{app}:{class}"),
            Self::Finding {
                app,
                path,
                line,
                pattern,
            } => write!(f, "{app}:{path}:{line} [{pattern}]"),
        }
    }
}

/// A recorded non-fatal error.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub scope: DiagnosticScope,
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic from any coded error.
    pub fn from_error<E>(scope: DiagnosticScope, error: &E) -> Self
    where
        E: CfinderErrorCode + fmt::Display,
    {
        Self {
            code: error.error_code().to_string(),
            scope,
            message: error.to_string(),
        }
    }

    /// Emit the diagnostic through `tracing` at warn level.
    pub fn log(&self) {
        ::tracing::warn!(
            code = %self.code,
            scope = %self.scope,
            "{}",
            self.message
        );
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.scope, self.message)
    }
}
