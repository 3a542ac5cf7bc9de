//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the CFinder tracing/logging system.
///
/// Reads the `CFINDER_LOG` environment variable for per-module log levels.
/// Format: `CFINDER_LOG=cfinder_analysis::matcher=debug,cfinder_analysis=info`
///
/// Falls back to `cfinder=info` if `CFINDER_LOG` is not set or is invalid.
/// Output goes to stderr so JSON reports on stdout stay clean.
///
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("CFINDER_LOG")
            .unwrap_or_else(|_| EnvFilter::new("cfinder=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
