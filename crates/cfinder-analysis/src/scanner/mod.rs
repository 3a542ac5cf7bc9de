//! Scanner subsystem: application discovery, parallel file walking, source
//! loading and content hashing.

pub mod hasher;
pub mod language_detect;
pub mod types;
pub mod walker;

use std::path::Path;

use cfinder_core::config::ScanConfig;
use cfinder_core::errors::{CfinderErrorCode, Diagnostic, DiagnosticScope, ScanError};
use rayon::prelude::*;

pub use language_detect::Language;
pub use types::{AppSources, Application, DiscoveredFile, SourceUnit};

/// List the applications under `root`.
///
/// Every immediate subdirectory that is not hidden or ignored is one
/// application. With `single`, `root` itself is the only application.
pub fn discover_applications(root: &Path, single: bool) -> Result<Vec<Application>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if single {
        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string());
        return Ok(vec![Application::new(id, root)]);
    }

    let entries = std::fs::read_dir(root).map_err(|e| ScanError::IoError {
        path: root.to_path_buf(),
        source: e,
    })?;
    let mut apps: Vec<Application> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || walker::DEFAULT_IGNORES.contains(&name.as_str()) {
                None
            } else {
                Some(Application::new(name, e.path()))
            }
        })
        .collect();
    apps.sort();
    Ok(apps)
}

/// Walk one application and load its Python sources into memory.
///
/// Unreadable files become file-scoped `SCAN_ERROR` diagnostics; a missing
/// application root is an error.
pub fn load_sources(
    app: &Application,
    config: &ScanConfig,
) -> Result<(AppSources, Vec<Diagnostic>), ScanError> {
    let files = walker::walk_directory(&app.root, config)?;
    let markers = config.effective_test_markers();

    let (python, sql): (Vec<_>, Vec<_>) = files
        .into_iter()
        .partition(|f| f.language == Some(Language::Python));

    let loaded: Vec<Result<SourceUnit, ScanError>> = python
        .par_iter()
        .map(|file| read_unit(app, &file.path, &markers))
        .collect();

    let mut sources = AppSources {
        sql_files: sql.into_iter().map(|f| f.path).collect(),
        ..Default::default()
    };
    let mut diagnostics = Vec::new();
    for result in loaded {
        match result {
            Ok(unit) => {
                sources.total_bytes += unit.text.len() as u64;
                sources.units.push(unit);
            }
            Err(err) => {
                let path = match &err {
                    ScanError::IoError { path, .. }
                    | ScanError::MaxFileSizeExceeded { path, .. }
                    | ScanError::UnsupportedEncoding { path, .. }
                    | ScanError::RootNotFound { path } => rel_path(&app.root, path),
                };
                tracing::debug!(app = %app.id, code = err.error_code(), %path, "source skipped");
                diagnostics.push(Diagnostic::from_error(
                    DiagnosticScope::File {
                        app: app.id.clone(),
                        path,
                    },
                    &err,
                ));
            }
        }
    }
    Ok((sources, diagnostics))
}

fn read_unit(app: &Application, path: &Path, markers: &[String]) -> Result<SourceUnit, ScanError> {
    let bytes = std::fs::read(path).map_err(|e| ScanError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ScanError::UnsupportedEncoding {
        path: path.to_path_buf(),
        encoding: "non-utf8".to_string(),
    })?;
    let rel = rel_path(&app.root, path);
    let is_test = is_test_path(&rel, markers);
    Ok(SourceUnit {
        app: app.id.clone(),
        path: path.to_path_buf(),
        content_hash: hasher::hash_content(text.as_bytes()),
        text: text.into(),
        rel_path: rel,
        is_test,
    })
}

/// `/`-separated path of `path` relative to `root`.
pub fn rel_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// True when any path segment (or file stem) matches a test marker, or the
/// file name follows the `test_*.py` / `*_tests.py` conventions.
pub fn is_test_path(rel_path: &str, markers: &[String]) -> bool {
    rel_path.split('/').any(|segment| {
        let stem = segment.strip_suffix(".py").unwrap_or(segment);
        markers.iter().any(|m| {
            stem == m
                || stem.starts_with(&format!("{m}_"))
                || stem.ends_with(&format!("_{m}"))
        })
    })
}
