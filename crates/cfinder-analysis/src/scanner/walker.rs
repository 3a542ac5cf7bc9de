//! Parallel file walker using the `ignore` crate's `WalkParallel`.
//!
//! Honors `.gitignore`, `.cfinderignore` and the default ignore list below.

use std::path::Path;

use cfinder_core::config::ScanConfig;
use cfinder_core::errors::ScanError;
use crossbeam_channel as channel;

use super::language_detect::Language;
use super::types::DiscoveredFile;

/// Directories never analyzed: caches, environments, vendored interpreters.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".ipynb_checkpoints",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    "site-packages",
    "lib/python*",
    "static",
    "migrations",
];

/// Walk a directory tree in parallel, collecting discovered files.
///
/// Only files with a known [`Language`] are returned, sorted by path.
pub fn walk_directory(root: &Path, config: &ScanConfig) -> Result<Vec<DiscoveredFile>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let (tx, rx) = channel::unbounded();

    let max_file_size = config.effective_max_file_size();
    let threads = config.effective_threads();

    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(".cfinderignore")
        .max_filesize(Some(max_file_size))
        .follow_links(config.follow_symlinks.unwrap_or(false));

    if threads > 0 {
        builder.threads(threads);
    }

    // Positive patterns whitelist, `!` patterns blacklist.
    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in &config.include {
        let _ = overrides.add(pattern);
    }
    for pattern in DEFAULT_IGNORES {
        let _ = overrides.add(&format!("!**/{pattern}/**"));
        let _ = overrides.add(&format!("!**/{pattern}"));
    }
    for pattern in &config.extra_ignore {
        let _ = overrides.add(&format!("!{pattern}"));
    }
    if let Ok(built) = overrides.build() {
        builder.overrides(built);
    }

    builder.build_parallel().run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(error = %err, "walk entry skipped");
                    return ignore::WalkState::Continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return ignore::WalkState::Continue;
            }
            let path = entry.path().to_path_buf();
            let language = Language::from_extension(path.extension().and_then(|e| e.to_str()));
            if language.is_none() {
                return ignore::WalkState::Continue;
            }
            let file_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let _ = tx.send(DiscoveredFile {
                path,
                file_size,
                language,
            });
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut files: Vec<DiscoveredFile> = rx.into_iter().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
