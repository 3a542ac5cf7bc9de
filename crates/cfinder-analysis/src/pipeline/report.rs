//! Serialized run output consumed by external reporting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use cfinder_core::config::SchemaSourceKind;
use cfinder_core::errors::Diagnostic;

use crate::catalog::PatternCatalog;
use crate::comparator::{types::percentage, Comparison, KindMetrics, Status};
use crate::constraints::ConstraintKind;
use crate::resolver::Resolution;

/// Catalog identification carried in every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    pub version: String,
    pub patterns: usize,
}

impl CatalogInfo {
    pub fn of(catalog: &PatternCatalog) -> Self {
        Self {
            name: catalog.name().to_string(),
            version: catalog.version().to_string(),
            patterns: catalog.len(),
        }
    }
}

/// Results of one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppReport {
    pub app: String,
    pub root: PathBuf,
    pub files: usize,
    pub models: usize,
    pub findings: usize,
    pub resolution: Resolution,
    /// Absent when the declared schema could not be loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_source: Option<SchemaSourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u64,
}

impl AppReport {
    /// An application whose sources could not be read at all.
    pub fn unavailable(app: &str, root: PathBuf, diagnostics: Vec<Diagnostic>, elapsed_ms: u64) -> Self {
        Self {
            app: app.to_string(),
            root,
            files: 0,
            models: 0,
            findings: 0,
            resolution: Resolution::default(),
            schema_source: None,
            comparison: None,
            diagnostics,
            elapsed_ms,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.comparison.as_ref().map_or(0, |c| {
            c.classified.iter().filter(|c| c.status == Status::Missing).count()
        })
    }
}

/// Run-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub apps: usize,
    pub apps_with_schema: usize,
    pub findings: usize,
    pub candidates: usize,
    pub refuted: usize,
    pub excluded: usize,
    pub diagnostics: usize,
    /// Per-kind counts over applications with a loaded schema; candidate
    /// counts of the others are included in `candidates` only.
    pub per_kind: Vec<KindMetrics>,
    pub coverage: Option<f64>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn from_apps(apps: &[AppReport], elapsed_ms: u64) -> Self {
        let mut per_kind: Vec<KindMetrics> = ConstraintKind::ALL.iter().map(|&k| KindMetrics::empty(k)).collect();
        for comparison in apps.iter().filter_map(|a| a.comparison.as_ref()) {
            for metrics in &comparison.metrics {
                if let Some(total) = per_kind.iter_mut().find(|m| m.kind == metrics.kind) {
                    total.absorb(metrics);
                }
            }
        }
        let covered: usize = per_kind.iter().map(|m| m.covered).sum();
        let schema: usize = per_kind.iter().map(|m| m.schema).sum();
        Self {
            apps: apps.len(),
            apps_with_schema: apps.iter().filter(|a| a.comparison.is_some()).count(),
            findings: apps.iter().map(|a| a.findings).sum(),
            candidates: apps.iter().map(|a| a.resolution.candidates.len()).sum(),
            refuted: apps.iter().map(|a| a.resolution.refuted.len()).sum(),
            excluded: apps.iter().map(|a| a.resolution.excluded.len()).sum(),
            diagnostics: apps
                .iter()
                .map(|a| a.diagnostics.len() + a.resolution.diagnostics.len())
                .sum(),
            per_kind,
            coverage: percentage(covered, schema),
            elapsed_ms,
        }
    }
}

/// Complete output of `cfinder run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub version: String,
    pub root: PathBuf,
    pub catalog: CatalogInfo,
    pub apps: Vec<AppReport>,
    pub summary: RunSummary,
}
