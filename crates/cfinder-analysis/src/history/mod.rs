//! History-issue mode: runs inference over a fixed dataset of snippets and
//! measures how many of the constraints that fixed past issues are found.

pub mod manifest;
pub mod report;

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use cfinder_core::errors::{Diagnostic, DiagnosticScope, PipelineError, ScanError};

use crate::comparator::MatchOutcome;
use crate::pipeline::{AnalysisEngine, CatalogInfo};
use crate::resolver::ConstraintCandidate;
use crate::scanner::{self, Application, SourceUnit};

pub use manifest::{HistoryApplication, HistoryIssue, HistoryManifest};
pub use report::{HistoryReport, IssueOutcome, KindRecall, RecallSummary};

/// Evaluates a history dataset with a configured engine.
pub struct HistoryRunner<'e> {
    engine: &'e AnalysisEngine,
}

impl<'e> HistoryRunner<'e> {
    pub fn new(engine: &'e AnalysisEngine) -> Self {
        Self { engine }
    }

    /// Load the manifest at `path` and evaluate it. An invalid manifest
    /// aborts the run.
    pub fn run(&self, path: &Path) -> Result<HistoryReport, PipelineError> {
        let manifest = HistoryManifest::load(path)?;
        Ok(self.evaluate(&manifest, path))
    }

    pub fn evaluate(&self, manifest: &HistoryManifest, path: &Path) -> HistoryReport {
        let started = Instant::now();
        tracing::info!(
            manifest = %path.display(),
            applications = manifest.applications.len(),
            issues = manifest.issues.len(),
            "history run started"
        );

        let per_app: Vec<(Vec<IssueOutcome>, Vec<Diagnostic>)> = manifest
            .applications
            .par_iter()
            .map(|app| self.evaluate_application(manifest, app))
            .collect();

        let mut issues = Vec::new();
        let mut diagnostics = Vec::new();
        for (outcomes, diags) in per_app {
            issues.extend(outcomes);
            diagnostics.extend(diags);
        }
        issues.sort_by(|a, b| a.id.cmp(&b.id));
        diagnostics.sort();

        let summary = RecallSummary::from_outcomes(&issues);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            total = summary.total,
            matched = summary.matched,
            recall = summary.recall.unwrap_or(0.0),
            elapsed_ms,
            "history run complete"
        );
        HistoryReport {
            version: cfinder_core::constants::VERSION.to_string(),
            manifest: path.to_path_buf(),
            catalog: CatalogInfo::of(self.engine.catalog()),
            issues,
            summary,
            diagnostics,
            elapsed_ms,
        }
    }

    fn evaluate_application(
        &self,
        manifest: &HistoryManifest,
        app: &HistoryApplication,
    ) -> (Vec<IssueOutcome>, Vec<Diagnostic>) {
        let application = Application::new(app.id.as_str(), app.dir.as_path());
        let (units, mut diagnostics) = match scanner::load_sources(&application, &self.engine.config().scan) {
            Ok((sources, diagnostics)) => (sources.units, diagnostics),
            Err(error) => (Vec::new(), vec![app_diagnostic(&app.id, &error)]),
        };

        let mut model_units = Vec::new();
        for path in &app.models {
            match read_model_file(&app.id, path) {
                Ok(unit) => model_units.push(unit),
                Err(error) => diagnostics.push(app_diagnostic(&app.id, &error)),
            }
        }
        let external = self.engine.declared_classes(&model_units);
        diagnostics.extend(external.diagnostics);

        let inference = self.engine.infer(&app.id, &units, external.data);
        diagnostics.extend(inference.diagnostics);
        diagnostics.extend(inference.resolution.diagnostics.iter().cloned());
        for diagnostic in &diagnostics {
            diagnostic.log();
        }

        let outcomes = manifest
            .issues_of(&app.id)
            .filter_map(|issue| self.evaluate_issue(issue, &inference.resolution.candidates))
            .collect();
        (outcomes, diagnostics)
    }

    fn evaluate_issue(&self, issue: &HistoryIssue, candidates: &[ConstraintCandidate]) -> Option<IssueOutcome> {
        let expected = issue.expected().ok()?;
        let comparator = self.engine.comparator();
        let hit = candidates.iter().find(|candidate| {
            candidate.identity.kind == issue.kind
                && issue.accepts_files(candidate.files().into_iter())
                && comparator.outcome(&candidate.identity, candidate.delete_behavior, &expected)
                    == MatchOutcome::Match
        });
        tracing::debug!(issue = %issue.id, matched = hit.is_some(), "issue evaluated");
        Some(IssueOutcome {
            id: issue.id.clone(),
            app: issue.app.clone(),
            kind: issue.kind,
            expected: expected.identity,
            matched: hit.is_some(),
            candidate: hit.map(|c| c.identity.clone()),
            pattern_ids: hit
                .map(|c| c.pattern_ids().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}

/// Load a model file declared outside the snippet directory. Its parent
/// directory stays in the relative path so the app label is derived from it.
fn read_model_file(app: &str, path: &Path) -> Result<SourceUnit, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScanError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base = path.parent().and_then(Path::parent).unwrap_or_else(|| Path::new(""));
    let mut unit = SourceUnit::from_text(app, &scanner::rel_path(base, path), &text);
    unit.path = path.to_path_buf();
    Ok(unit)
}

fn app_diagnostic(app: &str, error: &ScanError) -> Diagnostic {
    Diagnostic::from_error(
        DiagnosticScope::Application {
            app: app.to_string(),
        },
        error,
    )
}
