//! Analysis pipeline: drives scanner → parsers → registry → matcher →
//! resolver → schema → comparator for every application of a run.
//!
//! Applications run in parallel on a dedicated rayon pool. Within one
//! application the file phase (parse, class extraction, matching) runs in
//! parallel with schema loading; the model registry is built once every
//! file is done, then resolution and comparison run.

pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use cfinder_core::config::{CfinderConfig, SchemaSourceKind};
use cfinder_core::errors::{Diagnostic, DiagnosticScope, PipelineError, PipelineResult};
use cfinder_core::events::{
    AnalysisEventHandler, AppCompleteEvent, AppStartedEvent, DiagnosticEvent, NoOpHandler,
    RunCompleteEvent, RunStartedEvent,
};

use crate::catalog::PatternCatalog;
use crate::comparator::Comparator;
use crate::constraints::IgnoreFilter;
use crate::matcher::{Finding, PatternMatcher};
use crate::parsers::ParserManager;
use crate::registry::{extract_classes, DeclaredClass, ModelRegistry};
use crate::resolver::{ConstraintResolver, Resolution};
use crate::scanner::{self, Application, SourceUnit};
use crate::schema::SchemaLoader;

pub use report::{AppReport, CatalogInfo, RunReport, RunSummary};

/// Output of the file phase for one source unit.
#[derive(Debug, Default)]
struct UnitOutcome {
    classes: Vec<DeclaredClass>,
    findings: Vec<Finding>,
    diagnostics: Vec<Diagnostic>,
}

/// Registry plus resolved candidates of one application.
#[derive(Debug)]
pub struct Inference {
    pub registry: ModelRegistry,
    pub findings: Vec<Finding>,
    pub resolution: Resolution,
    /// Parse, match and registry diagnostics; resolution diagnostics stay
    /// in `resolution`.
    pub diagnostics: Vec<Diagnostic>,
}

/// The configured analysis engine. Built once per run.
pub struct AnalysisEngine {
    config: CfinderConfig,
    parsers: ParserManager,
    matcher: PatternMatcher,
    schema: SchemaLoader,
    comparator: Comparator,
    filter: IgnoreFilter,
    handler: Arc<dyn AnalysisEventHandler>,
}

impl AnalysisEngine {
    /// Build an engine, loading the catalog named by `analysis.catalog`
    /// (or the built-in one).
    pub fn new(config: CfinderConfig) -> Result<Self, PipelineError> {
        let catalog = PatternCatalog::load(config.analysis.catalog.as_deref())?;
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: CfinderConfig, catalog: Arc<PatternCatalog>) -> Self {
        let filter = IgnoreFilter::from_config(&config.compare);
        Self {
            parsers: ParserManager::from_config(&config.analysis),
            matcher: PatternMatcher::new(catalog, &config.analysis),
            schema: SchemaLoader::new(&config.schema, filter.clone()),
            comparator: Comparator::from_config(&config.compare),
            filter,
            handler: Arc::new(NoOpHandler),
            config,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn AnalysisEventHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Look up `<app>.sql` / `<app>.json` in `dir` before the application
    /// root.
    pub fn with_schemas_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.schema = self.schema.with_schemas_dir(dir);
        self
    }

    pub fn config(&self) -> &CfinderConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PatternCatalog {
        self.matcher.catalog()
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Analyze every application under `root` (or `root` itself with
    /// `single`).
    pub fn run(&self, root: &Path, single: bool) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let apps = scanner::discover_applications(root, single)?;
        self.handler.on_run_started(&RunStartedEvent {
            root: root.to_path_buf(),
            mode: "run",
            app_count: apps.len(),
        });
        tracing::info!(
            root = %root.display(),
            apps = apps.len(),
            catalog = self.catalog().name(),
            patterns = self.catalog().len(),
            "run started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.scan.effective_threads())
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
        let mut reports: Vec<AppReport> =
            pool.install(|| apps.par_iter().map(|app| self.analyze_application(app)).collect());
        reports.sort_by(|a, b| a.app.cmp(&b.app));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let summary = RunSummary::from_apps(&reports, elapsed_ms);
        self.handler.on_run_complete(&RunCompleteEvent {
            apps: reports.len(),
            elapsed_ms,
        });
        tracing::info!(
            apps = summary.apps,
            candidates = summary.candidates,
            diagnostics = summary.diagnostics,
            elapsed_ms,
            "run complete"
        );

        Ok(RunReport {
            version: cfinder_core::constants::VERSION.to_string(),
            root: root.to_path_buf(),
            catalog: CatalogInfo::of(self.catalog()),
            apps: reports,
            summary,
        })
    }

    /// Analyze one application. Failures degrade the report, never abort.
    pub fn analyze_application(&self, app: &Application) -> AppReport {
        let started = Instant::now();

        // Step 1: Load sources
        let (sources, mut diagnostics) = match scanner::load_sources(app, &self.config.scan) {
            Ok(loaded) => loaded,
            Err(error) => {
                let diagnostic = Diagnostic::from_error(
                    DiagnosticScope::Application {
                        app: app.id.clone(),
                    },
                    &error,
                );
                self.emit(&diagnostic);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                return AppReport::unavailable(&app.id, app.root.clone(), vec![diagnostic], elapsed_ms);
            }
        };
        self.handler.on_app_started(&AppStartedEvent {
            app: app.id.clone(),
            file_count: sources.units.len(),
        });

        // Step 2: File phase and schema files, concurrently
        let (schema, inference) = rayon::join(
            || self.schema.load(app, &sources.sql_files),
            || self.infer(&app.id, &sources.units, Vec::new()),
        );
        diagnostics.extend(inference.diagnostics);

        // Step 3: Compare against the declared schema
        let (schema_source, comparison) = match schema {
            Ok(load) => {
                let declared = load.complete(&inference.registry, &self.filter);
                let comparison = self.comparator.compare(&inference.resolution.candidates, &declared);
                (Some(declared.source), Some(comparison))
            }
            Err(error) => {
                diagnostics.push(Diagnostic::from_error(
                    DiagnosticScope::Application {
                        app: app.id.clone(),
                    },
                    &error,
                ));
                (None, None)
            }
        };

        for diagnostic in diagnostics.iter().chain(&inference.resolution.diagnostics) {
            self.emit(diagnostic);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let report = AppReport {
            app: app.id.clone(),
            root: app.root.clone(),
            files: sources.units.len(),
            models: inference.registry.len(),
            findings: inference.findings.len(),
            resolution: inference.resolution,
            schema_source,
            comparison,
            diagnostics,
            elapsed_ms,
        };
        let missing = report.missing_count();
        tracing::info!(
            app = %report.app,
            files = report.files,
            findings = report.findings,
            candidates = report.resolution.candidates.len(),
            missing,
            schema = report.schema_source.as_ref().map_or("unavailable", SchemaSourceKind::name),
            elapsed_ms,
            "application analyzed"
        );
        self.handler.on_app_complete(&AppCompleteEvent {
            app: report.app.clone(),
            findings: report.findings,
            candidates: report.resolution.candidates.len(),
            missing,
            schema_available: report.comparison.is_some(),
            elapsed_ms,
        });
        report
    }

    /// Parse, extract and match every unit, build the registry (with any
    /// externally declared classes) and resolve the Findings.
    pub fn infer(&self, app: &str, units: &[SourceUnit], external: Vec<DeclaredClass>) -> Inference {
        let outcomes: Vec<UnitOutcome> = units.par_iter().map(|unit| self.process_unit(unit)).collect();

        let mut classes = external;
        let mut findings = Vec::new();
        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            classes.extend(outcome.classes);
            findings.extend(outcome.findings);
            diagnostics.extend(outcome.diagnostics);
        }
        findings.sort();

        let registry = ModelRegistry::build(app, classes, &self.config.analysis.effective_model_bases());
        diagnostics.extend(registry.diagnostics().iter().cloned());

        let resolution = ConstraintResolver::new(
            &registry,
            &self.filter,
            self.config.analysis.effective_max_unique_columns(),
        )
        .resolve_all(&findings);

        Inference {
            registry,
            findings,
            resolution,
            diagnostics,
        }
    }

    /// Extract model classes only, for model files declared outside the
    /// analyzed sources.
    pub fn declared_classes(&self, units: &[SourceUnit]) -> PipelineResult<Vec<DeclaredClass>> {
        let mut result: PipelineResult<Vec<DeclaredClass>> = PipelineResult::default();
        for unit in units {
            match self.parsers.parse_unit(unit) {
                Ok(tree) => {
                    if let Some(partial) = tree.partial_error() {
                        result.add_diagnostic(Diagnostic::from_error(file_scope(unit), &partial));
                    }
                    result
                        .data
                        .extend(extract_classes(&tree.root, &unit.rel_path, &unit.app_label()));
                }
                Err(error) => result.add_diagnostic(Diagnostic::from_error(file_scope(unit), &error)),
            }
        }
        result
    }

    fn process_unit(&self, unit: &SourceUnit) -> UnitOutcome {
        let tree = match self.parsers.parse_unit(unit) {
            Ok(tree) => tree,
            Err(error) => {
                tracing::debug!(file = %unit.rel_path, %error, "file skipped");
                return UnitOutcome {
                    diagnostics: vec![Diagnostic::from_error(file_scope(unit), &error)],
                    ..Default::default()
                };
            }
        };
        // Recovered regions of a partial tree are still analyzed.
        let mut diagnostics: Vec<Diagnostic> = tree
            .partial_error()
            .map(|partial| Diagnostic::from_error(file_scope(unit), &partial))
            .into_iter()
            .collect();
        let classes = extract_classes(&tree.root, &unit.rel_path, &unit.app_label());
        let findings = match self.matcher.match_tree(&tree, unit) {
            Ok(findings) => findings,
            Err(error) => {
                diagnostics.push(Diagnostic::from_error(file_scope(unit), &error));
                Vec::new()
            }
        };
        UnitOutcome {
            classes,
            findings,
            diagnostics,
        }
    }

    fn emit(&self, diagnostic: &Diagnostic) {
        diagnostic.log();
        self.handler.on_diagnostic(&DiagnosticEvent {
            diagnostic: diagnostic.clone(),
        });
    }
}

fn file_scope(unit: &SourceUnit) -> DiagnosticScope {
    DiagnosticScope::File {
        app: unit.app.clone(),
        path: unit.rel_path.clone(),
    }
}
