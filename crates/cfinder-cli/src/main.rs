//! `cfinder`: infer database constraints from Django application code and
//! compare them with the declared schema.
//!
//! ## Commands
//!
//! - `cfinder run <root>` - analyze every application under `root`
//! - `cfinder history <manifest>` - evaluate a history-issue dataset
//! - `cfinder catalog` - validate and list the active pattern catalog
//!
//! Reports are JSON on stdout (or `--out`); logs go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use cfinder_analysis::catalog::PatternCatalog;
use cfinder_analysis::history::HistoryRunner;
use cfinder_analysis::pipeline::CatalogInfo;
use cfinder_analysis::AnalysisEngine;
use cfinder_core::config::{CfinderConfig, CliOverrides};
use cfinder_core::events::{AnalysisEventHandler, AppCompleteEvent, RunStartedEvent};

#[derive(Debug, Parser)]
#[command(name = "cfinder", version, about = "Database constraint inference for Django applications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze applications and compare inferred constraints with their schemas
    Run(RunArgs),

    /// Measure recall against a dataset of past constraint issues
    History(HistoryArgs),

    /// Validate and list the active pattern catalog
    Catalog(CatalogArgs),
}

/// Options shared by every command.
#[derive(Debug, Args)]
struct CommonArgs {
    /// Pattern catalog file (defaults to the built-in catalog)
    #[arg(long)]
    catalog: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Args)]
struct AnalysisArgs {
    /// Worker threads (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum statements spanned by one pattern
    #[arg(long)]
    window: Option<usize>,

    /// Per-file parse and match budget in milliseconds
    #[arg(long)]
    budget_ms: Option<u64>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory holding one subdirectory per application
    root: PathBuf,

    /// Treat `root` itself as the only application
    #[arg(long)]
    single: bool,

    /// Directory with `<app>.sql` or `<app>.json` schema files
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Declared schema source: auto, sql, json, models
    #[arg(long)]
    schema_source: Option<String>,

    /// SQL dialect of DDL files: generic, postgres, mysql, sqlite
    #[arg(long)]
    dialect: Option<String>,

    #[command(flatten)]
    analysis: AnalysisArgs,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    /// Dataset manifest (`history.toml`)
    manifest: PathBuf,

    #[command(flatten)]
    analysis: AnalysisArgs,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct CatalogArgs {
    #[command(flatten)]
    common: CommonArgs,
}

/// Logs per-application progress.
struct ProgressLogger;

impl AnalysisEventHandler for ProgressLogger {
    fn on_run_started(&self, event: &RunStartedEvent) {
        tracing::info!(root = %event.root.display(), apps = event.app_count, "analyzing");
    }

    fn on_app_complete(&self, event: &AppCompleteEvent) {
        tracing::info!(
            app = %event.app,
            candidates = event.candidates,
            missing = event.missing,
            schema = event.schema_available,
            elapsed_ms = event.elapsed_ms,
            "done"
        );
    }
}

fn main() -> Result<()> {
    cfinder_core::tracing::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::History(args) => history(args),
        Command::Catalog(args) => catalog(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let overrides = CliOverrides {
        schema_source: args.schema_source.clone(),
        schema_dialect: args.dialect.clone(),
        ..overrides(&args.analysis, &args.common)
    };
    let config = CfinderConfig::load(&args.root, Some(&overrides)).context("loading configuration")?;
    let engine = AnalysisEngine::new(config)
        .context("building analysis engine")?
        .with_schemas_dir(args.schemas.clone())
        .with_handler(Arc::new(ProgressLogger));
    let report = engine
        .run(&args.root, args.single)
        .with_context(|| format!("analyzing {}", args.root.display()))?;
    write_report(&report, &args.common)
}

fn history(args: HistoryArgs) -> Result<()> {
    let base = args.manifest.parent().unwrap_or_else(|| Path::new("."));
    let config = CfinderConfig::load(base, Some(&overrides(&args.analysis, &args.common)))
        .context("loading configuration")?;
    let engine = AnalysisEngine::new(config).context("building analysis engine")?;
    let report = HistoryRunner::new(&engine)
        .run(&args.manifest)
        .with_context(|| format!("evaluating {}", args.manifest.display()))?;
    write_report(&report, &args.common)
}

fn catalog(args: CatalogArgs) -> Result<()> {
    #[derive(Serialize)]
    struct Listing {
        catalog: CatalogInfo,
        patterns: Vec<cfinder_analysis::catalog::PatternSummary>,
    }

    let catalog = PatternCatalog::load(args.common.catalog.as_deref()).context("loading pattern catalog")?;
    let listing = Listing {
        catalog: CatalogInfo::of(&catalog),
        patterns: catalog.summaries(),
    };
    write_report(&listing, &args.common)
}

fn overrides(analysis: &AnalysisArgs, common: &CommonArgs) -> CliOverrides {
    CliOverrides {
        scan_threads: analysis.threads,
        analysis_window: analysis.window,
        analysis_file_budget_ms: analysis.budget_ms,
        analysis_catalog: common.catalog.clone(),
        ..Default::default()
    }
}

fn write_report<T: Serialize>(report: &T, common: &CommonArgs) -> Result<()> {
    let json = if common.pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("serializing report")?;
    match &common.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("writing report")?;
        }
    }
    Ok(())
}
