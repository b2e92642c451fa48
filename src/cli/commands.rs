//! Command handlers. I/O stays here; everything they call is library code.

use crate::cli::args::{Commands, OutputFormat, ScanArgs};
use crate::cli::config_builder::build_config;
use crate::commit::CommitSuggester;
use crate::io::write_output;
use crate::observability::init_logging;
use crate::pipeline::AnalysisEngine;
use crate::progress::ProgressConfig;
use crate::errors::WarningKind;
use crate::AnalysisReport;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze {
            path,
            format,
            output,
            scan,
        } => handle_analyze_command(&path, format, output.as_deref(), &scan),
        Commands::CommitMessage {
            path,
            description,
            scan,
        } => handle_commit_message_command(&path, description.as_deref(), &scan),
        Commands::ClearCache { path, verbosity } => {
            init_logging(verbosity);
            handle_clear_cache_command(&path)
        }
    }
}

fn resolve_root(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Cannot access project root {}", path.display()))
}

fn analyze(root: &Path, scan: &ScanArgs) -> Result<AnalysisReport> {
    init_logging(scan.verbosity);
    let config = build_config(root, scan)?;
    let engine = AnalysisEngine::new(config).with_progress(ProgressConfig::from_env(scan.quiet));
    let report = engine
        .analyze(root)
        .with_context(|| format!("Analysis of {} failed", root.display()))?;
    Ok(report)
}

pub fn handle_analyze_command(
    path: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    scan: &ScanArgs,
) -> Result<()> {
    let root = resolve_root(path)?;
    let report = analyze(&root, scan)?;
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Summary => report.summary_line(),
    };
    write_output(output, &rendered)
}

pub fn handle_commit_message_command(
    path: &Path,
    description: Option<&str>,
    scan: &ScanArgs,
) -> Result<()> {
    let root = resolve_root(path)?;
    let report = analyze(&root, scan)?;
    let rendered = render_commit_message(&report, description)
        .with_context(|| format!("Cannot suggest a commit message for {}", root.display()))?;
    write_output(None, &rendered)
}

/// Commit message plus review notes, built from the git status the report was computed against.
pub fn render_commit_message(report: &AnalysisReport, description: Option<&str>) -> Result<String> {
    let status = report.git_status.as_ref().ok_or_else(|| {
        let reason = report
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::NoGitContext)
            .map(|w| w.message.clone())
            .unwrap_or_else(|| "git status was not read".to_string());
        anyhow!("no git status available: {}", reason)
    })?;
    let suggestion = CommitSuggester::suggest(status, report, description);

    let mut rendered = suggestion.message();
    let notes = suggestion.review_lines();
    if !notes.is_empty() {
        rendered.push_str("\n\nReview notes:\n");
        rendered.push_str(&notes.join("\n"));
    }
    Ok(rendered)
}

pub fn handle_clear_cache_command(path: &Path) -> Result<()> {
    let root = resolve_root(path)?;
    let config = crate::config::load_config(&root)?;
    AnalysisEngine::new(config)
        .clear_cache(&root)
        .with_context(|| format!("Failed to clear cache for {}", root.display()))?;
    eprintln!("Cache cleared for {}", root.display());
    Ok(())
}
