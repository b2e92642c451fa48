//! Merging per-file findings into one report.
//!
//! The merge is a pure function of its inputs: files, findings, skipped
//! entries and warnings are all put into a canonical order before anything
//! is computed, so any permutation of the input yields the same report.
//!
//! Findings are listed most severe first. Within a severity, findings of
//! higher-priority files come first, then by path and location.

pub mod report;

pub use report::{
    AnalysisReport, CodebaseMetrics, FilePriority, ReportSummary, ScanAccounting, SkipReason,
    SkippedFile,
};

use crate::core::{Category, FileMetrics, Finding, Language, LineRange};
use crate::detectors::maintainability::MAX_FILE_LINES;
use crate::errors::ScanWarning;
use crate::git::GitStatusSnapshot;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet};

/// Where a file's findings came from this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    Scanned,
    Cached,
}

/// Findings and metrics of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFindings {
    pub path: String,
    pub language: Language,
    pub metrics: FileMetrics,
    pub source: FileSource,
    /// Risk score the file was ranked with this run, in `[0.0, 1.0]`
    #[serde(default)]
    pub priority: f64,
    pub findings: Vec<Finding>,
}

impl FileFindings {
    pub fn scanned(path: impl Into<String>, language: Language, findings: Vec<Finding>) -> Self {
        Self {
            path: path.into(),
            language,
            metrics: FileMetrics::default(),
            source: FileSource::Scanned,
            priority: 0.0,
            findings,
        }
    }

    pub fn with_metrics(mut self, metrics: FileMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn cached(mut self) -> Self {
        self.source = FileSource::Cached;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DedupKey {
    path: String,
    line_range: Option<LineRange>,
    category: Category,
    origin: Option<(String, String)>,
}

impl DedupKey {
    fn of(finding: &Finding) -> Self {
        // Findings without a location only collapse with copies from the same rule
        let origin = (finding.line_range.is_none() || finding.is_diagnostic())
            .then(|| (finding.detector.clone(), finding.rule.clone()));
        Self {
            path: finding.path.clone(),
            line_range: finding.line_range,
            category: finding.category,
            origin,
        }
    }
}

// Pure function: which duplicate survives
fn survivor_order(a: &Finding, b: &Finding) -> Ordering {
    (Reverse(a.severity), &a.detector, &a.rule, &a.message)
        .cmp(&(Reverse(b.severity), &b.detector, &b.rule, &b.message))
}

/// Collapse duplicates: same path, line range and category.
///
/// The highest severity wins, ties broken by detector id, rule and message.
/// The ids of the dropped copies' detectors are recorded on the survivor.
pub fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut groups: BTreeMap<DedupKey, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        groups.entry(DedupKey::of(&finding)).or_default().push(finding);
    }

    let mut merged: Vec<Finding> = groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_by(survivor_order);
            let mut iter = group.into_iter();
            let mut survivor = iter.next()?;
            let mut suppressed: BTreeSet<String> =
                survivor.suppressed_detectors.drain(..).collect();
            for loser in iter {
                suppressed.insert(loser.detector);
                suppressed.extend(loser.suppressed_detectors);
            }
            suppressed.remove(&survivor.detector);
            survivor.suppressed_detectors = suppressed.into_iter().collect();
            Some(survivor)
        })
        .collect();
    merged.sort();
    merged
}

fn metrics_of(files: &[FileFindings]) -> CodebaseMetrics {
    let mut metrics = CodebaseMetrics::default();
    for file in files {
        metrics.files += 1;
        metrics.lines += file.metrics.lines;
        metrics.functions += file.metrics.functions;
        *metrics.languages.entry(file.language).or_insert(0) += 1;
        if file.metrics.lines > MAX_FILE_LINES {
            metrics.large_files.push(file.path.clone());
        }
    }
    metrics.large_files.sort();
    metrics
}

// Pure function: one score per path, highest first, ties by path
fn priorities_of(files: &[FileFindings]) -> Vec<FilePriority> {
    let mut scores: BTreeMap<&str, f64> = BTreeMap::new();
    for file in files {
        let score = scores.entry(file.path.as_str()).or_insert(file.priority);
        *score = score.max(file.priority);
    }
    let mut priorities: Vec<FilePriority> = scores
        .into_iter()
        .map(|(path, score)| FilePriority {
            path: path.to_string(),
            score,
        })
        .collect();
    priorities.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
    priorities
}

/// Order findings by severity, then file priority, then path and location.
pub fn order_by_priority(findings: &mut [Finding], priorities: &[FilePriority]) {
    let scores: BTreeMap<&str, f64> = priorities
        .iter()
        .map(|p| (p.path.as_str(), p.score))
        .collect();
    let score = |finding: &Finding| scores.get(finding.path.as_str()).copied().unwrap_or(0.0);
    findings.sort_by(|a, b| {
        Reverse(a.severity)
            .cmp(&Reverse(b.severity))
            .then_with(|| score(b).total_cmp(&score(a)))
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.report_order(b))
    });
}

/// Builds an [`AnalysisReport`] from per-file results plus run context.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    run_id: String,
    git_status: Option<GitStatusSnapshot>,
    warnings: Vec<ScanWarning>,
    skipped: Vec<SkippedFile>,
}

impl Aggregator {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    pub fn with_git_status(mut self, snapshot: Option<GitStatusSnapshot>) -> Self {
        self.git_status = snapshot;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<ScanWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_skipped(mut self, skipped: Vec<SkippedFile>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn merge(&self, files: Vec<FileFindings>) -> AnalysisReport {
        let mut files = files;
        files.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.source.cmp(&b.source)));

        let mut scan = ScanAccounting::default();
        for file in &files {
            match file.source {
                FileSource::Scanned => scan.scanned += 1,
                FileSource::Cached => scan.cached += 1,
            }
        }
        let mut skipped = self.skipped.clone();
        skipped.sort();
        skipped.dedup();
        for entry in &skipped {
            *scan.skipped.entry(entry.reason).or_insert(0) += 1;
        }
        scan.skipped_files = skipped;

        let mut warnings = self.warnings.clone();
        warnings.sort();
        warnings.dedup();

        let metrics = metrics_of(&files);
        let priorities = priorities_of(&files);
        let mut findings = dedup(files.into_iter().flat_map(|f| f.findings).collect());
        order_by_priority(&mut findings, &priorities);
        let summary = ReportSummary::from_findings(&findings);

        AnalysisReport {
            run_id: self.run_id.clone(),
            git: self.git_status.as_ref().map(GitStatusSnapshot::state),
            summary,
            scan,
            metrics,
            warnings,
            priorities,
            findings,
            git_status: self.git_status.clone(),
        }
    }
}

/// Merge file results with no run context attached.
pub fn merge_files(files: Vec<FileFindings>) -> AnalysisReport {
    Aggregator::default().merge(files)
}
