use crate::core::{Category, Finding, Language, Severity};
use crate::errors::ScanWarning;
use crate::git::{GitState, GitStatusSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Why a candidate file was not analyzed this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Over the configured size ceiling
    TooLarge,
    /// Not reached within the scan budget
    Budget,
    /// Not started before cancellation
    Cancelled,
    /// Could not be read
    Unreadable,
}

impl SkipReason {
    /// Ignore rules are intentional; every other skip leaves the report partial.
    pub fn leaves_report_incomplete(&self) -> bool {
        !matches!(self, SkipReason::TooLarge)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

impl SkippedFile {
    pub fn new(path: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAccounting {
    /// Files analyzed by the detectors this run
    pub scanned: usize,
    /// Files whose findings were reused from the last run
    pub cached: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
}

impl ScanAccounting {
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub detector_errors: usize,
    pub detector_timeouts: usize,
}

impl ReportSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut by_category: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut detector_errors = 0;
        let mut detector_timeouts = 0;

        for finding in findings {
            *by_category.entry(finding.category).or_insert(0) += 1;
            *by_severity.entry(finding.severity).or_insert(0) += 1;
            match finding.rule.as_str() {
                crate::core::DETECTOR_ERROR => detector_errors += 1,
                crate::core::DETECTOR_TIMEOUT => detector_timeouts += 1,
                _ => {}
            }
        }

        Self {
            total: findings.len(),
            by_category,
            by_severity,
            detector_errors,
            detector_timeouts,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Codebase-wide size metrics over every analyzed or cached file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseMetrics {
    pub files: usize,
    pub lines: usize,
    pub functions: usize,
    /// File count per language
    pub languages: BTreeMap<Language, usize>,
    /// Files over the large-file threshold
    pub large_files: Vec<String>,
}

/// A file's risk score this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePriority {
    pub path: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitState>,
    pub summary: ReportSummary,
    pub scan: ScanAccounting,
    pub metrics: CodebaseMetrics,
    pub warnings: Vec<ScanWarning>,
    /// Every scanned or cached file, highest priority first
    #[serde(default)]
    pub priorities: Vec<FilePriority>,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_status: Option<GitStatusSnapshot>,
}

impl AnalysisReport {
    /// False when the run degraded, skipped work or lost detector output.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
            && self.summary.detector_errors == 0
            && self.summary.detector_timeouts == 0
            && self
                .scan
                .skipped
                .iter()
                .all(|(reason, count)| *count == 0 || !reason.leaves_report_incomplete())
    }

    /// The `n` highest-priority findings: most severe first, then by file priority.
    pub fn top_findings(&self, n: usize) -> &[Finding] {
        &self.findings[..n.min(self.findings.len())]
    }

    /// Findings whose path is in `paths`, in report order.
    pub fn findings_in(&self, paths: &BTreeSet<String>) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| paths.contains(&f.path))
            .collect()
    }

    pub fn findings_for(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category == category)
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        format!(
            "{} findings (security {}, performance {}, maintainability {}; critical {}, high {}) in {} scanned / {} cached / {} skipped files{}",
            self.summary.total,
            self.summary.count(Category::Security),
            self.summary.count(Category::Performance),
            self.summary.count(Category::Maintainability),
            self.summary.severity_count(Severity::Critical),
            self.summary.severity_count(Severity::High),
            self.scan.scanned,
            self.scan.cached,
            self.scan.total_skipped(),
            if self.is_complete() { "" } else { " (incomplete)" }
        )
    }
}
