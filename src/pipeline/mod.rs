//! End-to-end analysis run.
//!
//! Walker -> change tracker -> prioritizer and budget -> worker pool running
//! the detector set -> aggregator. The git snapshot is read once up front;
//! it drives the recency signal and is attached to the report.
//!
//! Workers pull files from the priority-ordered queue one at a time and take
//! each file through read, fingerprint and detectors before pulling the
//! next. Cancellation and the duration budget are checked only between
//! files, so a started file always finishes.

pub mod cancellation;

pub use cancellation::CancellationToken;

use crate::aggregation::{AnalysisReport, Aggregator, FileFindings, SkipReason, SkippedFile};
use crate::cache::{CacheLocation, ChangeTracker, Fingerprint, PreCheck, TrackedEntry};
use crate::config::CodetriageConfig;
use crate::core::FileRecord;
use crate::detectors::{measure, DetectorRegistry, DetectorRunner};
use crate::errors::{Result, ScanWarning, WarningKind};
use crate::git::{GitContextProvider, GitError, GitStatusSnapshot};
use crate::io::{FileWalker, IgnoreRules, WalkItem};
use crate::observability::{increment_processed, set_current_file, set_phase, set_progress, AnalysisPhase};
use crate::priority::{budget, Prioritizer, RankedFile, ScanBudget};
use crate::progress::ProgressConfig;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// What the walk produced.
#[derive(Debug, Default)]
struct WalkOutcome {
    files: Vec<FileRecord>,
    skipped: Vec<SkippedFile>,
    warnings: Vec<ScanWarning>,
}

/// Result of the fingerprint check for one file.
enum Classified {
    Cached(FileFindings, FileRecord),
    Changed(FileRecord),
    Unreadable(SkippedFile, ScanWarning),
}

/// Result of processing one scheduled file.
enum Processed {
    Done(FileFindings),
    Skipped(SkippedFile),
    Unreadable(SkippedFile, ScanWarning),
}

pub struct AnalysisEngine {
    config: CodetriageConfig,
    registry: DetectorRegistry,
    cache_dir: Option<PathBuf>,
    use_git: bool,
    cancellation: CancellationToken,
    progress: ProgressConfig,
}

impl AnalysisEngine {
    pub fn new(config: CodetriageConfig) -> Self {
        let registry = DetectorRegistry::builtin()
            .only(&config.detectors.enabled_categories())
            .without(&config.detectors.disabled);
        Self {
            config,
            registry,
            cache_dir: None,
            use_git: true,
            cancellation: CancellationToken::new(),
            progress: ProgressConfig::hidden(),
        }
    }

    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Keep the fingerprint index under `dir` instead of the user cache dir.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn without_git(mut self) -> Self {
        self.use_git = false;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &CodetriageConfig {
        &self.config
    }

    fn cache_location(&self, root: &Path) -> CacheLocation {
        match &self.cache_dir {
            Some(dir) => CacheLocation::in_dir(dir, root),
            None => CacheLocation::resolve(root),
        }
    }

    fn open_tracker(&self, root: &Path) -> ChangeTracker {
        if self.config.cache.enabled {
            ChangeTracker::open(self.cache_location(root))
        } else {
            ChangeTracker::in_memory()
        }
    }

    /// Forget the persisted fingerprint index of `root`.
    pub fn clear_cache(&self, root: &Path) -> Result<()> {
        ChangeTracker::open(self.cache_location(root)).clear()?;
        Ok(())
    }

    fn budget(&self) -> ScanBudget {
        ScanBudget {
            max_files: self.config.budget.max_files,
            max_duration: self.config.budget.max_duration(),
        }
    }

    /// Analyze the working tree under `root`.
    ///
    /// Fails only on fatal conditions (unreadable root, worker pool). Every
    /// degraded condition is recorded in the report instead.
    pub fn analyze(&self, root: &Path) -> Result<AnalysisReport> {
        let started = Instant::now();
        let run_id = new_run_id(root);
        let _span = tracing::info_span!("analyze", root = %root.display(), run_id = %run_id).entered();

        let walked = self.walk(root)?;
        let mut warnings = walked.warnings;
        let mut skipped = walked.skipped;
        let live: HashSet<String> = walked
            .files
            .iter()
            .map(|f| f.path.clone())
            .chain(skipped.iter().map(|s| s.path.clone()))
            .collect();

        let tracker = self.open_tracker(root);
        if let Some(warning) = tracker.load_warning() {
            warnings.push(warning.clone());
        }

        let git_status = self.git_snapshot(root, &mut warnings);
        let recent: HashSet<String> = git_status
            .as_ref()
            .map(|s| s.changed_paths().into_iter().collect())
            .unwrap_or_default();
        let prioritizer = Prioritizer::new(self.config.scoring.clone());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallel.worker_count())
            .thread_name(|i| format!("codetriage-worker-{}", i))
            .build()?;

        let mut results = Vec::new();
        let mut changed = Vec::new();
        for classified in self.fingerprint(&pool, walked.files, &tracker) {
            match classified {
                Classified::Cached(file, record) => {
                    let score = prioritizer.score(&record, &tracker, &recent);
                    results.push(file.with_priority(score.value));
                }
                Classified::Changed(record) => changed.push(record),
                Classified::Unreadable(skip, warning) => {
                    skipped.push(skip);
                    warnings.push(warning);
                }
            }
        }

        let plan = {
            let _phase = set_phase(AnalysisPhase::Prioritize);
            let _span = tracing::debug_span!("phase", phase = %AnalysisPhase::Prioritize).entered();
            let ranked = prioritizer.rank(changed, &tracker, &recent);
            budget::plan(ranked, &self.budget())
        };
        tracing::debug!(
            cached = results.len(),
            scheduled = plan.scheduled.len(),
            over_budget = plan.over_budget.len(),
            "Scan planned"
        );
        skipped.extend(
            plan.over_budget
                .iter()
                .map(|r| SkippedFile::new(r.record.path.clone(), SkipReason::Budget)),
        );

        let deadline = self.budget().deadline(started);
        for processed in self.detect(&pool, plan.scheduled, &tracker, deadline) {
            match processed {
                Processed::Done(file) => results.push(file),
                Processed::Skipped(skip) => skipped.push(skip),
                Processed::Unreadable(skip, warning) => {
                    skipped.push(skip);
                    warnings.push(warning);
                }
            }
        }

        let _phase = set_phase(AnalysisPhase::Aggregate);
        let _span = tracing::debug_span!("phase", phase = %AnalysisPhase::Aggregate).entered();
        if let Some(warning) = tracker.flush(&live) {
            warnings.push(warning);
        }
        let report = Aggregator::new(run_id)
            .with_git_status(git_status)
            .with_warnings(warnings)
            .with_skipped(skipped)
            .merge(results);

        tracing::info!(
            findings = report.summary.total,
            scanned = report.scan.scanned,
            cached = report.scan.cached,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(report)
    }

    fn walk(&self, root: &Path) -> Result<WalkOutcome> {
        let _phase = set_phase(AnalysisPhase::Walk);
        let _span = tracing::debug_span!("phase", phase = %AnalysisPhase::Walk).entered();
        let rules = IgnoreRules::from_config(&self.config.ignore)?;
        let spinner = self.progress.spinner("Discovering files");

        let mut outcome = WalkOutcome::default();
        for item in FileWalker::new(root.to_path_buf()).with_rules(rules).walk()? {
            match item {
                WalkItem::File(record) => {
                    spinner.inc(1);
                    outcome.files.push(record);
                }
                WalkItem::TooLarge { path, .. } => {
                    outcome.skipped.push(SkippedFile::new(path, SkipReason::TooLarge))
                }
                WalkItem::Warning(warning) => outcome.warnings.push(warning),
            }
        }
        spinner.finish_and_clear();
        tracing::debug!(files = outcome.files.len(), "Walk finished");
        Ok(outcome)
    }

    fn git_snapshot(&self, root: &Path, warnings: &mut Vec<ScanWarning>) -> Option<GitStatusSnapshot> {
        if !self.use_git {
            return None;
        }
        match GitContextProvider::snapshot(root) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                let message = match &e {
                    GitError::NotARepository { .. } => {
                        "not a git repository; recency signal disabled".to_string()
                    }
                    other => format!("git status unavailable: {}", other),
                };
                tracing::warn!("{}", message);
                warnings.push(ScanWarning::new(WarningKind::NoGitContext, message));
                None
            }
        }
    }

    fn fingerprint(
        &self,
        pool: &rayon::ThreadPool,
        files: Vec<FileRecord>,
        tracker: &ChangeTracker,
    ) -> Vec<Classified> {
        let _span = tracing::debug_span!("phase", phase = %AnalysisPhase::Fingerprint).entered();
        pool.install(|| {
            files
                .into_par_iter()
                .map(|record| {
                    let _phase = set_phase(AnalysisPhase::Fingerprint);
                    classify(record, tracker)
                })
                .collect()
        })
    }

    fn detect(
        &self,
        pool: &rayon::ThreadPool,
        queue: Vec<RankedFile>,
        tracker: &ChangeTracker,
        deadline: Option<Instant>,
    ) -> Vec<Processed> {
        let _span = tracing::debug_span!("phase", phase = %AnalysisPhase::Detect).entered();
        let runner = DetectorRunner::new(self.registry.clone())
            .with_timeout(self.config.parallel.detector_timeout());
        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(queue.len()));
        let bar = self.progress.file_bar(queue.len() as u64, "Analyzing");
        set_progress(0, queue.len());

        let workers = pool.current_num_threads().min(queue.len());
        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(ranked) = queue.get(index) else {
                        break;
                    };
                    let processed = self.process(ranked, &runner, tracker, deadline);
                    results.lock().push(processed);
                    increment_processed();
                    bar.inc(1);
                });
            }
        });
        bar.finish_and_clear();
        results.into_inner()
    }

    fn process(
        &self,
        ranked: &RankedFile,
        runner: &DetectorRunner,
        tracker: &ChangeTracker,
        deadline: Option<Instant>,
    ) -> Processed {
        let record = &ranked.record;
        if self.cancellation.is_cancelled() {
            return Processed::Skipped(SkippedFile::new(record.path.clone(), SkipReason::Cancelled));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Processed::Skipped(SkippedFile::new(record.path.clone(), SkipReason::Budget));
        }

        let _phase = set_phase(AnalysisPhase::Detect);
        let _file = set_current_file(record.path.clone());
        let _span = tracing::debug_span!("analyze_file", path = %record.path).entered();

        let bytes = match std::fs::read(&record.absolute) {
            Ok(bytes) => bytes,
            Err(e) => return unreadable(record, e),
        };
        let content = String::from_utf8_lossy(&bytes);
        let findings = runner.run(&content, &record.metadata());
        let metrics = measure(&content, record.language);

        // Files with detector failures stay "changed" so the next run retries them
        if !findings.iter().any(|f| f.is_diagnostic()) {
            tracker.record_scanned(
                record.path.clone(),
                TrackedEntry {
                    fingerprint: Fingerprint::of_content(&bytes, record.modified),
                    language: record.language,
                    metrics,
                    findings: findings.clone(),
                },
            );
        }

        Processed::Done(
            FileFindings::scanned(record.path.clone(), record.language, findings)
                .with_metrics(metrics)
                .with_priority(ranked.score.value),
        )
    }
}

fn unreadable<T: From<(SkippedFile, ScanWarning)>>(record: &FileRecord, error: std::io::Error) -> T {
    tracing::warn!(path = %record.path, "Cannot read file: {}", error);
    T::from((
        SkippedFile::new(record.path.clone(), SkipReason::Unreadable),
        ScanWarning::new(WarningKind::UnreadableFile, error.to_string()).with_path(record.path.clone()),
    ))
}

impl From<(SkippedFile, ScanWarning)> for Processed {
    fn from((skip, warning): (SkippedFile, ScanWarning)) -> Self {
        Processed::Unreadable(skip, warning)
    }
}

impl From<(SkippedFile, ScanWarning)> for Classified {
    fn from((skip, warning): (SkippedFile, ScanWarning)) -> Self {
        Classified::Unreadable(skip, warning)
    }
}

fn cached_findings(path: &str, entry: TrackedEntry) -> FileFindings {
    FileFindings::scanned(path, entry.language, entry.findings)
        .with_metrics(entry.metrics)
        .cached()
}

/// Decide whether a file must be rescanned, reusing the last result if not.
fn classify(mut record: FileRecord, tracker: &ChangeTracker) -> Classified {
    if tracker.precheck(&record.path, record.size, record.modified) == PreCheck::Unchanged {
        if let Some(entry) = tracker.cached(&record.path) {
            return Classified::Cached(cached_findings(&record.path, entry), record);
        }
    }

    let bytes = match std::fs::read(&record.absolute) {
        Ok(bytes) => bytes,
        Err(e) => return unreadable(&record, e),
    };
    let fingerprint = Fingerprint::of_content(&bytes, record.modified);
    record.last_scanned = tracker.last_fingerprint(&record.path);

    if !tracker.should_scan(&record.path, &fingerprint) {
        if let Some(entry) = tracker.cached(&record.path) {
            // Same content, new mtime: refresh the stat so the next precheck passes
            tracker.record_scanned(
                record.path.clone(),
                TrackedEntry {
                    fingerprint,
                    ..entry.clone()
                },
            );
            return Classified::Cached(cached_findings(&record.path, entry), record);
        }
    }

    record.fingerprint = Some(fingerprint);
    Classified::Changed(record)
}

fn new_run_id(root: &Path) -> String {
    let now = chrono::Utc::now();
    let seed = format!("{}:{}", root.display(), now.timestamp_nanos_opt().unwrap_or_default());
    format!(
        "{}-{:08x}",
        now.format("%Y%m%dT%H%M%SZ"),
        xxhash_rust::xxh64::xxh64(seed.as_bytes(), 0) as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, Severity};
    use std::fs;
    use tempfile::TempDir;

    fn engine(cache: &TempDir) -> AnalysisEngine {
        AnalysisEngine::new(CodetriageConfig::default())
            .with_cache_dir(cache.path())
            .without_git()
    }

    #[test]
    fn test_second_run_reuses_cached_findings() {
        let project = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        fs::write(project.path().join("a.py"), "password = \"hunter22\"\n").unwrap();

        let first = engine(&cache).analyze(project.path()).unwrap();
        assert_eq!(first.scan.scanned, 1);
        assert_eq!(first.summary.severity_count(Severity::Critical), 1);

        let second = engine(&cache).analyze(project.path()).unwrap();
        assert_eq!(second.scan.scanned, 0);
        assert_eq!(second.scan.cached, 1);
        assert_eq!(second.findings, first.findings);
    }

    #[test]
    fn test_cancelled_run_skips_every_file() {
        let project = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        fs::write(project.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(project.path().join("b.py"), "y = 2\n").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let report = engine(&cache)
            .with_cancellation(token)
            .analyze(project.path())
            .unwrap();
        assert_eq!(report.scan.skipped_for(SkipReason::Cancelled), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_disabled_cache_rescans() {
        let project = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        fs::write(project.path().join("a.py"), "eval(x)\n").unwrap();
        let mut config = CodetriageConfig::default();
        config.cache.enabled = false;

        for _ in 0..2 {
            let report = AnalysisEngine::new(config.clone())
                .with_cache_dir(cache.path())
                .without_git()
                .analyze(project.path())
                .unwrap();
            assert_eq!(report.scan.scanned, 1);
            assert_eq!(report.summary.count(Category::Security), 1);
        }
    }

    #[test]
    fn test_report_lists_every_file_priority() {
        let project = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        fs::write(project.path().join("small.py"), "eval(a)\n").unwrap();
        fs::write(
            project.path().join("large.py"),
            format!("eval(b)\n{}", "x = 1\n".repeat(2_000)),
        )
        .unwrap();

        for _ in 0..2 {
            let report = engine(&cache).analyze(project.path()).unwrap();
            let ranked: Vec<&str> = report.priorities.iter().map(|p| p.path.as_str()).collect();
            assert_eq!(ranked, vec!["large.py", "small.py"]);
            assert!(report.priorities[0].score > report.priorities[1].score);
            assert_eq!(report.findings[0].path, "large.py");
        }
    }

    #[test]
    fn test_category_filter_from_config() {
        let project = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        fs::write(
            project.path().join("a.py"),
            "eval(x)\nfor i in range(len(x)):\n    pass\n",
        )
        .unwrap();
        let mut config = CodetriageConfig::default();
        config.detectors.categories = vec!["performance".to_string()];

        let report = AnalysisEngine::new(config)
            .with_cache_dir(cache.path())
            .without_git()
            .analyze(project.path())
            .unwrap();
        assert_eq!(report.summary.count(Category::Security), 0);
        assert_eq!(report.summary.count(Category::Performance), 1);
    }
}
