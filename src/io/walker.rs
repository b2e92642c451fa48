use crate::cache::fingerprint::modified_nanos;
use crate::config::IgnoreConfig;
use crate::core::{normalize_relative, FileRecord};
use crate::errors::{Error, Result, ScanWarning, WarningKind};
use ignore::{DirEntry, WalkBuilder};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory names skipped unless default excludes are turned off.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".pytest_cache",
    ".mypy_cache",
    "dist",
    "build",
    ".idea",
    ".vscode",
];

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Compiled ignore rules for one walk.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<glob::Pattern>,
    include: Vec<glob::Pattern>,
    max_file_size: Option<u64>,
    default_excludes: bool,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include: Vec::new(),
            max_file_size: None,
            default_excludes: true,
        }
    }
}

impl IgnoreRules {
    pub fn from_config(config: &IgnoreConfig) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<glob::Pattern>> {
            patterns
                .iter()
                .map(|p| glob::Pattern::new(p).map_err(Error::from))
                .collect()
        };

        Ok(Self {
            patterns: compile(&config.patterns)?,
            include: compile(&config.include)?,
            max_file_size: (config.max_file_size_mb > 0)
                .then(|| config.max_file_size_mb.saturating_mul(BYTES_PER_MB)),
            default_excludes: config.default_excludes,
        })
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            self.patterns.push(glob::Pattern::new(pattern)?);
        }
        Ok(self)
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.default_excludes && DEFAULT_EXCLUDED_DIRS.contains(&name)
    }

    fn is_ignored(&self, relative: &str, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches(relative) || p.matches(name))
    }

    fn is_included(&self, name: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|p| p.matches(name))
    }

    fn exceeds_size(&self, size: u64) -> bool {
        self.max_file_size.is_some_and(|limit| size > limit)
    }
}

/// One element of the walk sequence.
#[derive(Debug, Clone)]
pub enum WalkItem {
    /// A candidate file for analysis.
    File(FileRecord),
    /// A file over the size ceiling.
    TooLarge { path: String, size: u64 },
    /// A non-fatal problem (symlink cycle, unreadable entry).
    Warning(ScanWarning),
}

/// Enumerates candidate files under a root.
pub struct FileWalker {
    root: PathBuf,
    rules: IgnoreRules,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            rules: IgnoreRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: IgnoreRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh, lazy walk. Each call restarts from the root.
    ///
    /// Fails only when the root itself cannot be read.
    pub fn walk(&self) -> Result<Walk> {
        std::fs::read_dir(&self.root).map_err(|e| Error::root_unreadable(&self.root, e))?;

        let visited = Arc::new(Mutex::new(HashSet::new()));
        let pending = Arc::new(Mutex::new(VecDeque::new()));
        if let Some(id) = std::fs::metadata(&self.root).ok().and_then(|m| dir_identity(&m)) {
            visited.lock().insert(id);
        }

        let filter = DirFilter {
            root: self.root.clone(),
            rules: self.rules.clone(),
            visited,
            pending: Arc::clone(&pending),
        };

        let inner = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| filter.keep(entry))
            .build();

        Ok(Walk {
            root: self.root.clone(),
            rules: self.rules.clone(),
            inner,
            pending,
        })
    }
}

/// Directory pruning shared with the underlying walker.
struct DirFilter {
    root: PathBuf,
    rules: IgnoreRules,
    visited: Arc<Mutex<HashSet<(u64, u64)>>>,
    pending: Arc<Mutex<VecDeque<ScanWarning>>>,
}

impl DirFilter {
    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        let relative = normalize_relative(&self.root, entry.path());
        if self.rules.is_excluded_dir(&name) || self.rules.is_ignored(&relative, &name) {
            return false;
        }

        let identity = entry.metadata().ok().and_then(|m| dir_identity(&m));
        if let Some(id) = identity {
            if !self.visited.lock().insert(id) {
                tracing::warn!(path = %relative, "Skipping already visited directory (symlink cycle)");
                self.pending.lock().push_back(
                    ScanWarning::new(
                        WarningKind::SymlinkCycle,
                        "directory already visited through another path, skipped",
                    )
                    .with_path(relative),
                );
                return false;
            }
        }
        true
    }
}

#[cfg(unix)]
fn dir_identity(metadata: &std::fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn dir_identity(_metadata: &std::fs::Metadata) -> Option<(u64, u64)> {
    None
}

/// Lazy walk sequence. Always finite.
pub struct Walk {
    root: PathBuf,
    rules: IgnoreRules,
    inner: ignore::Walk,
    pending: Arc<Mutex<VecDeque<ScanWarning>>>,
}

impl Walk {
    fn classify_error(&self, err: &ignore::Error) -> ScanWarning {
        let path = error_path(err).map(|p| normalize_relative(&self.root, p));
        let warning = match loop_child(err) {
            Some(child) => ScanWarning::new(
                WarningKind::SymlinkCycle,
                "symbolic link cycle detected, skipped",
            )
            .with_path(normalize_relative(&self.root, child)),
            None => {
                let warning = ScanWarning::new(WarningKind::WalkError, err.to_string());
                match path {
                    Some(path) => warning.with_path(path),
                    None => warning,
                }
            }
        };
        tracing::warn!("{}", warning);
        warning
    }

    fn visit(&self, entry: DirEntry) -> Option<WalkItem> {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            return None;
        }

        let relative = normalize_relative(&self.root, entry.path());
        let name = entry.file_name().to_string_lossy();
        if self.rules.is_ignored(&relative, &name) || !self.rules.is_included(&name) {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                return Some(WalkItem::Warning(
                    ScanWarning::new(WarningKind::UnreadableFile, e.to_string())
                        .with_path(relative),
                ))
            }
        };

        let size = metadata.len();
        if self.rules.exceeds_size(size) {
            tracing::debug!(path = %relative, size, "Skipping file over size ceiling");
            return Some(WalkItem::TooLarge {
                path: relative,
                size,
            });
        }

        Some(WalkItem::File(FileRecord::new(
            relative,
            entry.path().to_path_buf(),
            size,
            modified_nanos(&metadata),
        )))
    }
}

impl Iterator for Walk {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if let Some(warning) = self.pending.lock().pop_front() {
                return Some(WalkItem::Warning(warning));
            }

            match self.inner.next()? {
                Ok(entry) => {
                    if let Some(item) = self.visit(entry) {
                        return Some(item);
                    }
                }
                Err(err) => return Some(WalkItem::Warning(self.classify_error(&err))),
            }
        }
    }
}

fn loop_child(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => loop_child(err),
        ignore::Error::Partial(errs) => errs.iter().find_map(loop_child),
        _ => None,
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

/// Collect the candidate files under `root` with default rules.
pub fn find_project_files(root: &Path) -> Result<Vec<FileRecord>> {
    Ok(FileWalker::new(root.to_path_buf())
        .walk()?
        .filter_map(|item| match item {
            WalkItem::File(record) => Some(record),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn files(walk: Walk) -> Vec<String> {
        walk.filter_map(|item| match item {
            WalkItem::File(record) => Some(record.path),
            _ => None,
        })
        .collect()
    }

    #[test]
    fn test_skips_default_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("node_modules/lib/index.js"), "x").unwrap();
        fs::write(dir.path().join(".git/config"), "x").unwrap();
        fs::write(dir.path().join("src/main.py"), "x").unwrap();

        let walker = FileWalker::new(dir.path().to_path_buf());
        assert_eq!(files(walker.walk().unwrap()), vec!["src/main.py"]);
    }

    #[test]
    fn test_glob_patterns_and_include_filter() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/dep.py"), "x").unwrap();
        fs::write(dir.path().join("app.py"), "x").unwrap();
        fs::write(dir.path().join("notes.bin"), "x").unwrap();

        let config = IgnoreConfig {
            patterns: vec!["vendor".to_string()],
            ..IgnoreConfig::default()
        };
        let rules = IgnoreRules::from_config(&config).unwrap();
        let walker = FileWalker::new(dir.path().to_path_buf()).with_rules(rules);
        assert_eq!(files(walker.walk().unwrap()), vec!["app.py"]);
    }

    #[test]
    fn test_size_ceiling_reports_too_large() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.py"), vec![b'a'; 2048]).unwrap();
        fs::write(dir.path().join("small.py"), b"a").unwrap();

        let walker = FileWalker::new(dir.path().to_path_buf())
            .with_rules(IgnoreRules::default().with_max_file_size(1024));
        let items: Vec<_> = walker.walk().unwrap().collect();
        assert!(items
            .iter()
            .any(|i| matches!(i, WalkItem::TooLarge { path, size: 2048 } if path == "big.py")));
        assert!(items
            .iter()
            .any(|i| matches!(i, WalkItem::File(r) if r.path == "small.py")));
    }

    #[test]
    fn test_walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x").unwrap();
        fs::write(dir.path().join("b.py"), "x").unwrap();
        let walker = FileWalker::new(dir.path().to_path_buf());
        let first = files(walker.walk().unwrap());
        let second = files(walker.walk().unwrap());
        assert_eq!(first, vec!["a.py", "b.py"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_is_the_only_failure() {
        let dir = TempDir::new().unwrap();
        let walker = FileWalker::new(dir.path().join("missing"));
        assert!(matches!(walker.walk(), Err(Error::RootUnreadable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates_with_warning() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("pkg");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("mod.py"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();

        let items: Vec<_> = FileWalker::new(dir.path().to_path_buf())
            .walk()
            .unwrap()
            .collect();
        let files: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                WalkItem::File(r) => Some(r.path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(files, vec!["pkg/mod.py"]);
        assert!(items.iter().any(|i| matches!(
            i,
            WalkItem::Warning(w) if w.kind == WarningKind::SymlinkCycle
        )));
    }
}
