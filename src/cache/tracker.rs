//! Persisted fingerprint index deciding which files need re-analysis.
//!
//! The tracker is loaded once at the start of a run. Lookups only ever see
//! that loaded state, so they are safe to issue from every worker at once.
//! Updates are queued behind a single mutex and applied by [`ChangeTracker::flush`],
//! which is also the only place the index is written to disk.
//!
//! Each path keeps exactly one fingerprint: the one recorded by its most
//! recent scan. Comparisons are always "current content vs last recorded",
//! so reverting a file to older content still counts as a change.
//!
//! A missing index means a first run. A corrupt, truncated or
//! incompatible index is discarded with a [`WarningKind::CorruptState`]
//! warning and every file is rescanned.

use super::atomic_io::AtomicFileWriter;
use super::cache_location::CacheLocation;
use super::fingerprint::Fingerprint;
use crate::core::{FileMetrics, Finding, Language};
use crate::errors::{ScanWarning, WarningKind};
use crate::priority::FindingHistory;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const INDEX_VERSION: u32 = 1;

/// What the tracker remembers about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub fingerprint: Fingerprint,
    pub language: Language,
    #[serde(default)]
    pub metrics: FileMetrics,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl TrackedEntry {
    pub fn severe_findings(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity.is_severe() && !f.is_diagnostic())
            .count()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    entries: BTreeMap<String, TrackedEntry>,
}

/// Result of the stat-only check done before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreCheck {
    /// Size and mtime match the last scan, content is assumed unchanged.
    Unchanged,
    /// Not tracked yet, or size/mtime moved; the content must be hashed.
    PossiblyChanged,
}

pub struct ChangeTracker {
    location: Option<CacheLocation>,
    index: DashMap<String, TrackedEntry>,
    pending: Mutex<Vec<(String, TrackedEntry)>>,
    load_warning: Option<ScanWarning>,
}

impl ChangeTracker {
    /// Open the persisted index for a project, degrading to an empty index.
    pub fn open(location: CacheLocation) -> Self {
        let (entries, load_warning) = match Self::load(&location.index_path()) {
            Ok(entries) => (entries, None),
            Err(message) => {
                tracing::warn!(
                    path = %location.index_path().display(),
                    "Discarding fingerprint index: {}",
                    message
                );
                let warning = ScanWarning::new(
                    WarningKind::CorruptState,
                    format!("fingerprint index unusable, rescanning all files: {}", message),
                );
                (BTreeMap::new(), Some(warning))
            }
        };

        tracing::debug!(entries = entries.len(), "Loaded fingerprint index");
        Self {
            location: Some(location),
            index: entries.into_iter().collect(),
            pending: Mutex::new(Vec::new()),
            load_warning,
        }
    }

    /// Tracker that never touches disk (used with caching disabled).
    pub fn in_memory() -> Self {
        Self {
            location: None,
            index: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            load_warning: None,
        }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, TrackedEntry>, String> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(format!("cannot read {}: {}", path.display(), e)),
        };

        let persisted: PersistedIndex =
            serde_json::from_slice(&bytes).map_err(|e| format!("corrupt index: {}", e))?;
        if persisted.version != INDEX_VERSION {
            return Err(format!(
                "index version {} is not supported (expected {})",
                persisted.version, INDEX_VERSION
            ));
        }
        Ok(persisted.entries)
    }

    /// Warning produced while loading the index, if it had to be discarded.
    pub fn load_warning(&self) -> Option<&ScanWarning> {
        self.load_warning.as_ref()
    }

    pub fn is_persistent(&self) -> bool {
        self.location.is_some()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn precheck(&self, path: &str, size: u64, modified: u64) -> PreCheck {
        match self.index.get(path) {
            Some(entry) if entry.fingerprint.same_stat(size, modified) => PreCheck::Unchanged,
            _ => PreCheck::PossiblyChanged,
        }
    }

    /// True when the file is untracked or its content differs from the last scan.
    pub fn should_scan(&self, path: &str, current: &Fingerprint) -> bool {
        match self.index.get(path) {
            Some(entry) => !entry.fingerprint.same_content(current),
            None => true,
        }
    }

    pub fn last_fingerprint(&self, path: &str) -> Option<Fingerprint> {
        self.index.get(path).map(|entry| entry.fingerprint.clone())
    }

    /// Entry recorded by the last scan, for reusing its findings.
    pub fn cached(&self, path: &str) -> Option<TrackedEntry> {
        self.index.get(path).map(|entry| entry.value().clone())
    }

    /// Queue the result of scanning `path`. Applied on [`flush`](Self::flush).
    pub fn record_scanned(&self, path: impl Into<String>, entry: TrackedEntry) {
        self.pending.lock().push((path.into(), entry));
    }

    /// Apply queued updates, forget paths no longer in the tree and persist.
    ///
    /// Returns a warning instead of failing when the index cannot be written.
    pub fn flush(&self, live_paths: &HashSet<String>) -> Option<ScanWarning> {
        let mut pending = self.pending.lock();
        for (path, entry) in pending.drain(..) {
            self.index.insert(path, entry);
        }
        self.index.retain(|path, _| live_paths.contains(path));

        let location = self.location.as_ref()?;
        let persisted = PersistedIndex {
            version: INDEX_VERSION,
            entries: self
                .index
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
        };

        let result = serde_json::to_vec(&persisted)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                AtomicFileWriter::new(location.index_path())
                    .write(&bytes)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => {
                tracing::debug!(entries = persisted.entries.len(), "Persisted fingerprint index");
                None
            }
            Err(message) => {
                tracing::warn!("Failed to persist fingerprint index: {}", message);
                Some(ScanWarning::new(
                    WarningKind::StatePersistFailed,
                    format!("fingerprint index not saved: {}", message),
                ))
            }
        }
    }

    /// Drop all tracked state, in memory and on disk.
    pub fn clear(&self) -> std::io::Result<()> {
        self.index.clear();
        self.pending.lock().clear();
        if let Some(location) = &self.location {
            match std::fs::remove_file(location.index_path()) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

impl FindingHistory for ChangeTracker {
    fn severe_findings(&self, path: &str) -> usize {
        self.index
            .get(path)
            .map(|entry| entry.severe_findings())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, Severity};
    use tempfile::TempDir;

    fn entry(content: &[u8], modified: u64) -> TrackedEntry {
        TrackedEntry {
            fingerprint: Fingerprint::of_content(content, modified),
            language: Language::Python,
            metrics: FileMetrics {
                lines: 1,
                functions: 0,
            },
            findings: vec![Finding::new(
                "hardcoded-secret",
                "hardcoded-secret",
                Category::Security,
                Severity::Critical,
                "a.py",
                "secret",
            )
            .at_line(1)],
        }
    }

    fn live(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn tracker_in(cache: &TempDir, project: &TempDir) -> ChangeTracker {
        ChangeTracker::open(CacheLocation::in_dir(cache.path(), project.path()))
    }

    #[test]
    fn test_untracked_file_needs_scan() {
        let tracker = ChangeTracker::in_memory();
        let fp = Fingerprint::of_content(b"x", 1);
        assert!(tracker.should_scan("a.py", &fp));
        assert_eq!(tracker.precheck("a.py", 1, 1), PreCheck::PossiblyChanged);
    }

    #[test]
    fn test_recorded_updates_are_invisible_until_flush() {
        let tracker = ChangeTracker::in_memory();
        tracker.record_scanned("a.py", entry(b"x = 1", 5));
        assert!(tracker.cached("a.py").is_none());
        assert!(tracker.flush(&live(&["a.py"])).is_none());
        assert!(tracker.cached("a.py").is_some());
        assert_eq!(tracker.precheck("a.py", 5, 5), PreCheck::Unchanged);
        assert!(!tracker.should_scan("a.py", &Fingerprint::of_content(b"x = 1", 77)));
    }

    #[test]
    fn test_persisted_index_round_trips_between_runs() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let first = tracker_in(&cache, &project);
        first.record_scanned("a.py", entry(b"x = 1", 5));
        assert!(first.flush(&live(&["a.py"])).is_none());

        let second = tracker_in(&cache, &project);
        assert!(second.load_warning().is_none());
        let cached = second.cached("a.py").unwrap();
        assert_eq!(cached, entry(b"x = 1", 5));
        assert_eq!(second.severe_findings("a.py"), 1);
    }

    #[test]
    fn test_reverted_content_counts_as_changed() {
        let tracker = ChangeTracker::in_memory();
        tracker.record_scanned("a.py", entry(b"v1", 1));
        tracker.flush(&live(&["a.py"]));
        tracker.record_scanned("a.py", entry(b"v2", 2));
        tracker.flush(&live(&["a.py"]));
        assert!(tracker.should_scan("a.py", &Fingerprint::of_content(b"v1", 3)));
    }

    #[test]
    fn test_corrupt_index_degrades_to_full_rescan() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let location = CacheLocation::in_dir(cache.path(), project.path());
        location.ensure_directories().unwrap();
        std::fs::write(location.index_path(), b"{\"version\":1,\"entries\":{\"a.py\":").unwrap();

        let tracker = ChangeTracker::open(location);
        let warning = tracker.load_warning().expect("corruption is reported");
        assert_eq!(warning.kind, WarningKind::CorruptState);
        assert!(tracker.is_empty());
        assert!(tracker.should_scan("a.py", &Fingerprint::of_content(b"x", 1)));
    }

    #[test]
    fn test_flush_forgets_removed_files() {
        let tracker = ChangeTracker::in_memory();
        tracker.record_scanned("a.py", entry(b"a", 1));
        tracker.record_scanned("b.py", entry(b"b", 1));
        tracker.flush(&live(&["a.py", "b.py"]));
        tracker.flush(&live(&["b.py"]));
        assert!(tracker.cached("a.py").is_none());
        assert!(tracker.cached("b.py").is_some());
    }

    #[test]
    fn test_clear_removes_index_file() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let tracker = tracker_in(&cache, &project);
        tracker.record_scanned("a.py", entry(b"a", 1));
        tracker.flush(&live(&["a.py"]));
        let index_path = CacheLocation::in_dir(cache.path(), project.path()).index_path();
        assert!(index_path.exists());
        tracker.clear().unwrap();
        assert!(!index_path.exists());
        assert!(tracker.is_empty());
    }
}
