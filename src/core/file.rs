use super::types::Language;
use crate::cache::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// What a detector gets to know about the file it analyzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: String,
    pub language: Language,
    pub size: u64,
}

/// Size metrics gathered while scanning a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub lines: usize,
    pub functions: usize,
}

/// A candidate file as seen by the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scan root, `/`-separated
    pub path: String,
    #[serde(skip)]
    pub absolute: PathBuf,
    pub size: u64,
    /// Modification time in nanoseconds since the unix epoch
    pub modified: u64,
    pub language: Language,
    /// Fingerprint of the content on disk, once computed
    pub fingerprint: Option<Fingerprint>,
    /// Fingerprint recorded by the last completed scan of this path
    pub last_scanned: Option<Fingerprint>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, absolute: PathBuf, size: u64, modified: u64) -> Self {
        let path = path.into();
        let language = Language::from_path(Path::new(&path));
        Self {
            path,
            absolute,
            size,
            modified,
            language,
            fingerprint: None,
            last_scanned: None,
        }
    }

    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            path: self.path.clone(),
            language: self.language,
            size: self.size,
        }
    }
}

/// Render `path` relative to `root` with forward slashes.
///
/// Paths outside `root` are returned as given, normalized the same way.
pub fn normalize_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.join("/")
}
