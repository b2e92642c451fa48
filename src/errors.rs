//! Error types for codetriage analysis runs.
//!
//! Errors are split by how far they are allowed to propagate:
//!
//! - **Fatal** errors abort the run with a single error (`Error`).
//! - **Degraded** conditions have a documented fallback and surface as
//!   [`ScanWarning`]s in the report (corrupt tracker state, missing git
//!   repository, unreadable file).
//! - **Per-item** failures (one detector on one file) become synthetic
//!   findings and never escalate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// How an error condition is handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Aborts the run.
    Fatal,
    /// Triggers a fallback, the run continues.
    Degraded,
    /// Captured as a synthetic finding.
    PerItem,
}

/// Main error type for codetriage operations
#[derive(Debug, Error)]
pub enum Error {
    /// The scan root is missing or cannot be listed
    #[error("Cannot read scan root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a root error from the failed IO operation
    pub fn root_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error without a file context
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error tied to a config file
    pub fn config_at(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Every error that escapes to the caller aborts the run.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Fatal
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of degraded conditions recorded in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Persisted fingerprint index was corrupt or unreadable; full rescan.
    CorruptState,
    /// Fingerprint index could not be written back.
    StatePersistFailed,
    /// Root is not under version control.
    NoGitContext,
    /// A single file could not be read and was skipped.
    UnreadableFile,
    /// A symlink cycle was pruned from the walk.
    SymlinkCycle,
    /// Any other non-fatal walk error.
    WalkError,
}

impl WarningKind {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Degraded
    }
}

/// A degraded, non-fatal condition observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanWarning {
    pub kind: WarningKind,
    pub path: Option<String>,
    pub message: String,
}

impl ScanWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            message: message.into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{:?} at {}: {}", self.kind, path, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unreadable_message_names_path() {
        let err = Error::root_unreadable(
            "/missing/root",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        );
        let text = err.to_string();
        assert!(text.contains("/missing/root"));
        assert!(text.contains("no such directory"));
        assert_eq!(err.category(), ErrorCategory::Fatal);
    }

    #[test]
    fn test_config_error_keeps_path() {
        let err = Error::config_at("bad weights", "/tmp/.codetriage.toml");
        match err {
            Error::Config { path, message } => {
                assert_eq!(message, "bad weights");
                assert_eq!(path, Some(PathBuf::from("/tmp/.codetriage.toml")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_warning_display() {
        let warning =
            ScanWarning::new(WarningKind::UnreadableFile, "permission denied").with_path("a.py");
        assert_eq!(
            warning.to_string(),
            "UnreadableFile at a.py: permission denied"
        );
        assert_eq!(warning.kind.category(), ErrorCategory::Degraded);
    }
}
