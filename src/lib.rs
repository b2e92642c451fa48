// Export modules for library usage
pub mod aggregation;
pub mod cache;
pub mod cli;
pub mod commit;
pub mod config;
pub mod core;
pub mod detectors;
pub mod errors;
pub mod git;
pub mod io;
pub mod observability;
pub mod pipeline;
pub mod priority;
pub mod progress;

// Re-export commonly used types
pub use crate::core::{
    Category, FileMetadata, FileMetrics, FileRecord, Finding, Language, LineRange, Severity,
};

pub use crate::aggregation::{
    AnalysisReport, Aggregator, FileFindings, ReportSummary, ScanAccounting, SkipReason,
    SkippedFile,
};

pub use crate::cache::{ChangeTracker, Fingerprint};

pub use crate::commit::{CommitSuggester, CommitSuggestion, OracleDigest, ReasoningOracle};

pub use crate::config::CodetriageConfig;

pub use crate::detectors::{Detector, DetectorFailure, DetectorRegistry, DetectorRunner};

pub use crate::errors::{Error, Result, ScanWarning, WarningKind};

pub use crate::git::{GitContextProvider, GitStatusSnapshot};

pub use crate::pipeline::{AnalysisEngine, CancellationToken};

pub use crate::priority::{Prioritizer, RankedFile, ScanBudget};
