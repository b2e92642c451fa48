//! Core data model shared by every stage of the analysis pipeline.

pub mod file;
pub mod finding;
pub mod types;

pub use file::{normalize_relative, FileMetadata, FileMetrics, FileRecord};
pub use finding::{Finding, DETECTOR_ERROR, DETECTOR_TIMEOUT};
pub use types::{Category, Language, LineRange, Severity};
