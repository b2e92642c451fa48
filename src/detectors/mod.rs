//! Pluggable per-file detectors.
//!
//! A [`Detector`] looks at the text of one file and reports [`Finding`]s for
//! a single category. Detectors share no mutable state, so the
//! [`DetectorRunner`] is free to run them concurrently and isolate their
//! failures.

pub mod maintainability;
pub mod performance;
pub mod runner;
pub mod security;
pub mod source;

pub use runner::DetectorRunner;
pub use source::measure;

use crate::core::{Category, FileMetadata, Finding};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Error a detector returns instead of findings.
#[derive(Debug, Error)]
pub enum DetectorFailure {
    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}

pub trait Detector: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn id(&self) -> &str;

    fn category(&self) -> Category;

    fn analyze(&self, content: &str, meta: &FileMetadata) -> Result<Vec<Finding>, DetectorFailure>;
}

/// Detectors grouped by category. Every category has an entry.
#[derive(Clone)]
pub struct DetectorRegistry {
    detectors: BTreeMap<Category, Vec<Arc<dyn Detector>>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.detectors
                    .iter()
                    .map(|(category, list)| (category, list.iter().map(|d| d.id()).collect::<Vec<_>>())),
            )
            .finish()
    }
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self {
            detectors: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    /// Registry with every built-in detector.
    pub fn builtin() -> Self {
        let builtins: Vec<Arc<dyn Detector>> = vec![
            Arc::new(security::SqlConstructionDetector),
            Arc::new(security::HardcodedSecretDetector),
            Arc::new(security::DynamicEvalDetector),
            Arc::new(security::ShellInjectionDetector),
            Arc::new(security::WeakHashDetector),
            Arc::new(performance::RangeLenLoopDetector),
            Arc::new(performance::BlockingSleepDetector),
            Arc::new(performance::NestedLoopDetector),
            Arc::new(performance::StringConcatInLoopDetector),
            Arc::new(maintainability::LongFunctionDetector),
            Arc::new(maintainability::LargeFileDetector),
            Arc::new(maintainability::TodoMarkerDetector),
            Arc::new(maintainability::MagicNumberDetector),
            Arc::new(maintainability::MissingDocstringDetector),
            Arc::new(maintainability::LongLinesDetector),
            Arc::new(maintainability::ExcessiveBlankLinesDetector),
        ];
        builtins
            .into_iter()
            .fold(Self::empty(), |registry, detector| registry.register(detector))
    }

    /// Add a detector. A detector with the same id is replaced.
    pub fn register(mut self, detector: Arc<dyn Detector>) -> Self {
        for list in self.detectors.values_mut() {
            list.retain(|d| d.id() != detector.id());
        }
        self.detectors
            .entry(detector.category())
            .or_default()
            .push(detector);
        self
    }

    /// Keep only the given categories. The others stay present but empty.
    pub fn only(mut self, categories: &[Category]) -> Self {
        for (category, list) in self.detectors.iter_mut() {
            if !categories.contains(category) {
                list.clear();
            }
        }
        self
    }

    /// Drop detectors by id.
    pub fn without(mut self, ids: &[String]) -> Self {
        for list in self.detectors.values_mut() {
            list.retain(|d| !ids.iter().any(|id| id == d.id()));
        }
        self
    }

    pub fn detectors_for(&self, category: Category) -> &[Arc<dyn Detector>] {
        self.detectors
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Detector>> {
        self.detectors.values().flatten()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|d| d.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
