//! File prioritization.
//!
//! Every candidate gets a risk score in `[0.0, 1.0]` built from three
//! normalized signals:
//!
//! - **recency**: 1.0 when the working tree reports the file as modified,
//!   staged or untracked, else 0.0
//! - **density**: high/critical findings recorded for the file by the last
//!   run, divided by the saturation point and capped at 1.0
//! - **size**: bytes divided by the saturation size, capped at 1.0
//!
//! The score is the weighted sum of the signals. Files are ordered by
//! score descending with ties broken by path, so the order is total and
//! deterministic.

pub mod budget;

pub use budget::{ScanBudget, ScanPlan};

use crate::config::PriorityWeights;
use crate::core::FileRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Findings history consulted for the density signal.
pub trait FindingHistory {
    /// High and critical findings recorded for `path` by the last run.
    fn severe_findings(&self, path: &str) -> usize;
}

impl FindingHistory for HashMap<String, usize> {
    fn severe_findings(&self, path: &str) -> usize {
        self.get(path).copied().unwrap_or(0)
    }
}

/// History for a first run.
pub struct NoHistory;

impl FindingHistory for NoHistory {
    fn severe_findings(&self, _path: &str) -> usize {
        0
    }
}

/// Per-file score plus the signals it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub value: f64,
    pub recency: f64,
    pub density: f64,
    pub size: f64,
}

impl PriorityScore {
    fn from_signals(weights: &PriorityWeights, recency: f64, density: f64, size: f64) -> Self {
        let value = weights.recency * recency + weights.density * density + weights.size * size;
        Self {
            value: value.clamp(0.0, 1.0),
            recency,
            density,
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedFile {
    pub record: FileRecord,
    pub score: PriorityScore,
}

/// Ranking order: score descending, then path ascending.
pub fn compare_ranked(a: &RankedFile, b: &RankedFile) -> Ordering {
    b.score
        .value
        .total_cmp(&a.score.value)
        .then_with(|| a.record.path.cmp(&b.record.path))
}

// Pure function: signal in [0, 1], saturating at `saturation`
fn saturating_ratio(amount: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 0.0;
    }
    (amount / saturation).clamp(0.0, 1.0)
}

pub struct Prioritizer {
    weights: PriorityWeights,
}

impl Default for Prioritizer {
    fn default() -> Self {
        Self::new(PriorityWeights::default())
    }
}

impl Prioritizer {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    pub fn score(
        &self,
        record: &FileRecord,
        history: &dyn FindingHistory,
        recent: &HashSet<String>,
    ) -> PriorityScore {
        let recency = if recent.contains(&record.path) { 1.0 } else { 0.0 };
        let density = saturating_ratio(
            history.severe_findings(&record.path) as f64,
            self.weights.density_saturation as f64,
        );
        let size = saturating_ratio(record.size as f64, self.weights.size_saturation_bytes as f64);
        PriorityScore::from_signals(&self.weights, recency, density, size)
    }

    /// Score and order candidates, highest risk first.
    ///
    /// `recent` holds the paths the working tree reports as changed.
    pub fn rank(
        &self,
        candidates: Vec<FileRecord>,
        history: &dyn FindingHistory,
        recent: &HashSet<String>,
    ) -> Vec<RankedFile> {
        let mut ranked: Vec<RankedFile> = candidates
            .into_iter()
            .map(|record| {
                let score = self.score(&record, history, recent);
                RankedFile { record, score }
            })
            .collect();
        ranked.sort_by(compare_ranked);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(path, PathBuf::from(path), size, 0)
    }

    fn paths(ranked: &[RankedFile]) -> Vec<&str> {
        ranked.iter().map(|r| r.record.path.as_str()).collect()
    }

    #[test]
    fn test_recently_changed_files_rank_first() {
        let recent: HashSet<String> = ["b.py".to_string()].into();
        let ranked = Prioritizer::default().rank(
            vec![record("a.py", 60_000), record("b.py", 10)],
            &NoHistory,
            &recent,
        );
        assert_eq!(paths(&ranked), vec!["b.py", "a.py"]);
        assert_eq!(ranked[0].score.recency, 1.0);
    }

    #[test]
    fn test_density_saturates() {
        let history: HashMap<String, usize> = [("a.py".to_string(), 50)].into();
        let score = Prioritizer::default().score(&record("a.py", 0), &history, &HashSet::new());
        assert_eq!(score.density, 1.0);
        assert!((score.value - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_path() {
        let ranked = Prioritizer::default().rank(
            vec![record("c.py", 1), record("a.py", 1), record("b.py", 1)],
            &NoHistory,
            &HashSet::new(),
        );
        assert_eq!(paths(&ranked), vec!["a.py", "b.py", "c.py"]);
    }

    proptest! {
        #[test]
        fn prop_scores_in_unit_interval_and_sorted(
            sizes in prop::collection::vec(0u64..200_000, 1..40),
            severe in prop::collection::vec(0usize..12, 1..40),
        ) {
            let candidates: Vec<FileRecord> = sizes
                .iter()
                .enumerate()
                .map(|(i, size)| record(&format!("f{:03}.py", i), *size))
                .collect();
            let history: HashMap<String, usize> = severe
                .iter()
                .enumerate()
                .map(|(i, n)| (format!("f{:03}.py", i), *n))
                .collect();
            let recent: HashSet<String> = (0..sizes.len())
                .step_by(3)
                .map(|i| format!("f{:03}.py", i))
                .collect();

            let ranked = Prioritizer::default().rank(candidates, &history, &recent);
            prop_assert_eq!(ranked.len(), sizes.len());
            for r in &ranked {
                prop_assert!((0.0..=1.0).contains(&r.score.value));
            }
            for pair in ranked.windows(2) {
                prop_assert_ne!(compare_ranked(&pair[0], &pair[1]), Ordering::Greater);
            }
        }
    }
}
