use super::RankedFile;
use std::time::{Duration, Instant};

/// Optional ceiling on one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanBudget {
    pub max_files: Option<usize>,
    pub max_duration: Option<Duration>,
}

impl ScanBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn files(max_files: usize) -> Self {
        Self {
            max_files: Some(max_files),
            max_duration: None,
        }
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_files.is_none() && self.max_duration.is_none()
    }

    /// Point in time after which no new file is started.
    pub fn deadline(&self, started: Instant) -> Option<Instant> {
        self.max_duration.and_then(|d| started.checked_add(d))
    }
}

/// Files split by whether the budget lets them be scanned.
#[derive(Debug, Clone, Default)]
pub struct ScanPlan {
    /// Priority order, highest first
    pub scheduled: Vec<RankedFile>,
    pub over_budget: Vec<RankedFile>,
}

/// Split ranked files by the file-count ceiling.
///
/// The duration ceiling is enforced while scanning since it depends on how
/// long files actually take.
pub fn plan(ranked: Vec<RankedFile>, budget: &ScanBudget) -> ScanPlan {
    let mut scheduled = ranked;
    let over_budget = match budget.max_files {
        Some(limit) if scheduled.len() > limit => scheduled.split_off(limit),
        _ => Vec::new(),
    };
    ScanPlan {
        scheduled,
        over_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileRecord;
    use crate::priority::{NoHistory, Prioritizer};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn ranked(count: usize, recent: &HashSet<String>) -> Vec<RankedFile> {
        let candidates = (0..count)
            .map(|i| {
                let path = format!("f{:03}.py", i);
                FileRecord::new(path.clone(), PathBuf::from(path), 100, 0)
            })
            .collect();
        Prioritizer::default().rank(candidates, &NoHistory, recent)
    }

    #[test]
    fn test_no_budget_schedules_everything() {
        let plan = plan(ranked(20, &HashSet::new()), &ScanBudget::unlimited());
        assert_eq!(plan.scheduled.len(), 20);
        assert!(plan.over_budget.is_empty());
    }

    #[test]
    fn test_file_budget_keeps_highest_priority() {
        let recent: HashSet<String> = [3, 50, 97].iter().map(|i| format!("f{:03}.py", i)).collect();
        let plan = plan(ranked(100, &recent), &ScanBudget::files(10));
        assert_eq!(plan.scheduled.len(), 10);
        assert_eq!(plan.over_budget.len(), 90);
        let first: Vec<&str> = plan.scheduled[..3]
            .iter()
            .map(|r| r.record.path.as_str())
            .collect();
        assert_eq!(first, vec!["f003.py", "f050.py", "f097.py"]);
    }

    #[test]
    fn test_deadline_only_with_duration() {
        let now = Instant::now();
        assert!(ScanBudget::files(1).deadline(now).is_none());
        let budget = ScanBudget::unlimited().with_max_duration(Duration::from_secs(2));
        assert_eq!(budget.deadline(now), Some(now + Duration::from_secs(2)));
    }
}
