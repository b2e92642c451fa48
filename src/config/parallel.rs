//! Worker pool and detector timeout configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_enabled() -> bool {
    true
}

fn default_detector_timeout_secs() -> u64 {
    10
}

/// Configuration for the per-file worker pool.
///
/// Each worker takes one file at a time and runs the full detector set on
/// it before taking the next one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel processing (default: true)
    ///
    /// When disabled, files are processed on a single worker.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of workers (default: number of CPUs)
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Time allowed for one detector on one file, in seconds (default: 10)
    #[serde(default = "default_detector_timeout_secs")]
    pub detector_timeout_secs: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            jobs: None,
            detector_timeout_secs: default_detector_timeout_secs(),
        }
    }
}

impl ParallelConfig {
    /// Create a config with parallel processing disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.jobs.filter(|&jobs| jobs > 0).unwrap_or_else(num_cpus::get)
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_secs(self.detector_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_uses_one_worker() {
        let config = ParallelConfig {
            jobs: Some(8),
            ..ParallelConfig::sequential()
        };
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_zero_jobs_falls_back_to_cpus() {
        let config = ParallelConfig {
            jobs: Some(0),
            ..ParallelConfig::default()
        };
        assert_eq!(config.worker_count(), num_cpus::get());
    }
}
