use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::parallel::ParallelConfig;
use super::scoring::PriorityWeights;
use crate::core::Category;

/// Root configuration structure, read from `.codetriage.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CodetriageConfig {
    /// File walker rules
    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Optional ceiling on one run
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Prioritizer weights
    #[serde(default)]
    pub scoring: PriorityWeights,

    /// Worker pool settings
    #[serde(default)]
    pub parallel: ParallelConfig,

    /// Fingerprint cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Which detectors run
    #[serde(default)]
    pub detectors: DetectorConfig,
}

impl CodetriageConfig {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        self.scoring.validate()?;
        for pattern in self.ignore.patterns.iter().chain(&self.ignore.include) {
            glob::Pattern::new(pattern)
                .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;
        }
        for name in &self.detectors.categories {
            if Category::parse(name).is_none() {
                return Err(format!("Unknown detector category '{}'", name));
            }
        }
        Ok(())
    }
}

pub fn default_max_file_size_mb() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

pub fn default_include_patterns() -> Vec<String> {
    [
        "*.py", "*.js", "*.jsx", "*.ts", "*.tsx", "*.java", "*.c", "*.h", "*.cpp", "*.hpp",
        "*.go", "*.rs", "*.rb", "*.php", "*.cs", "*.kt", "*.swift", "*.sql", "*.sh",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// Ignore rules for the file walker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IgnoreConfig {
    /// Glob patterns; matching files and directories are skipped
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File name globs a candidate must match; empty accepts every file
    #[serde(default = "default_include_patterns")]
    pub include: Vec<String>,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Skip VCS metadata, dependency and build directories
    #[serde(default = "default_true")]
    pub default_excludes: bool,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include: default_include_patterns(),
            max_file_size_mb: default_max_file_size_mb(),
            default_excludes: true,
        }
    }
}

/// Optional limits for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BudgetConfig {
    #[serde(default)]
    pub max_files: Option<usize>,

    #[serde(default)]
    pub max_duration_secs: Option<u64>,
}

impl BudgetConfig {
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Reuse findings of unchanged files across runs (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DetectorConfig {
    /// Categories to run; empty runs all of them
    #[serde(default)]
    pub categories: Vec<String>,

    /// Detector ids to leave out
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl DetectorConfig {
    pub fn enabled_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return Category::ALL.to_vec();
        }
        self.categories
            .iter()
            .filter_map(|name| Category::parse(name))
            .collect()
    }
}
