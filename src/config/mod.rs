//! Configuration: `.codetriage.toml` discovery, parsing and defaults.

mod core;
mod loader;
mod parallel;
mod scoring;

pub use self::core::{
    default_include_patterns, default_max_file_size_mb, BudgetConfig, CacheConfig,
    CodetriageConfig, DetectorConfig, IgnoreConfig,
};
pub use loader::{
    directory_ancestors, find_config_file, load_config, load_config_file,
    parse_and_validate_config, CONFIG_FILE_NAME,
};
pub use parallel::ParallelConfig;
pub use scoring::PriorityWeights;
