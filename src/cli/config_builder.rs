//! Turning CLI flags into a validated configuration.
//!
//! The file configuration is loaded first; every flag that was given
//! replaces the corresponding file value.

use crate::cli::args::ScanArgs;
use crate::config::{load_config, load_config_file, CodetriageConfig};
use anyhow::{Context, Result};
use std::path::Path;

pub fn build_config(root: &Path, args: &ScanArgs) -> Result<CodetriageConfig> {
    let config = match &args.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_config(root).context("Failed to load project configuration")?,
    };
    let config = apply_overrides(config, args);
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

// Pure function: flags win over file values
pub fn apply_overrides(mut config: CodetriageConfig, args: &ScanArgs) -> CodetriageConfig {
    if args.max_files.is_some() {
        config.budget.max_files = args.max_files;
    }
    if args.max_duration.is_some() {
        config.budget.max_duration_secs = args.max_duration;
    }
    config.ignore.patterns.extend(args.ignore.iter().cloned());
    if !args.include.is_empty() {
        config.ignore.include = args.include.clone();
    }
    if let Some(mb) = args.max_file_size_mb {
        config.ignore.max_file_size_mb = mb;
    }
    if let Some(jobs) = args.jobs {
        config.parallel.jobs = Some(jobs);
        config.parallel.enabled = jobs != 1;
    }
    if let Some(secs) = args.detector_timeout {
        config.parallel.detector_timeout_secs = secs;
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    if !args.categories.is_empty() {
        config.detectors.categories = args.categories.clone();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_file_values() {
        let config = CodetriageConfig::default();
        let args = ScanArgs {
            max_files: Some(10),
            ignore: vec!["*.min.js".into()],
            include: vec!["*.py".into()],
            no_cache: true,
            detector_timeout: Some(3),
            ..Default::default()
        };
        let config = apply_overrides(config, &args);
        assert_eq!(config.budget.max_files, Some(10));
        assert_eq!(config.ignore.patterns, vec!["*.min.js".to_string()]);
        assert_eq!(config.ignore.include, vec!["*.py".to_string()]);
        assert!(!config.cache.enabled);
        assert_eq!(config.parallel.detector_timeout_secs, 3);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let dir = TempDir::new().unwrap();
        let args = ScanArgs {
            categories: vec!["style".into()],
            ..Default::default()
        };
        assert!(build_config(dir.path(), &args).is_err());
    }

    #[test]
    fn test_explicit_config_file_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[budget]\nmax_files = 7\n").unwrap();
        let args = ScanArgs {
            config: Some(path),
            ..Default::default()
        };
        let config = build_config(dir.path(), &args).unwrap();
        assert_eq!(config.budget.max_files, Some(7));
    }
}
