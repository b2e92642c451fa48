use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::CodetriageConfig;
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".codetriage.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Pure function to parse and validate config from TOML string
pub fn parse_and_validate_config(contents: &str) -> std::result::Result<CodetriageConfig, String> {
    let mut config = toml::from_str::<CodetriageConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;

    config.validate()?;
    config.scoring.normalize();
    Ok(config)
}

/// Pure function to generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Load configuration from an explicit file. Missing or invalid files are fatal.
pub fn load_config_file(path: &Path) -> Result<CodetriageConfig> {
    let contents = read_config_file(path)
        .map_err(|e| Error::config_at(format!("Cannot read {}: {}", path.display(), e), path))?;
    let config = parse_and_validate_config(&contents).map_err(|e| Error::config_at(e, path))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Find `.codetriage.toml` in `start` or its ancestors.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let start = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Discover and load the configuration for a scan root.
///
/// No config file means defaults. A config file that exists but cannot be
/// read or parsed is a corrupt configuration and aborts the run.
pub fn load_config(root: &Path) -> Result<CodetriageConfig> {
    match find_config_file(root) {
        Some(path) => load_config_file(&path),
        None => {
            log::debug!(
                "No {} found within {} directories of {}. Using default config.",
                CONFIG_FILE_NAME,
                MAX_TRAVERSAL_DEPTH,
                root.display()
            );
            Ok(CodetriageConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_and_validate_config(indoc! {r#"
            [ignore]
            patterns = ["vendor/**"]

            [budget]
            max_files = 25
        "#})
        .unwrap();

        assert_eq!(config.ignore.patterns, vec!["vendor/**".to_string()]);
        assert_eq!(config.ignore.max_file_size_mb, 5);
        assert!(config.ignore.include.contains(&"*.py".to_string()));
        assert_eq!(config.budget.max_files, Some(25));
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_category_rejected() {
        let err = parse_and_validate_config(indoc! {r#"
            [detectors]
            categories = ["style"]
        "#})
        .unwrap_err();
        assert!(err.contains("style"));
    }

    #[test]
    fn test_weights_are_normalized_on_load() {
        let config = parse_and_validate_config(indoc! {r#"
            [scoring]
            recency = 1.0
            density = 1.0
            size = 0.0
        "#})
        .unwrap();
        assert!((config.scoring.recency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_discovers_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[budget]\nmax_files = 3\n",
        )
        .unwrap();

        let config = load_config(&nested).unwrap();
        assert_eq!(config.budget.max_files, Some(3));
    }

    #[test]
    fn test_corrupt_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[budget\nmax_files = ").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_missing_explicit_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = load_config_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { path: Some(_), .. }));
    }
}
