use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const CACHE_DIR_ENV: &str = "CODETRIAGE_CACHE_DIR";

/// Strategy for cache storage location
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStrategy {
    /// Store cache in the platform cache directory (default)
    Shared,
    /// Store cache in user-specified location
    Custom(PathBuf),
}

/// Where the fingerprint index of one project lives.
///
/// Each scan root gets its own directory, keyed by a hash of its canonical
/// path, so two projects never share an index.
#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub strategy: CacheStrategy,
    pub base_path: PathBuf,
    pub project_id: String,
}

impl CacheLocation {
    /// Resolve cache location based on environment and defaults
    pub fn resolve(project_root: &Path) -> Self {
        let strategy = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => CacheStrategy::Custom(PathBuf::from(dir)),
            _ => CacheStrategy::Shared,
        };

        let base = match &strategy {
            CacheStrategy::Shared => Self::shared_cache_dir(),
            CacheStrategy::Custom(path) => path.join("codetriage"),
        };

        Self::under(strategy, base, project_root)
    }

    /// Place the cache under an explicit directory.
    pub fn in_dir(cache_dir: &Path, project_root: &Path) -> Self {
        let strategy = CacheStrategy::Custom(cache_dir.to_path_buf());
        Self::under(strategy, cache_dir.join("codetriage"), project_root)
    }

    fn under(strategy: CacheStrategy, base: PathBuf, project_root: &Path) -> Self {
        let project_id = Self::generate_project_id(project_root);
        let base_path = base.join("projects").join(&project_id);
        Self {
            strategy,
            base_path,
            project_id,
        }
    }

    /// Get platform-specific shared cache directory
    fn shared_cache_dir() -> PathBuf {
        if let Some(xdg_cache) = std::env::var_os("XDG_CACHE_HOME") {
            if !xdg_cache.is_empty() {
                return PathBuf::from(xdg_cache).join("codetriage");
            }
        }

        dirs::cache_dir()
            .map(|dir| dir.join("codetriage"))
            .unwrap_or_else(|| std::env::temp_dir().join("codetriage_cache"))
    }

    /// Stable project id: first 16 hex chars of sha256(canonical root path)
    pub fn generate_project_id(project_root: &Path) -> String {
        let abs_path = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(abs_path.to_string_lossy().as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        hash[..16].to_string()
    }

    pub fn get_cache_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the persisted fingerprint index
    pub fn index_path(&self) -> PathBuf {
        self.base_path.join("fingerprints.json")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_path)
            .with_context(|| format!("Failed to create cache directory: {:?}", self.base_path))
    }
}
