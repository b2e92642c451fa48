use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a file by writing a sibling temp file and renaming it over the
/// target, so readers never observe a half-written index.
pub struct AtomicFileWriter {
    target: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", std::process::id()));
        self.target.with_file_name(name)
    }

    pub fn write(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        let result = (|| {
            let mut file = fs::File::create(&temp)?;
            file.write_all(contents)?;
            file.sync_all()?;
            fs::rename(&temp, &self.target)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}
