//! Content fingerprints used to decide whether a file needs re-analysis.

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh64::xxh64;

/// Content digest plus the size/mtime pair used as a cheap pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: String,
    pub size: u64,
    pub modified: u64,
}

impl Fingerprint {
    pub fn of_content(content: &[u8], modified: u64) -> Self {
        Self {
            hash: content_hash(content),
            size: content.len() as u64,
            modified,
        }
    }

    /// Equal digests are treated as equal content.
    pub fn same_content(&self, other: &Fingerprint) -> bool {
        self.size == other.size && self.hash == other.hash
    }

    /// Cheap check that never reads the file.
    pub fn same_stat(&self, size: u64, modified: u64) -> bool {
        self.size == size && self.modified == modified
    }
}

pub fn content_hash(content: &[u8]) -> String {
    format!("{:016x}", xxh64(content, 0))
}

/// Modification time in nanoseconds since the unix epoch, 0 when unavailable.
pub fn modified_nanos(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos() as u64)
        .unwrap_or(0)
}
