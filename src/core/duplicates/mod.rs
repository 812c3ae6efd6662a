//! # Duplicates Module
//!
//! Finds groups of byte-identical files.
//!
//! ## Stages
//! 1. Walk and bucket by exact size (files at or below the floor are ignored)
//! 2. Drop buckets with a single member
//! 3. Hash the first 8 KiB of each candidate and re-bucket
//! 4. Stream a full 128-bit hash for survivors and re-bucket
//! 5. Every bucket with two or more members is a [`DuplicateSet`]
//!
//! A full-hash collision is treated as identity.

mod finder;
pub mod hashing;

pub use finder::{DuplicateConfig, DuplicateFinder};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Files sharing size and content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DuplicateSet {
    pub size_bytes: u64,
    /// Sorted, always at least two
    pub paths: Vec<PathBuf>,
    /// Hex of the full content hash
    pub content_hash: String,
}

impl DuplicateSet {
    /// Bytes freed by keeping one copy
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size_bytes * (self.paths.len() as u64).saturating_sub(1)
    }
}

/// Stage a duplicate scan is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePhase {
    Walking,
    PartialHash,
    FullHash,
}

impl std::fmt::Display for DuplicatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Walking => write!(f, "Walking"),
            Self::PartialHash => write!(f, "Partial hashing"),
            Self::FullHash => write!(f, "Full hashing"),
        }
    }
}

/// Everything a duplicate scan found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateScanResult {
    /// Sorted by size (largest first), then by first path
    pub sets: Vec<DuplicateSet>,
    /// Files above the size floor
    pub files_considered: usize,
    /// Files that needed a full hash
    pub files_fully_hashed: usize,
    /// Files dropped because of I/O errors
    pub files_dropped: usize,
}

impl DuplicateScanResult {
    pub fn reclaimable_bytes(&self) -> u64 {
        self.sets.iter().map(DuplicateSet::reclaimable_bytes).sum()
    }

    pub fn duplicate_file_count(&self) -> usize {
        self.sets.iter().map(|s| s.paths.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclaimable_counts_all_but_one_copy() {
        let set = DuplicateSet {
            size_bytes: 100,
            paths: vec!["/a".into(), "/b".into(), "/c".into()],
            content_hash: "00".into(),
        };
        assert_eq!(set.reclaimable_bytes(), 200);
    }

    #[test]
    fn result_totals_span_every_set() {
        let set = |size: u64, paths: &[&str]| DuplicateSet {
            size_bytes: size,
            paths: paths.iter().map(PathBuf::from).collect(),
            content_hash: "00".into(),
        };
        let result = DuplicateScanResult {
            sets: vec![set(50, &["/a", "/b", "/c"]), set(10, &["/d", "/e"])],
            files_considered: 9,
            files_fully_hashed: 5,
            files_dropped: 0,
        };
        assert_eq!(result.duplicate_file_count(), 5);
        assert_eq!(result.reclaimable_bytes(), 110);
    }
}
