//! # Scanner Module
//!
//! Streams every entry under a root as a classified [`ScanItem`] and keeps
//! running cumulative sizes for each directory.
//!
//! ## Guarantees
//! - Directories are emitted before their contents
//! - Excluded subtrees are pruned during traversal, never descended into
//! - Unreadable entries are skipped without aborting the walk
//! - Cancellation yields a partial outcome, never a "completed" one
//!
//! ## Example
//! ```rust,ignore
//! use space_reclaim::core::scanner::{DirectoryScanner, ExclusionSet, ScanConfig};
//!
//! let scanner = DirectoryScanner::new(ScanConfig::default(), Categorizer::from_environment());
//! let mut walk = scanner.walk(root, &ExclusionSet::new(), &CancellationToken::new())?;
//! for item in walk.by_ref() {
//!     println!("{} {}", item.path.display(), item.category);
//! }
//! let outcome = walk.finish();
//! ```

mod exclusions;
mod walker;

pub use exclusions::ExclusionSet;
pub use walker::{DirectoryScanner, ScanConfig, ScanWalk};

use crate::core::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::SystemTime;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One classified filesystem entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanItem {
    /// Normalized absolute path
    pub path: PathBuf,
    pub kind: EntryKind,
    /// File size in bytes; always 0 for directories
    pub size_bytes: u64,
    /// Last modified time, if the platform reports one
    pub modified: Option<SystemTime>,
    pub category: Category,
}

impl ScanItem {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// What a walk produced, complete or not
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub root: PathBuf,
    /// Cumulative bytes beneath each visited directory, root included
    pub dir_sizes: HashMap<PathBuf, u64>,
    pub files: usize,
    pub directories: usize,
    /// Entries that could not be read and were skipped
    pub skipped: usize,
    /// False when the walk was cancelled before the end
    pub completed: bool,
}

impl ScanOutcome {
    /// Total bytes found beneath the root
    pub fn total_size_bytes(&self) -> u64 {
        self.dir_sizes.get(&self.root).copied().unwrap_or(0)
    }

    /// Directories ordered by cumulative size, largest first
    pub fn largest_directories(&self, limit: usize) -> Vec<(PathBuf, u64)> {
        let mut dirs: Vec<(PathBuf, u64)> = self
            .dir_sizes
            .iter()
            .filter(|(path, _)| **path != self.root)
            .map(|(path, size)| (path.clone(), *size))
            .collect();
        dirs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        dirs.truncate(limit);
        dirs
    }
}

/// Items plus outcome for callers that do not need streaming
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub items: Vec<ScanItem>,
    pub outcome: ScanOutcome,
}

/// Per-category totals, the way a UI buckets a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub files: usize,
    pub directories: usize,
    pub size_bytes: u64,
}

impl CategorySummary {
    /// Count one item; only files carry size, so directories are not double counted
    pub fn add(&mut self, item: &ScanItem) {
        match item.kind {
            EntryKind::File => {
                self.files += 1;
                self.size_bytes += item.size_bytes;
            }
            EntryKind::Directory => self.directories += 1,
        }
    }
}

impl ScanResult {
    /// Bucket items by category
    pub fn by_category(&self) -> BTreeMap<Category, CategorySummary> {
        let mut buckets: BTreeMap<Category, CategorySummary> = BTreeMap::new();
        for item in &self.items {
            buckets.entry(item.category).or_default().add(item);
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, kind: EntryKind, size: u64, category: Category) -> ScanItem {
        ScanItem {
            path: PathBuf::from(path),
            kind,
            size_bytes: size,
            modified: None,
            category,
        }
    }

    #[test]
    fn by_category_counts_files_and_directories() {
        let result = ScanResult {
            items: vec![
                item("/r/logs", EntryKind::Directory, 0, Category::Unknown),
                item("/r/logs/a.log", EntryKind::File, 10, Category::SafeToDelete),
                item("/r/logs/b.log", EntryKind::File, 5, Category::SafeToDelete),
                item("/r/notes.txt", EntryKind::File, 7, Category::Unknown),
            ],
            outcome: ScanOutcome::default(),
        };

        let buckets = result.by_category();
        assert_eq!(buckets[&Category::SafeToDelete].files, 2);
        assert_eq!(buckets[&Category::SafeToDelete].size_bytes, 15);
        assert_eq!(buckets[&Category::Unknown].directories, 1);
        assert_eq!(buckets[&Category::Unknown].size_bytes, 7);
    }

    #[test]
    fn summary_add_gives_directories_no_size() {
        let mut summary = CategorySummary::default();
        summary.add(&item("/r/build", EntryKind::Directory, 4096, Category::SafeToDelete));
        summary.add(&item("/r/build/out.o", EntryKind::File, 12, Category::SafeToDelete));
        assert_eq!(
            summary,
            CategorySummary {
                files: 1,
                directories: 1,
                size_bytes: 12
            }
        );
    }

    #[test]
    fn largest_directories_excludes_root() {
        let mut outcome = ScanOutcome {
            root: PathBuf::from("/r"),
            ..Default::default()
        };
        outcome.dir_sizes.insert(PathBuf::from("/r"), 30);
        outcome.dir_sizes.insert(PathBuf::from("/r/a"), 10);
        outcome.dir_sizes.insert(PathBuf::from("/r/b"), 20);

        let top = outcome.largest_directories(5);
        assert_eq!(top, vec![(PathBuf::from("/r/b"), 20), (PathBuf::from("/r/a"), 10)]);
        assert_eq!(outcome.total_size_bytes(), 30);
    }
}
