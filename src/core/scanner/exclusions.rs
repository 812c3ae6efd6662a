//! Exclusion prefixes shared by every tree walk.

use crate::core::paths::{comparison_key, key_is_under};
use std::path::{Path, PathBuf};

/// Directory prefixes that are invisible to scanning.
///
/// A snapshot: build one at the start of a scan and do not mutate it
/// while the walk runs.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    prefixes: Vec<PathBuf>,
    keys: Vec<String>,
}

impl ExclusionSet {
    /// An empty set that excludes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any list of path-like prefixes
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .fold(Self::new(), |set, p| set.with_prefix(p.as_ref()))
    }

    /// Add one prefix; blank entries are ignored
    pub fn with_prefix(mut self, prefix: &Path) -> Self {
        if prefix.as_os_str().is_empty() {
            return self;
        }
        let key = comparison_key(prefix);
        if !self.keys.contains(&key) {
            self.prefixes.push(prefix.to_path_buf());
            self.keys.push(key);
        }
        self
    }

    /// True if `path` is one of the prefixes or lies beneath one
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.keys.is_empty() {
            return false;
        }
        let key = comparison_key(path);
        self.keys.iter().any(|prefix| key_is_under(&key, prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Prefixes as they were given
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_excludes_nothing() {
        let set = ExclusionSet::new();
        assert!(!set.is_excluded(Path::new("/anything")));
    }

    #[test]
    fn excludes_prefix_and_descendants_case_insensitively() {
        let set = ExclusionSet::from_paths(["/Data/Keep"]);
        assert!(set.is_excluded(Path::new("/data/keep")));
        assert!(set.is_excluded(Path::new("/DATA/KEEP/inner/file.txt")));
        assert!(!set.is_excluded(Path::new("/data/keeper/file.txt")));
        assert!(!set.is_excluded(Path::new("/data")));
    }

    #[test]
    fn duplicate_and_blank_prefixes_are_ignored() {
        let set = ExclusionSet::from_paths(["/a/b", "/A/B/", ""]);
        assert_eq!(set.len(), 1);
    }
}
