//! Directory walking implementation using walkdir.

use super::{EntryKind, ExclusionSet, ScanItem, ScanOutcome, ScanResult};
use crate::core::cancel::CancellationToken;
use crate::core::category::Categorizer;
use crate::core::paths::normalize;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Maximum directory depth below the root (None = unlimited)
    pub max_depth: Option<usize>,
    /// Send a progress event every this many entries
    pub progress_interval: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: None,
            progress_interval: 250,
        }
    }
}

/// Scanner that classifies every entry it walks
pub struct DirectoryScanner {
    config: ScanConfig,
    categorizer: Categorizer,
}

impl DirectoryScanner {
    pub fn new(config: ScanConfig, categorizer: Categorizer) -> Self {
        Self {
            config,
            categorizer,
        }
    }

    /// Start a lazy walk of `root`.
    ///
    /// Each call is a fresh run; a walk cannot be resumed once dropped.
    pub fn walk<'a>(
        &'a self,
        root: &Path,
        exclusions: &ExclusionSet,
        cancel: &CancellationToken,
    ) -> Result<ScanWalk<'a>, ScanError> {
        let root = normalize(root);
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        self.categorizer.clear_cache();

        let mut dir_sizes = HashMap::new();
        dir_sizes.insert(root.clone(), 0);

        let entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + 'a> =
            if exclusions.is_excluded(&root) {
                debug!(root = %root.display(), "scan root is excluded");
                Box::new(std::iter::empty())
            } else {
                let mut walker = WalkDir::new(&root)
                    .follow_links(self.config.follow_symlinks)
                    .min_depth(1)
                    .sort_by_file_name();
                if let Some(depth) = self.config.max_depth {
                    walker = walker.max_depth(depth);
                }
                let pruning = exclusions.clone();
                Box::new(
                    walker
                        .into_iter()
                        .filter_entry(move |entry| !pruning.is_excluded(entry.path())),
                )
            };

        Ok(ScanWalk {
            categorizer: &self.categorizer,
            entries,
            cancel: cancel.clone(),
            outcome: ScanOutcome {
                root,
                dir_sizes,
                ..ScanOutcome::default()
            },
            errors: VecDeque::new(),
            cancelled: false,
            exhausted: false,
        })
    }

    /// Walk to the end and collect every item
    pub fn scan(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let mut walk = self.walk(root, exclusions, cancel)?;
        let items: Vec<ScanItem> = walk.by_ref().collect();
        Ok(ScanResult {
            items,
            outcome: walk.finish(),
        })
    }

    /// Walk to the end, forwarding items and size updates as events.
    ///
    /// Returns the outcome; `completed` is false if `cancel` fired.
    pub fn scan_with_events(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let mut walk = self.walk(root, exclusions, cancel)?;
        let root = walk.root().to_path_buf();
        info!(root = %root.display(), exclusions = exclusions.len(), "scan started");
        events.send(Event::Scan(ScanEvent::Started { root: root.clone() }));

        let mut seen = 0usize;
        while let Some(item) = walk.next() {
            seen += 1;

            for (path, message) in walk.take_errors() {
                events.send(Event::Scan(ScanEvent::Error { path, message }));
            }

            if item.kind == EntryKind::File {
                for dir in item.path.ancestors().skip(1) {
                    if !dir.starts_with(&root) {
                        break;
                    }
                    events.send(Event::Scan(ScanEvent::DirectorySizeUpdated {
                        path: dir.to_path_buf(),
                        size_bytes: walk.dir_size(dir),
                    }));
                }
            }

            let current_path = if item.is_dir() {
                item.path.clone()
            } else {
                item.path.parent().map(Path::to_path_buf).unwrap_or_default()
            };
            events.send(Event::Scan(ScanEvent::ItemFound(item)));

            if seen % self.config.progress_interval.max(1) == 0 {
                let progress = walk.progress();
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned: progress.directories,
                    files_found: progress.files,
                    current_path,
                })));
            }
        }

        for (path, message) in walk.take_errors() {
            events.send(Event::Scan(ScanEvent::Error { path, message }));
        }

        let outcome = walk.finish();
        if outcome.completed {
            info!(
                root = %root.display(),
                files = outcome.files,
                directories = outcome.directories,
                skipped = outcome.skipped,
                "scan completed"
            );
            events.send(Event::Scan(ScanEvent::Completed {
                total_items: outcome.files + outcome.directories,
                total_size_bytes: outcome.total_size_bytes(),
            }));
        } else {
            info!(root = %root.display(), items_seen = seen, "scan cancelled");
            events.send(Event::Scan(ScanEvent::Cancelled { items_seen: seen }));
        }

        Ok(outcome)
    }
}

/// An in-progress walk; iterate it for items, then call [`finish`](Self::finish).
pub struct ScanWalk<'a> {
    categorizer: &'a Categorizer,
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + 'a>,
    cancel: CancellationToken,
    outcome: ScanOutcome,
    errors: VecDeque<(PathBuf, String)>,
    cancelled: bool,
    exhausted: bool,
}

/// Counters so far
#[derive(Debug, Clone, Copy)]
pub struct WalkProgress {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

impl<'a> ScanWalk<'a> {
    pub fn root(&self) -> &Path {
        &self.outcome.root
    }

    /// Cumulative size of `dir` so far
    pub fn dir_size(&self, dir: &Path) -> u64 {
        self.outcome.dir_sizes.get(dir).copied().unwrap_or(0)
    }

    /// Running directory sizes
    pub fn dir_sizes(&self) -> &HashMap<PathBuf, u64> {
        &self.outcome.dir_sizes
    }

    pub fn progress(&self) -> WalkProgress {
        WalkProgress {
            files: self.outcome.files,
            directories: self.outcome.directories,
            skipped: self.outcome.skipped,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Skipped entries not yet taken, oldest first
    pub fn take_errors(&mut self) -> Vec<(PathBuf, String)> {
        self.errors.drain(..).collect()
    }

    /// Consume the walk and return what it found
    pub fn finish(self) -> ScanOutcome {
        let mut outcome = self.outcome;
        outcome.completed = self.exhausted && !self.cancelled;
        outcome
    }

    fn record_skip(&mut self, path: PathBuf, message: String) {
        debug!(path = %path.display(), error = %message, "skipping unreadable entry");
        self.outcome.skipped += 1;
        self.errors.push_back((path, message));
    }

    fn propagate_size(&mut self, file: &Path, size: u64) {
        let root = self.outcome.root.clone();
        for dir in file.ancestors().skip(1) {
            if !dir.starts_with(&root) {
                break;
            }
            *self.outcome.dir_sizes.entry(dir.to_path_buf()).or_insert(0) += size;
        }
    }
}

impl<'a> Iterator for ScanWalk<'a> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        loop {
            if self.cancelled || self.exhausted {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                return None;
            }

            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    self.record_skip(path, e.to_string());
                    continue;
                }
                None => {
                    self.exhausted = true;
                    return None;
                }
            };

            let path = entry.path().to_path_buf();

            if entry.file_type().is_dir() {
                self.outcome.directories += 1;
                self.outcome.dir_sizes.entry(path.clone()).or_insert(0);
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                let category = self.categorizer.classify(&path);
                return Some(ScanItem {
                    path,
                    kind: EntryKind::Directory,
                    size_bytes: 0,
                    modified,
                    category,
                });
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    self.record_skip(path, e.to_string());
                    continue;
                }
            };

            let size = metadata.len();
            self.outcome.files += 1;
            self.propagate_size(&path, size);

            let category = self.categorizer.classify(&path);
            return Some(ScanItem {
                path,
                kind: EntryKind::File,
                size_bytes: size,
                modified: metadata.modified().ok(),
                category,
            });
        }
    }
}
