//! # Empty Folders Module
//!
//! Reports directories with nothing in them, deepest first.
//!
//! With `include_nested`, a directory whose only children are themselves
//! empty directories is reported as well, so removing every reported
//! path in order clears the whole chain.

use crate::core::cancel::CancellationToken;
use crate::core::paths::normalize;
use crate::core::scanner::ExclusionSet;
use crate::error::ScanError;
use crate::events::{null_sender, EmptyFolderEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct EmptyFolderConfig {
    /// Also report directories that only contain empty directories
    pub include_nested: bool,
    pub follow_symlinks: bool,
}

/// Result of an empty-folder scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyFolderResult {
    /// Deepest first; a parent never precedes its children
    pub folders: Vec<PathBuf>,
    pub directories_checked: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EmptyFolderFinder {
    config: EmptyFolderConfig,
}

impl EmptyFolderFinder {
    pub fn new(config: EmptyFolderConfig) -> Self {
        Self { config }
    }

    pub fn find(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        cancel: &CancellationToken,
    ) -> Result<EmptyFolderResult, ScanError> {
        self.find_with_events(root, exclusions, &null_sender(), cancel)
    }

    pub fn find_with_events(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<EmptyFolderResult, ScanError> {
        let root = normalize(root);
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        events.send(Event::EmptyFolder(EmptyFolderEvent::Started { root: root.clone() }));
        let mut result = EmptyFolderResult::default();
        if exclusions.is_excluded(&root) {
            events.send(Event::EmptyFolder(EmptyFolderEvent::Completed { total_found: 0 }));
            return Ok(result);
        }

        let mut empty: HashSet<PathBuf> = HashSet::new();
        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !exclusions.is_excluded(entry.path()));

        for entry in walker {
            if cancel.is_cancelled() {
                info!(root = %root.display(), "empty folder scan cancelled");
                events.send(Event::EmptyFolder(EmptyFolderEvent::Cancelled));
                return Err(ScanError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            result.directories_checked += 1;
            if self.is_empty(entry.path(), &empty) {
                let path = entry.into_path();
                events.send(Event::EmptyFolder(EmptyFolderEvent::Found { path: path.clone() }));
                empty.insert(path.clone());
                result.folders.push(path);
            }
        }

        info!(
            root = %root.display(),
            found = result.folders.len(),
            checked = result.directories_checked,
            "empty folder scan completed"
        );
        events.send(Event::EmptyFolder(EmptyFolderEvent::Completed {
            total_found: result.folders.len(),
        }));
        Ok(result)
    }

    fn is_empty(&self, dir: &Path, known_empty: &HashSet<PathBuf>) -> bool {
        let mut entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "cannot list directory");
                return false;
            }
        };

        if self.config.include_nested {
            entries.all(|entry| {
                entry
                    .map(|e| known_empty.contains(&e.path()))
                    .unwrap_or(false)
            })
        } else {
            entries.next().is_none()
        }
    }
}
