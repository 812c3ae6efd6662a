//! Event type definitions for progress reporting.

use crate::core::duplicates::DuplicatePhase;
use crate::core::scanner::ScanItem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the long-running units of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory scan events
    Scan(ScanEvent),
    /// Duplicate scan events
    Duplicate(DuplicateEvent),
    /// Empty folder scan events
    EmptyFolder(EmptyFolderEvent),
    /// Disposal batch events
    Dispose(DisposeEvent),
}

/// Events during a directory scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A classified entry was found
    ItemFound(ScanItem),
    /// A directory's cumulative size grew
    DirectorySizeUpdated { path: PathBuf, size_bytes: u64 },
    /// Progress update during scanning
    Progress(ScanProgress),
    /// An entry could not be read; scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed {
        total_items: usize,
        total_size_bytes: u64,
    },
    /// Scanning was cancelled; only partial totals exist
    Cancelled { items_seen: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories visited so far
    pub directories_scanned: usize,
    /// Number of files found so far
    pub files_found: usize,
    /// Directory currently being listed
    pub current_path: PathBuf,
}

/// Events during a duplicate scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DuplicateEvent {
    /// Duplicate scan has started
    Started { root: PathBuf },
    /// Moving to a new phase
    PhaseChanged { phase: DuplicatePhase },
    /// Progress update during the current phase
    Progress(DuplicateProgress),
    /// A file could not be read and was dropped
    Error { path: PathBuf, message: String },
    /// Duplicate scan completed
    Completed {
        duplicate_sets: usize,
        reclaimable_bytes: u64,
    },
    /// Duplicate scan was cancelled
    Cancelled,
}

/// Progress information during a duplicate scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateProgress {
    /// Files processed in the current phase
    pub completed: usize,
    /// Files to process in the current phase (0 while walking)
    pub total: usize,
    /// File currently being processed
    pub current_path: PathBuf,
}

/// Events during an empty folder scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EmptyFolderEvent {
    /// Empty folder scan has started
    Started { root: PathBuf },
    /// An empty folder was found
    Found { path: PathBuf },
    /// Empty folder scan completed
    Completed { total_found: usize },
    /// Empty folder scan was cancelled
    Cancelled,
}

/// Events during a disposal batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DisposeEvent {
    /// Batch has started
    Started { total_items: usize, quarantine: bool },
    /// Progress update after each item
    Progress(DisposeProgress),
    /// An item failed; the batch continues
    ItemFailed { path: PathBuf, reason: String },
    /// Batch completed
    Completed { succeeded: usize, failed: usize },
    /// Batch was cancelled between items
    Cancelled { not_attempted: usize },
}

/// Progress information during a disposal batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposeProgress {
    /// Items processed so far
    pub completed: usize,
    /// Items in the batch
    pub total: usize,
    /// Item just processed
    pub current_path: PathBuf,
}

impl DisposeProgress {
    /// Completion as a whole percentage
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Scan(ScanEvent::Progress(ScanProgress {
            directories_scanned: 10,
            files_found: 50,
            current_path: PathBuf::from("/data"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.files_found, 50);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn dispose_progress_percent() {
        let progress = DisposeProgress {
            completed: 1,
            total: 3,
            current_path: PathBuf::from("/a"),
        };
        assert_eq!(progress.percent(), 33);

        let empty = DisposeProgress {
            completed: 0,
            total: 0,
            current_path: PathBuf::new(),
        };
        assert_eq!(empty.percent(), 100);
    }
}
