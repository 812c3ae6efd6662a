//! Size → prefix hash → full hash duplicate search.

use super::hashing::{full_hash, prefix_hash, to_hex};
use super::{DuplicatePhase, DuplicateScanResult, DuplicateSet};
use crate::core::cancel::CancellationToken;
use crate::core::paths::normalize;
use crate::core::scanner::ExclusionSet;
use crate::error::ScanError;
use crate::events::{null_sender, DuplicateEvent, DuplicateProgress, Event, EventSender};
use rayon::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for duplicate detection
#[derive(Debug, Clone)]
pub struct DuplicateConfig {
    /// Files of this size or smaller are not worth deduplicating
    pub min_size_bytes: u64,
    /// Bytes read for the partial hash
    pub prefix_bytes: usize,
    /// Read size for the full hash; cancellation is checked between reads
    pub chunk_size: usize,
    pub follow_symlinks: bool,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1024,
            prefix_bytes: 8 * 1024,
            chunk_size: 64 * 1024,
            follow_symlinks: false,
        }
    }
}

impl DuplicateConfig {
    pub fn with_min_size(mut self, bytes: u64) -> Self {
        self.min_size_bytes = bytes;
        self
    }

    pub fn with_prefix_bytes(mut self, bytes: usize) -> Self {
        self.prefix_bytes = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }
}

/// Exact duplicate finder
#[derive(Debug, Clone, Default)]
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

/// A file waiting for its next hash stage
#[derive(Debug, Clone)]
struct Candidate {
    size: u64,
    path: PathBuf,
}

impl DuplicateFinder {
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DuplicateConfig {
        &self.config
    }

    /// Find duplicates without reporting progress
    pub fn find(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        cancel: &CancellationToken,
    ) -> Result<DuplicateScanResult, ScanError> {
        self.find_with_events(root, exclusions, &null_sender(), cancel)
    }

    /// Find duplicates, reporting phases and progress.
    ///
    /// Returns `ScanError::Cancelled` if `cancel` fires at any point.
    pub fn find_with_events(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<DuplicateScanResult, ScanError> {
        let root = normalize(root);
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        info!(root = %root.display(), "duplicate scan started");
        events.send(Event::Duplicate(DuplicateEvent::Started { root: root.clone() }));

        match self.run(&root, exclusions, events, cancel) {
            Ok(result) => {
                info!(
                    sets = result.sets.len(),
                    reclaimable = result.reclaimable_bytes(),
                    dropped = result.files_dropped,
                    "duplicate scan completed"
                );
                events.send(Event::Duplicate(DuplicateEvent::Completed {
                    duplicate_sets: result.sets.len(),
                    reclaimable_bytes: result.reclaimable_bytes(),
                }));
                Ok(result)
            }
            Err(ScanError::Cancelled) => {
                info!(root = %root.display(), "duplicate scan cancelled");
                events.send(Event::Duplicate(DuplicateEvent::Cancelled));
                Err(ScanError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn run(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<DuplicateScanResult, ScanError> {
        let mut result = DuplicateScanResult::default();

        events.send(Event::Duplicate(DuplicateEvent::PhaseChanged {
            phase: DuplicatePhase::Walking,
        }));
        let by_size = self.bucket_by_size(root, exclusions, cancel)?;
        result.files_considered = by_size.values().map(Vec::len).sum();
        let candidates = flatten_groups(by_size);
        debug!(candidates = candidates.len(), "size buckets with two or more files");

        events.send(Event::Duplicate(DuplicateEvent::PhaseChanged {
            phase: DuplicatePhase::PartialHash,
        }));
        let prefix_bytes = self.config.prefix_bytes;
        let prefixed = hash_stage(&candidates, events, cancel, |c| {
            prefix_hash(&c.path, prefix_bytes).map(Some)
        })?;
        result.files_dropped += prefixed.dropped;
        let candidates = flatten_groups(group_by(prefixed.hashed));
        debug!(candidates = candidates.len(), "prefix buckets with two or more files");

        events.send(Event::Duplicate(DuplicateEvent::PhaseChanged {
            phase: DuplicatePhase::FullHash,
        }));
        result.files_fully_hashed = candidates.len();
        let chunk_size = self.config.chunk_size;
        let hashed = hash_stage(&candidates, events, cancel, |c| {
            full_hash(&c.path, chunk_size, cancel)
        })?;
        result.files_dropped += hashed.dropped;

        let mut sets: Vec<DuplicateSet> = group_by(hashed.hashed)
            .into_iter()
            .filter(|(_, group)| group.len() >= 2)
            .map(|((size, hash), group)| {
                let mut paths: Vec<PathBuf> = group.into_iter().map(|c| c.path).collect();
                paths.sort();
                DuplicateSet {
                    size_bytes: size,
                    paths,
                    content_hash: to_hex(hash),
                }
            })
            .collect();
        sets.sort_by(|a, b| {
            b.size_bytes
                .cmp(&a.size_bytes)
                .then_with(|| a.paths.cmp(&b.paths))
        });
        result.sets = sets;

        Ok(result)
    }

    /// Walk the tree and group eligible files by exact size
    fn bucket_by_size(
        &self,
        root: &Path,
        exclusions: &ExclusionSet,
        cancel: &CancellationToken,
    ) -> Result<HashMap<u64, Vec<Candidate>>, ScanError> {
        let mut by_size: HashMap<u64, Vec<Candidate>> = HashMap::new();
        if exclusions.is_excluded(root) {
            return Ok(by_size);
        }

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !exclusions.is_excluded(entry.path()));

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "cannot stat file");
                    continue;
                }
            };
            if size <= self.config.min_size_bytes {
                continue;
            }
            by_size.entry(size).or_default().push(Candidate {
                size,
                path: entry.into_path(),
            });
        }

        Ok(by_size)
    }
}

struct StageOutput<H> {
    hashed: Vec<(H, Candidate)>,
    dropped: usize,
}

/// Hash every candidate on the rayon pool.
///
/// `hash` returns `Ok(None)` when it noticed cancellation mid-file.
fn hash_stage<H, F>(
    candidates: &[Candidate],
    events: &EventSender,
    cancel: &CancellationToken,
    hash: F,
) -> Result<StageOutput<H>, ScanError>
where
    H: Send,
    F: Fn(&Candidate) -> io::Result<Option<H>> + Sync,
{
    let total = candidates.len();
    let completed = AtomicUsize::new(0);

    let outcomes: Vec<Option<io::Result<H>>> = candidates
        .par_iter()
        .map(|candidate| {
            if cancel.is_cancelled() {
                return None;
            }
            let outcome = hash(candidate).transpose()?;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            events.send(Event::Duplicate(DuplicateEvent::Progress(DuplicateProgress {
                completed: done,
                total,
                current_path: candidate.path.clone(),
            })));
            Some(outcome)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let mut output = StageOutput {
        hashed: Vec::with_capacity(total),
        dropped: 0,
    };
    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Some(Ok(value)) => output.hashed.push((value, candidate.clone())),
            Some(Err(e)) => {
                warn!(path = %candidate.path.display(), error = %e, "dropping unreadable file");
                events.send(Event::Duplicate(DuplicateEvent::Error {
                    path: candidate.path.clone(),
                    message: e.to_string(),
                }));
                output.dropped += 1;
            }
            // Only reachable through cancellation, handled above
            None => {}
        }
    }
    Ok(output)
}

/// Group hashed candidates by `(size, hash)`
fn group_by<H: Eq + Hash>(hashed: Vec<(H, Candidate)>) -> HashMap<(u64, H), Vec<Candidate>> {
    let mut groups: HashMap<(u64, H), Vec<Candidate>> = HashMap::new();
    for (hash, candidate) in hashed {
        groups.entry((candidate.size, hash)).or_default().push(candidate);
    }
    groups
}

/// Keep members of groups with two or more files
fn flatten_groups<K>(groups: HashMap<K, Vec<Candidate>>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = groups
        .into_values()
        .filter(|group| group.len() >= 2)
        .flatten()
        .collect();
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}
