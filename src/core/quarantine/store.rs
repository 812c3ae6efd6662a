//! The quarantine area and its index.

use super::index::{self, Index, INDEX_FILE_NAME};
use super::transfer::{copy_any, move_dir, move_file, remove_any, tree_size, MoveError};
use super::types::{
    ItemFailure, ListedItem, PreservedAttributes, PurgeReport, QuarantinedEntry, QuarantinedItem,
    ReconcileReport, RestoreReport, RestoredItem,
};
use crate::core::category::Category;
use crate::core::history::{record_or_warn, AuditLog, DeletionEventType, DeletionRecord, NullAuditLog};
use crate::core::scanner::EntryKind;
use crate::error::QuarantineError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

/// Reversible holding area for disposed files.
///
/// Every index read-modify-write runs under one writer lock, so a store
/// can be shared between threads. Two stores over the same directory in
/// different processes are not coordinated.
pub struct QuarantineStore {
    root: PathBuf,
    index_path: PathBuf,
    writer: Mutex<()>,
    audit: Arc<dyn AuditLog>,
}

impl std::fmt::Debug for QuarantineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuarantineStore")
            .field("root", &self.root)
            .finish()
    }
}

impl QuarantineStore {
    /// Store rooted at `root`; nothing is created until first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_path: root.join(INDEX_FILE_NAME),
            root,
            writer: Mutex::new(()),
            audit: Arc::new(NullAuditLog),
        }
    }

    /// Record quarantine, restore and purge events in `audit`
    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Create the quarantine directory if needed
    pub fn ensure_area(&self) -> Result<(), QuarantineError> {
        fs::create_dir_all(&self.root).map_err(|source| QuarantineError::AreaUnavailable {
            path: self.root.clone(),
            source,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, QuarantineError> {
        self.writer.lock().map_err(|_| QuarantineError::LockPoisoned)
    }

    fn save_index(&self, index: &Index) -> io::Result<()> {
        index::save(&self.index_path, index)
    }

    /// Move `path` into the area and index it.
    ///
    /// The object is moved before the index is written. If the write
    /// fails the object stays in the area and shows up in [`reconcile`](Self::reconcile).
    pub fn quarantine(
        &self,
        path: &Path,
        category: Category,
        attributes: PreservedAttributes,
    ) -> Result<QuarantinedItem, QuarantineError> {
        self.ensure_area()?;

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(QuarantineError::SourceMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(QuarantineError::MoveFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let (kind, size_bytes) = if metadata.is_dir() {
            (EntryKind::Directory, tree_size(path))
        } else {
            (EntryKind::File, metadata.len())
        };

        let id = generate_id(path);
        let location = self.root.join(&id);

        let moved = match kind {
            EntryKind::Directory => move_dir(path, &location),
            EntryKind::File => move_file(path, &location).map_err(MoveError::NotMoved),
        };
        // A complete copy is indexed even when the source could not be
        // fully removed, so it stays restorable
        let left_behind = match moved {
            Ok(()) => None,
            Err(MoveError::NotMoved(source)) => {
                return Err(QuarantineError::MoveFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(MoveError::SourceLeftBehind(source)) => {
                warn!(
                    path = %path.display(),
                    id = %id,
                    error = %source,
                    "source only partly removed after copy"
                );
                Some(source)
            }
        };

        let entry = QuarantinedEntry {
            original_path: path.to_path_buf(),
            quarantined_at: Utc::now(),
            category,
            kind,
            size_bytes: Some(size_bytes),
            attributes,
        };

        {
            let _guard = self.lock()?;
            let mut index = index::load(&self.index_path);
            index.insert(id.clone(), entry.clone());
            self.save_index(&index)
                .map_err(|e| QuarantineError::MetadataWrite {
                    id: id.clone(),
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        info!(path = %path.display(), id = %id, "quarantined");
        record_or_warn(
            self.audit.as_ref(),
            DeletionRecord::new(DeletionEventType::Quarantine, path)
                .with_size(Some(size_bytes))
                .with_destination(&location),
        );

        if let Some(source) = left_behind {
            return Err(QuarantineError::SourceNotFullyRemoved {
                id,
                path: path.to_path_buf(),
                source,
            });
        }

        Ok(QuarantinedItem {
            id,
            location,
            entry,
        })
    }

    /// Look up one entry
    pub fn get(&self, id: &str) -> Option<QuarantinedEntry> {
        index::load(&self.index_path).get(id).cloned()
    }

    /// Restore every id, collecting failures instead of stopping
    pub fn restore(&self, ids: &[String]) -> RestoreReport {
        let mut report = RestoreReport::default();
        for id in ids {
            match self.restore_one(id) {
                Ok(item) => report.restored.push(item),
                Err(e) => {
                    warn!(id = %id, error = %e, "restore failed");
                    report.failed.push(ItemFailure {
                        quarantine_id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Copy back, move the quarantined copy aside, drop the entry, then
    /// delete the moved-aside copy.
    ///
    /// Until the entry is dropped a failure leaves the quarantined copy
    /// intact. After that the restored copy is complete, and a delete
    /// that stops partway only leaves a `.restoring` object behind.
    pub fn restore_one(&self, id: &str) -> Result<RestoredItem, QuarantineError> {
        let _guard = self.lock()?;
        let mut index = index::load(&self.index_path);

        let entry = index
            .get(id)
            .cloned()
            .ok_or_else(|| QuarantineError::UnknownId { id: id.to_string() })?;

        let location = self.root.join(id);
        let metadata = fs::symlink_metadata(&location)
            .map_err(|_| QuarantineError::ObjectMissing { id: id.to_string() })?;

        let destination = restore_destination(&entry.original_path);
        let restore_failed = |source: io::Error| QuarantineError::RestoreFailed {
            id: id.to_string(),
            destination: destination.clone(),
            source,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(restore_failed)?;
        }

        if let Err(e) = copy_any(&location, &destination, metadata.is_dir()) {
            let _ = remove_any(&destination);
            return Err(restore_failed(e));
        }

        // One rename takes the quarantined copy out of the area, so a delete
        // that fails halfway never touches the only complete copy
        let staging = self.root.join(format!("{id}{STAGING_SUFFIX}"));
        if let Err(e) = fs::rename(&location, &staging) {
            let _ = remove_any(&destination);
            return Err(restore_failed(e));
        }

        index.remove(id);
        if let Err(e) = self.save_index(&index) {
            if fs::rename(&staging, &location).is_ok() {
                let _ = remove_any(&destination);
            }
            return Err(QuarantineError::MetadataWrite {
                id: id.to_string(),
                path: destination.clone(),
                reason: e.to_string(),
            });
        }

        if let Err(e) = remove_any(&staging) {
            warn!(
                id = %id,
                leftover = %staging.display(),
                error = %e,
                "restored, but the old quarantined copy was only partly deleted"
            );
        }

        info!(id = %id, destination = %destination.display(), "restored");
        record_or_warn(
            self.audit.as_ref(),
            DeletionRecord::new(DeletionEventType::Restore, &entry.original_path)
                .with_size(entry.size_bytes)
                .with_destination(&destination),
        );

        Ok(RestoredItem {
            quarantine_id: id.to_string(),
            restored_path: destination,
            category: entry.category,
            attributes: entry.attributes,
        })
    }

    /// Permanently delete quarantined objects and their entries.
    ///
    /// Also accepts ids of unindexed objects found by [`reconcile`](Self::reconcile).
    pub fn purge_permanently(&self, ids: &[String]) -> PurgeReport {
        let mut report = PurgeReport::default();
        let guard = match self.lock() {
            Ok(guard) => guard,
            Err(e) => {
                report.failed = ids
                    .iter()
                    .map(|id| ItemFailure {
                        quarantine_id: id.clone(),
                        reason: e.to_string(),
                    })
                    .collect();
                return report;
            }
        };

        let mut index = index::load(&self.index_path);
        for id in ids {
            match self.purge_one(&mut index, id) {
                Ok(()) => report.purged_count += 1,
                Err(e) => {
                    warn!(id = %id, error = %e, "purge failed");
                    report.failed.push(ItemFailure {
                        quarantine_id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        drop(guard);
        report
    }

    fn purge_one(&self, index: &mut Index, id: &str) -> Result<(), QuarantineError> {
        if !is_valid_id(id) {
            return Err(QuarantineError::UnknownId { id: id.to_string() });
        }

        let location = self.root.join(id);
        let present = fs::symlink_metadata(&location).is_ok();
        if !present && !index.contains_key(id) {
            return Err(QuarantineError::UnknownId { id: id.to_string() });
        }

        if present {
            remove_any(&location).map_err(|source| QuarantineError::PurgeFailed {
                id: id.to_string(),
                source,
            })?;
        }

        let original = match index.remove(id) {
            Some(entry) => {
                self.save_index(index)
                    .map_err(|e| QuarantineError::MetadataWrite {
                        id: id.to_string(),
                        path: entry.original_path.clone(),
                        reason: e.to_string(),
                    })?;
                entry.original_path
            }
            None => location.clone(),
        };

        info!(id = %id, "purged permanently");
        record_or_warn(
            self.audit.as_ref(),
            DeletionRecord::new(DeletionEventType::DeletePermanent, original),
        );
        Ok(())
    }

    /// Every indexed entry and every unindexed object, newest first
    pub fn list(&self) -> Result<Vec<ListedItem>, QuarantineError> {
        let _guard = self.lock()?;
        let index = index::load(&self.index_path);
        let objects = self.objects()?;

        let mut items: Vec<ListedItem> = index
            .iter()
            .map(|(id, entry)| ListedItem {
                id: id.clone(),
                location: self.root.join(id),
                timestamp: Some(entry.quarantined_at),
                object_present: objects.contains(id),
                entry: Some(entry.clone()),
            })
            .collect();

        items.extend(
            objects
                .iter()
                .filter(|id| !index.contains_key(*id))
                .map(|id| {
                    let location = self.root.join(id);
                    let timestamp = fs::symlink_metadata(&location)
                        .and_then(|m| m.modified())
                        .ok()
                        .map(DateTime::<Utc>::from);
                    ListedItem {
                        id: id.clone(),
                        location,
                        entry: None,
                        timestamp,
                        object_present: true,
                    }
                }),
        );

        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Report objects without entries and entries without objects.
    ///
    /// Read-only: resolving either kind is left to restore or purge.
    pub fn reconcile(&self) -> Result<ReconcileReport, QuarantineError> {
        let _guard = self.lock()?;
        let index = index::load(&self.index_path);
        let objects = self.objects()?;

        let report = ReconcileReport {
            unknown_objects: objects
                .iter()
                .filter(|id| !index.contains_key(*id))
                .map(|id| self.root.join(id))
                .collect(),
            orphaned_entries: index
                .iter()
                .filter(|(id, _)| !objects.contains(*id))
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect(),
        };

        if !report.is_consistent() {
            warn!(
                unknown = report.unknown_objects.len(),
                orphaned = report.orphaned_entries.len(),
                "quarantine area and index disagree"
            );
        }
        Ok(report)
    }

    /// Names of physical objects in the area
    fn objects(&self) -> Result<BTreeSet<String>, QuarantineError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => {
                return Err(QuarantineError::AreaUnavailable {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        Ok(entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !index::is_internal_name(name))
            .collect())
    }
}

/// Appended to an id while its object is being deleted after a restore.
/// Leftovers show up as unknown objects and can be purged.
const STAGING_SUFFIX: &str = ".restoring";

/// `<uuid>_<file name>`
fn generate_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "item".to_string());
    format!("{}_{}", Uuid::new_v4().simple(), name)
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !index::is_internal_name(id)
}

/// The original path, or a `_restored_<secs>` sibling if it is taken
fn restore_destination(original: &Path) -> PathBuf {
    if fs::symlink_metadata(original).is_err() {
        return original.to_path_buf();
    }

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let parent = original.parent().unwrap_or_else(|| Path::new(""));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = parent.join(format!("{stem}_restored_{secs}{extension}"));
    let mut n = 1;
    while fs::symlink_metadata(&candidate).is_ok() {
        candidate = parent.join(format!("{stem}_restored_{secs}_{n}{extension}"));
        n += 1;
    }
    candidate
}
