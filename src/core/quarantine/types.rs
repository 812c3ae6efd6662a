//! Quarantine records and operation reports.

use crate::core::category::Category;
use crate::core::scanner::EntryKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Attributes carried over from a suggestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreservedAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PreservedAttributes {
    pub fn is_empty(&self) -> bool {
        self.suggestion_confidence.is_none() && self.confidence.is_none() && self.reason.is_none()
    }
}

/// Index entry for one quarantined object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedEntry {
    pub original_path: PathBuf,
    pub quarantined_at: DateTime<Utc>,
    #[serde(default = "unknown_category")]
    pub category: Category,
    #[serde(default = "file_kind")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(flatten)]
    pub attributes: PreservedAttributes,
}

fn unknown_category() -> Category {
    Category::Unknown
}

fn file_kind() -> EntryKind {
    EntryKind::File
}

/// Receipt for a successful quarantine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedItem {
    pub id: String,
    /// Where the object now lives inside the quarantine area
    pub location: PathBuf,
    pub entry: QuarantinedEntry,
}

/// One row of a quarantine listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedItem {
    pub id: String,
    pub location: PathBuf,
    /// `None` for an object that has no index entry
    pub entry: Option<QuarantinedEntry>,
    /// Index timestamp, or the object's modification time if unindexed
    pub timestamp: Option<DateTime<Utc>>,
    pub object_present: bool,
}

impl ListedItem {
    pub fn is_unknown(&self) -> bool {
        self.entry.is_none()
    }

    /// Short status label for display
    pub fn status(&self) -> &'static str {
        match (&self.entry, self.object_present) {
            (None, _) => "unknown quarantined item",
            (Some(_), false) => "orphaned metadata",
            (Some(_), true) => "quarantined",
        }
    }
}

/// An item put back in the live filesystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoredItem {
    pub quarantine_id: String,
    pub restored_path: PathBuf,
    pub category: Category,
    pub attributes: PreservedAttributes,
}

/// A per-id failure with a readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub quarantine_id: String,
    pub reason: String,
}

/// Outcome of a restore request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: Vec<RestoredItem>,
    pub failed: Vec<ItemFailure>,
}

impl RestoreReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Outcome of a permanent purge request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub purged_count: usize,
    pub failed: Vec<ItemFailure>,
}

/// Inconsistencies between the quarantine area and its index.
///
/// Nothing listed here is ever deleted automatically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Objects in the area with no index entry
    pub unknown_objects: Vec<PathBuf>,
    /// Index entries whose object is gone
    pub orphaned_entries: Vec<(String, QuarantinedEntry)>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.unknown_objects.is_empty() && self.orphaned_entries.is_empty()
    }
}
