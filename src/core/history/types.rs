//! Types for the deletion audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionEventType {
    Recycle,
    Quarantine,
    Restore,
    DeletePermanent,
}

impl DeletionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recycle => "recycle",
            Self::Quarantine => "quarantine",
            Self::Restore => "restore",
            Self::DeletePermanent => "delete_permanent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recycle" => Some(Self::Recycle),
            "quarantine" => Some(Self::Quarantine),
            "restore" => Some(Self::Restore),
            "delete_permanent" => Some(Self::DeletePermanent),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Recycle => "Sent to recycle bin",
            Self::Quarantine => "Quarantined",
            Self::Restore => "Restored",
            Self::DeletePermanent => "Permanently deleted",
        }
    }
}

/// One audited disposal event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Row id; 0 until stored
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: DeletionEventType,
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
    /// Where the object went: quarantine location or restored path
    pub destination: Option<PathBuf>,
}

impl DeletionRecord {
    pub fn new(event_type: DeletionEventType, path: impl Into<PathBuf>) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            event_type,
            path: path.into(),
            size_bytes: None,
            destination: None,
        }
    }

    pub fn with_size(mut self, size_bytes: Option<u64>) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_roundtrip() {
        for event in [
            DeletionEventType::Recycle,
            DeletionEventType::Quarantine,
            DeletionEventType::Restore,
            DeletionEventType::DeletePermanent,
        ] {
            assert_eq!(DeletionEventType::from_str(event.as_str()), Some(event));
        }
        assert_eq!(DeletionEventType::from_str("shred"), None);
    }

    #[test]
    fn builder_sets_optional_fields() {
        let record = DeletionRecord::new(DeletionEventType::Quarantine, "/data/a.log")
            .with_size(Some(42))
            .with_destination("/q/abc_a.log");
        assert_eq!(record.size_bytes, Some(42));
        assert_eq!(record.destination, Some(PathBuf::from("/q/abc_a.log")));
    }
}
