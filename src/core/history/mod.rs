//! # Deletion History Module
//!
//! An audit trail of every recycle, quarantine, restore and permanent
//! delete. Constructed explicitly and handed to the components that need
//! it; there is no global logger.
//!
//! ## Features
//! - Persistent storage using SQLite (`deletion_history` table)
//! - A no-op sink for callers that do not keep history
//! - Audit failures are logged and never fail a disposal

mod repository;
mod types;

pub use repository::HistoryRepository;
pub use types::{DeletionEventType, DeletionRecord};

use crate::error::HistoryError;
use tracing::warn;

/// Sink for disposal events
pub trait AuditLog: Send + Sync {
    fn record(&self, record: &DeletionRecord) -> Result<(), HistoryError>;
}

/// Audit log that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLog;

impl AuditLog for NullAuditLog {
    fn record(&self, _record: &DeletionRecord) -> Result<(), HistoryError> {
        Ok(())
    }
}

/// Record an event, logging instead of failing
pub(crate) fn record_or_warn(log: &dyn AuditLog, record: DeletionRecord) {
    if let Err(e) = log.record(&record) {
        warn!(
            path = %record.path.display(),
            event = record.event_type.as_str(),
            error = %e,
            "failed to write deletion history"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLog;

    impl AuditLog for FailingLog {
        fn record(&self, _record: &DeletionRecord) -> Result<(), HistoryError> {
            Err(HistoryError::QueryFailed("disk I/O error".to_string()))
        }
    }

    #[test]
    fn failing_log_does_not_panic() {
        record_or_warn(
            &FailingLog,
            DeletionRecord::new(DeletionEventType::Recycle, "/a"),
        );
    }

    #[test]
    fn null_log_accepts_everything() {
        assert!(NullAuditLog
            .record(&DeletionRecord::new(DeletionEventType::Restore, "/a"))
            .is_ok());
    }
}
