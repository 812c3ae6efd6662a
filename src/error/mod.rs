//! # Error Module
//!
//! User-facing error types for the space reclaimer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, quarantine ids, what went wrong
//! - **Per-item errors are data** - they end up in reports, not in `Err`
//! - **Structural errors surface** - a broken quarantine area is never hidden

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ReclaimError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Quarantine error: {0}")]
    Quarantine(#[from] QuarantineError),

    #[error("Disposal error: {0}")]
    Dispose(#[from] DisposeError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that abort a scan before it produces anything
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors raised by the quarantine store
#[derive(Error, Debug)]
pub enum QuarantineError {
    #[error("Cannot create quarantine area at {path}: {source}")]
    AreaUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing to quarantine at {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to move {path} into quarantine: {source}")]
    MoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{path} was copied into quarantine as {id} but could not be fully removed: {source}. \
         Restore {id} or delete what is left at the original location."
    )]
    SourceNotFullyRemoved {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{path} was moved into quarantine as {id} but the index could not be written: {reason}. \
         Run a reconcile to find it again."
    )]
    MetadataWrite {
        id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("No quarantine record for {id}")]
    UnknownId { id: String },

    #[error("Quarantined object for {id} is missing from the quarantine area")]
    ObjectMissing { id: String },

    #[error("Failed to restore {id} to {destination}: {source}")]
    RestoreFailed {
        id: String,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {id} permanently: {source}")]
    PurgeFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Quarantine index lock was poisoned")]
    LockPoisoned,
}

/// Errors that abort a whole disposal batch
#[derive(Error, Debug)]
pub enum DisposeError {
    #[error("Cannot prepare quarantine for this batch: {0}")]
    Setup(#[source] QuarantineError),
}

/// Errors from the deletion history database
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to open history database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("History query failed: {0}")]
    QueryFailed(String),
}

/// Errors reading or writing user configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No usable data directory on this platform; pass --data-dir")]
    NoDataDir,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid exclusion list: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

impl From<rusqlite::Error> for HistoryError {
    fn from(err: rusqlite::Error) -> Self {
        HistoryError::QueryFailed(err.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ReclaimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/data/projects"),
        };
        assert!(error.to_string().contains("/data/projects"));
    }

    #[test]
    fn metadata_write_error_points_at_reconcile() {
        let error = QuarantineError::MetadataWrite {
            id: "abc_report.log".to_string(),
            path: PathBuf::from("/home/user/report.log"),
            reason: "disk full".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("abc_report.log"));
        assert!(message.contains("reconcile"));
    }

    #[test]
    fn partly_removed_source_names_the_restorable_id() {
        let error = QuarantineError::SourceNotFullyRemoved {
            id: "f00d_build".to_string(),
            path: PathBuf::from("/home/user/build"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let message = error.to_string();
        assert!(message.contains("/home/user/build"));
        assert!(message.contains("Restore f00d_build"));
    }

    #[test]
    fn dispose_setup_error_wraps_quarantine_error() {
        let error: ReclaimError = DisposeError::Setup(QuarantineError::AreaUnavailable {
            path: PathBuf::from("/readonly/quarantine"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })
        .into();
        assert!(error.to_string().contains("/readonly/quarantine"));
    }
}
