//! Batch disposal: every request in a batch goes to the recycle bin or
//! every request goes to quarantine.

use super::recycle::RecycleBin;
use crate::core::cancel::CancellationToken;
use crate::core::category::Category;
use crate::core::history::{record_or_warn, AuditLog, DeletionEventType, DeletionRecord};
use crate::core::quarantine::{PreservedAttributes, QuarantineStore};
use crate::core::scanner::ScanItem;
use crate::error::{DisposeError, QuarantineError};
use crate::events::{null_sender, DisposeEvent, DisposeProgress, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Windows `ERROR_CLOUD_FILE_PROVIDER_NOT_RUNNING`: a placeholder whose
/// content has not been downloaded
#[cfg(windows)]
const CLOUD_PLACEHOLDER_OS_ERROR: i32 = 362;

#[cfg(windows)]
fn is_cloud_placeholder(error: &io::Error) -> bool {
    error.raw_os_error() == Some(CLOUD_PLACEHOLDER_OS_ERROR)
}

#[cfg(not(windows))]
fn is_cloud_placeholder(_error: &io::Error) -> bool {
    false
}

/// Where a batch sends its items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposeMode {
    Recycle,
    Quarantine,
}

impl DisposeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recycle => "recycle",
            Self::Quarantine => "quarantine",
        }
    }
}

/// One thing to dispose of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposeRequest {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub category: Option<Category>,
    #[serde(default)]
    pub attributes: PreservedAttributes,
}

impl DisposeRequest {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            category: None,
            attributes: PreservedAttributes::default(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_attributes(mut self, attributes: PreservedAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

impl From<&ScanItem> for DisposeRequest {
    fn from(item: &ScanItem) -> Self {
        DisposeRequest::new(item.path.clone(), item.size_bytes).with_category(item.category)
    }
}

/// Why one item could not be disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposeErrorKind {
    NotFound,
    PermissionDenied,
    CloudPlaceholder,
    InvalidPath,
    Recycle,
    Quarantine,
    /// Copied into quarantine, but part of the original is still in place
    PartiallyRemoved,
    Io,
}

impl DisposeErrorKind {
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "file not found",
            Self::PermissionDenied => "permission denied",
            Self::CloudPlaceholder => "cloud file is not available offline",
            Self::InvalidPath => "invalid path",
            Self::Recycle => "recycle bin refused the item",
            Self::Quarantine => "quarantine failed",
            Self::PartiallyRemoved => "quarantined, but the original was only partly removed",
            Self::Io => "I/O error",
        }
    }

    fn from_io(error: &io::Error) -> Option<Self> {
        if is_cloud_placeholder(error) {
            return Some(Self::CloudPlaceholder);
        }
        match error.kind() {
            io::ErrorKind::NotFound => Some(Self::NotFound),
            io::ErrorKind::PermissionDenied => Some(Self::PermissionDenied),
            io::ErrorKind::InvalidInput => Some(Self::InvalidPath),
            _ => None,
        }
    }
}

/// A request that failed, with a reason fit for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposeFailure {
    pub request: DisposeRequest,
    pub kind: DisposeErrorKind,
    pub reason: String,
    /// Set when a copy made it into quarantine and can be restored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine_id: Option<String>,
}

/// Failure of one item before it becomes a [`DisposeFailure`]
struct ItemError {
    kind: DisposeErrorKind,
    reason: String,
    quarantine_id: Option<String>,
}

impl ItemError {
    fn new(kind: DisposeErrorKind, reason: String) -> Self {
        Self {
            kind,
            reason,
            quarantine_id: None,
        }
    }
}

impl From<QuarantineError> for ItemError {
    fn from(error: QuarantineError) -> Self {
        let quarantine_id = match &error {
            QuarantineError::SourceNotFullyRemoved { id, .. }
            | QuarantineError::MetadataWrite { id, .. } => Some(id.clone()),
            _ => None,
        };
        Self {
            kind: quarantine_kind(&error),
            reason: error.to_string(),
            quarantine_id,
        }
    }
}

/// A request that succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposedItem {
    pub request: DisposeRequest,
    /// Set in quarantine mode
    pub quarantine_id: Option<String>,
}

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposeReport {
    pub mode: DisposeMode,
    pub succeeded: Vec<DisposedItem>,
    pub failed: Vec<DisposeFailure>,
    /// Requests skipped because the batch was cancelled
    pub not_attempted: Vec<DisposeRequest>,
}

impl DisposeReport {
    fn new(mode: DisposeMode) -> Self {
        Self {
            mode,
            succeeded: Vec::new(),
            failed: Vec::new(),
            not_attempted: Vec::new(),
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn was_cancelled(&self) -> bool {
        !self.not_attempted.is_empty()
    }

    /// Bytes that left the live filesystem
    pub fn freed_bytes(&self) -> u64 {
        self.succeeded.iter().map(|d| d.request.size_bytes).sum()
    }
}

/// Runs disposal batches against one quarantine store
pub struct DeletionEngine {
    quarantine: Arc<QuarantineStore>,
    recycle_bin: Arc<dyn RecycleBin>,
    audit: Arc<dyn AuditLog>,
}

impl DeletionEngine {
    pub fn new(
        quarantine: Arc<QuarantineStore>,
        recycle_bin: Arc<dyn RecycleBin>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            quarantine,
            recycle_bin,
            audit,
        }
    }

    pub fn quarantine_store(&self) -> &QuarantineStore {
        &self.quarantine
    }

    pub fn dispose(
        &self,
        requests: &[DisposeRequest],
        mode: DisposeMode,
        cancel: &CancellationToken,
    ) -> Result<DisposeReport, DisposeError> {
        self.dispose_with_events(requests, mode, &null_sender(), cancel)
    }

    /// Dispose of every request, never stopping on a single failure.
    ///
    /// Only a quarantine area that cannot be created fails the whole batch.
    pub fn dispose_with_events(
        &self,
        requests: &[DisposeRequest],
        mode: DisposeMode,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<DisposeReport, DisposeError> {
        if mode == DisposeMode::Quarantine {
            self.quarantine.ensure_area().map_err(DisposeError::Setup)?;
        }

        let total = requests.len();
        info!(items = total, mode = mode.as_str(), "dispose batch started");
        events.send(Event::Dispose(DisposeEvent::Started {
            total_items: total,
            quarantine: mode == DisposeMode::Quarantine,
        }));

        let mut report = DisposeReport::new(mode);

        for (i, request) in requests.iter().enumerate() {
            if cancel.is_cancelled() {
                report.not_attempted = requests[i..].to_vec();
                break;
            }

            match self.dispose_one(request, mode) {
                Ok(quarantine_id) => report.succeeded.push(DisposedItem {
                    request: request.clone(),
                    quarantine_id,
                }),
                Err(error) => {
                    warn!(path = %request.path.display(), reason = %error.reason, "dispose failed");
                    events.send(Event::Dispose(DisposeEvent::ItemFailed {
                        path: request.path.clone(),
                        reason: error.reason.clone(),
                    }));
                    report.failed.push(DisposeFailure {
                        request: request.clone(),
                        kind: error.kind,
                        reason: error.reason,
                        quarantine_id: error.quarantine_id,
                    });
                }
            }

            events.send(Event::Dispose(DisposeEvent::Progress(DisposeProgress {
                completed: i + 1,
                total,
                current_path: request.path.clone(),
            })));
        }

        if report.was_cancelled() {
            info!(
                succeeded = report.succeeded_count(),
                failed = report.failed_count(),
                not_attempted = report.not_attempted.len(),
                "dispose batch cancelled"
            );
            events.send(Event::Dispose(DisposeEvent::Cancelled {
                not_attempted: report.not_attempted.len(),
            }));
        } else {
            info!(
                succeeded = report.succeeded_count(),
                failed = report.failed_count(),
                "dispose batch completed"
            );
            events.send(Event::Dispose(DisposeEvent::Completed {
                succeeded: report.succeeded_count(),
                failed: report.failed_count(),
            }));
        }

        Ok(report)
    }

    fn dispose_one(
        &self,
        request: &DisposeRequest,
        mode: DisposeMode,
    ) -> Result<Option<String>, ItemError> {
        check_path(&request.path)?;

        match mode {
            DisposeMode::Recycle => {
                self.recycle_bin.recycle(&request.path).map_err(|e| {
                    let kind = DisposeErrorKind::from_io(&e).unwrap_or(DisposeErrorKind::Recycle);
                    ItemError::new(kind, format!("{}: {}", kind.description(), e))
                })?;
                record_or_warn(
                    self.audit.as_ref(),
                    DeletionRecord::new(DeletionEventType::Recycle, &request.path)
                        .with_size(Some(request.size_bytes)),
                );
                Ok(None)
            }
            DisposeMode::Quarantine => {
                let category = request.category.unwrap_or(Category::Unknown);
                let item = self
                    .quarantine
                    .quarantine(&request.path, category, request.attributes.clone())?;
                Ok(Some(item.id))
            }
        }
    }
}

/// Reject paths we should never hand to a move or the recycle bin
fn check_path(path: &Path) -> Result<(), ItemError> {
    if path.as_os_str().is_empty() || !path.is_absolute() || path.parent().is_none() {
        return Err(ItemError::new(
            DisposeErrorKind::InvalidPath,
            format!("{}: {}", DisposeErrorKind::InvalidPath.description(), path.display()),
        ));
    }

    fs::symlink_metadata(path).map(|_| ()).map_err(|e| {
        let kind = DisposeErrorKind::from_io(&e).unwrap_or(DisposeErrorKind::Io);
        ItemError::new(kind, format!("{}: {}", kind.description(), path.display()))
    })
}

fn quarantine_kind(error: &QuarantineError) -> DisposeErrorKind {
    match error {
        QuarantineError::SourceMissing { .. } => DisposeErrorKind::NotFound,
        QuarantineError::MoveFailed { source, .. } => {
            DisposeErrorKind::from_io(source).unwrap_or(DisposeErrorKind::Quarantine)
        }
        QuarantineError::SourceNotFullyRemoved { .. } => DisposeErrorKind::PartiallyRemoved,
        _ => DisposeErrorKind::Quarantine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{HistoryRepository, NullAuditLog};
    use crate::events::EventChannel;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Deletes files outright and refuses any path listed in `refuse`
    #[derive(Default)]
    struct FakeRecycleBin {
        refuse: Vec<PathBuf>,
        recycled: Mutex<Vec<PathBuf>>,
    }

    impl RecycleBin for FakeRecycleBin {
        fn recycle(&self, path: &Path) -> io::Result<()> {
            if self.refuse.iter().any(|p| p == path) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            fs::remove_file(path)?;
            self.recycled.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        store: Arc<QuarantineStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let store = Arc::new(QuarantineStore::new(temp.path().join("quarantine")));
            Self { temp, store }
        }

        fn file(&self, name: &str, content: &[u8]) -> DisposeRequest {
            let path = self.temp.path().join(name);
            fs::write(&path, content).unwrap();
            DisposeRequest::new(path, content.len() as u64)
        }

        fn engine(&self, bin: Arc<dyn RecycleBin>) -> DeletionEngine {
            DeletionEngine::new(self.store.clone(), bin, Arc::new(NullAuditLog))
        }
    }

    #[test]
    fn recycle_batch_continues_past_a_failure() {
        let f = Fixture::new();
        let requests = vec![
            f.file("one.log", b"1"),
            f.file("two.log", b"22"),
            f.file("three.log", b"333"),
        ];
        let bin = Arc::new(FakeRecycleBin {
            refuse: vec![requests[1].path.clone()],
            ..Default::default()
        });

        let report = f
            .engine(bin.clone())
            .dispose(&requests, DisposeMode::Recycle, &CancellationToken::new())
            .unwrap();

        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].kind, DisposeErrorKind::PermissionDenied);
        assert!(!report.failed[0].reason.is_empty());
        assert_eq!(fs::read(&requests[1].path).unwrap(), b"22");
        assert_eq!(report.freed_bytes(), 4);
        assert_eq!(bin.recycled.lock().unwrap().len(), 2);
    }

    #[test]
    fn quarantine_batch_reports_vanished_item() {
        let f = Fixture::new();
        let requests = vec![
            f.file("a.bin", b"a"),
            f.file("b.bin", b"b"),
            f.file("c.bin", b"c"),
        ];
        fs::remove_file(&requests[1].path).unwrap();

        let report = f
            .engine(Arc::new(FakeRecycleBin::default()))
            .dispose(&requests, DisposeMode::Quarantine, &CancellationToken::new())
            .unwrap();

        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.failed[0].kind, DisposeErrorKind::NotFound);
        assert!(report.succeeded.iter().all(|d| d.quarantine_id.is_some()));
        assert_eq!(f.store.list().unwrap().len(), 2);
    }

    #[test]
    fn relative_path_is_invalid() {
        let f = Fixture::new();
        let report = f
            .engine(Arc::new(FakeRecycleBin::default()))
            .dispose(
                &[DisposeRequest::new("relative/file.txt", 1)],
                DisposeMode::Recycle,
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(report.failed[0].kind, DisposeErrorKind::InvalidPath);
    }

    #[test]
    fn cancellation_leaves_rest_untouched() {
        let f = Fixture::new();
        let requests = vec![f.file("a.bin", b"a"), f.file("b.bin", b"b")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (sender, receiver) = EventChannel::new();
        let report = f
            .engine(Arc::new(FakeRecycleBin::default()))
            .dispose_with_events(&requests, DisposeMode::Recycle, &sender, &cancel)
            .unwrap();

        assert_eq!(report.not_attempted.len(), 2);
        assert!(requests.iter().all(|r| r.path.exists()));
        assert!(receiver
            .drain()
            .any(|e| matches!(e, Event::Dispose(DisposeEvent::Cancelled { not_attempted: 2 }))));
    }

    #[test]
    fn unusable_quarantine_area_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let store = Arc::new(QuarantineStore::new(blocker.join("q")));
        let engine = DeletionEngine::new(
            store,
            Arc::new(FakeRecycleBin::default()),
            Arc::new(NullAuditLog),
        );

        let file = temp.path().join("keep.txt");
        fs::write(&file, b"keep").unwrap();
        let result = engine.dispose(
            &[DisposeRequest::new(&file, 4)],
            DisposeMode::Quarantine,
            &CancellationToken::new(),
        );

        assert!(matches!(result, Err(DisposeError::Setup(_))));
        assert!(file.exists());
    }

    #[test]
    fn recycles_are_audited() {
        let f = Fixture::new();
        let history = Arc::new(HistoryRepository::in_memory().unwrap());
        let engine = DeletionEngine::new(
            f.store.clone(),
            Arc::new(FakeRecycleBin::default()),
            history.clone(),
        );

        engine
            .dispose(
                &[f.file("a.log", b"abc")],
                DisposeMode::Recycle,
                &CancellationToken::new(),
            )
            .unwrap();

        let records = history.list_recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_type, DeletionEventType::Recycle);
        assert_eq!(records[0].size_bytes, Some(3));
    }

    #[cfg(windows)]
    #[test]
    fn cloud_placeholder_error_is_recognised() {
        let error = io::Error::from_raw_os_error(CLOUD_PLACEHOLDER_OS_ERROR);
        assert_eq!(
            DisposeErrorKind::from_io(&error),
            Some(DisposeErrorKind::CloudPlaceholder)
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn windows_error_code_means_nothing_elsewhere() {
        let error = io::Error::from_raw_os_error(362);
        assert_ne!(
            DisposeErrorKind::from_io(&error),
            Some(DisposeErrorKind::CloudPlaceholder)
        );
    }

    #[test]
    fn partial_source_removal_keeps_the_quarantine_id() {
        let error: ItemError = QuarantineError::SourceNotFullyRemoved {
            id: "abc_project".to_string(),
            path: PathBuf::from("/home/alex/project"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
        .into();

        assert_eq!(error.kind, DisposeErrorKind::PartiallyRemoved);
        assert_eq!(error.quarantine_id.as_deref(), Some("abc_project"));
        assert!(error.reason.contains("abc_project"));
    }
}
