//! SQLite-backed deletion history.

use super::types::{DeletionEventType, DeletionRecord};
use super::AuditLog;
use crate::error::HistoryError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Repository for the `deletion_history` table
pub struct HistoryRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl HistoryRepository {
    /// Open or create the history database
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let open_failed = |reason: String| HistoryError::OpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| open_failed(e.to_string()))?;
        Self::initialize(conn, path.to_path_buf())
    }

    /// History that lives only as long as the value
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, PathBuf::from(":memory:"))
    }

    fn initialize(conn: Connection, db_path: PathBuf) -> Result<Self, HistoryError> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS deletion_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                path TEXT NOT NULL,
                size_bytes INTEGER,
                destination TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_deletion_history_time ON deletion_history(timestamp DESC)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, HistoryError> {
        self.conn
            .lock()
            .map_err(|e| HistoryError::QueryFailed(e.to_string()))
    }

    /// Insert a record and return its row id
    pub fn insert(&self, record: &DeletionRecord) -> Result<i64, HistoryError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO deletion_history (timestamp, event_type, path, size_bytes, destination)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                record.event_type.as_str(),
                record.path.to_string_lossy(),
                record.size_bytes.map(|v| v as i64),
                record.destination.as_ref().map(|d| d.to_string_lossy().into_owned()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent records first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<DeletionRecord>, HistoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_type, path, size_bytes, destination
             FROM deletion_history
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                let id: i64 = row.get(0)?;
                let timestamp: String = row.get(1)?;
                let event_type: String = row.get(2)?;
                let path: String = row.get(3)?;
                let size_bytes: Option<i64> = row.get(4)?;
                let destination: Option<String> = row.get(5)?;
                Ok((id, timestamp, event_type, path, size_bytes, destination))
            })?
            .filter_map(|row| row.ok())
            .filter_map(|(id, timestamp, event_type, path, size_bytes, destination)| {
                Some(DeletionRecord {
                    id,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .ok()?
                        .with_timezone(&Utc),
                    event_type: DeletionEventType::from_str(&event_type)?,
                    path: PathBuf::from(path),
                    size_bytes: size_bytes.map(|v| v as u64),
                    destination: destination.map(PathBuf::from),
                })
            })
            .collect();

        Ok(records)
    }

    pub fn count(&self) -> Result<usize, HistoryError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM deletion_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Clear all history, returning how many records were removed
    pub fn clear(&self) -> Result<usize, HistoryError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM deletion_history", [])?;
        Ok(removed)
    }
}

impl AuditLog for HistoryRepository {
    fn record(&self, record: &DeletionRecord) -> Result<(), HistoryError> {
        self.insert(record).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn records_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = HistoryRepository::open(&temp_dir.path().join("history.db")).unwrap();

        let record = DeletionRecord::new(DeletionEventType::Quarantine, "/data/big.iso")
            .with_size(Some(4096))
            .with_destination("/q/abc_big.iso");
        let id = repo.insert(&record).unwrap();

        let listed = repo.list_recent(10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].event_type, DeletionEventType::Quarantine);
        assert_eq!(listed[0].path, PathBuf::from("/data/big.iso"));
        assert_eq!(listed[0].size_bytes, Some(4096));
        assert_eq!(listed[0].destination, Some(PathBuf::from("/q/abc_big.iso")));
    }

    #[test]
    fn list_recent_is_newest_first_and_limited() {
        let repo = HistoryRepository::in_memory().unwrap();
        let base = Utc::now();
        for i in 0..5 {
            let mut record = DeletionRecord::new(DeletionEventType::Recycle, format!("/f{i}"));
            record.timestamp = base + Duration::seconds(i);
            repo.insert(&record).unwrap();
        }

        let listed = repo.list_recent(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].path, PathBuf::from("/f4"));
        assert_eq!(listed[1].path, PathBuf::from("/f3"));
    }

    #[test]
    fn clear_removes_everything() {
        let repo = HistoryRepository::in_memory().unwrap();
        for _ in 0..3 {
            repo.record(&DeletionRecord::new(DeletionEventType::Restore, "/x"))
                .unwrap();
        }

        assert_eq!(repo.clear().unwrap(), 3);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn reopening_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/history.db");

        {
            let repo = HistoryRepository::open(&db_path).unwrap();
            repo.record(&DeletionRecord::new(DeletionEventType::DeletePermanent, "/gone"))
                .unwrap();
        }

        let repo = HistoryRepository::open(&db_path).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }
}
