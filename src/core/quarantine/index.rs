//! The JSON index that maps quarantine ids to their entries.
//!
//! Loading is tolerant: an absent, empty or unparseable file is an empty
//! index. Saving always rewrites the whole file through a temp file in the
//! same directory followed by an atomic rename.

use super::types::QuarantinedEntry;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

pub const INDEX_FILE_NAME: &str = "quarantine_metadata.json";

const TEMP_PREFIX: &str = ".index-";

pub type Index = BTreeMap<String, QuarantinedEntry>;

/// True for names the store owns itself, never quarantined objects
pub fn is_internal_name(name: &str) -> bool {
    name == INDEX_FILE_NAME || name.starts_with(TEMP_PREFIX)
}

pub fn load(path: &Path) -> Index {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Index::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read quarantine index, treating as empty");
            return Index::new();
        }
    };

    if content.trim().is_empty() {
        return Index::new();
    }

    match serde_json::from_str(&content) {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt quarantine index, treating as empty");
            Index::new()
        }
    }
}

pub fn save(path: &Path, index: &Index) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "index has no parent"))?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, index).map_err(io::Error::from)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
