//! # Config Module
//!
//! Where things live on disk, and the user's exclusion list.
//!
//! ## Layout
//! | Path | Contents |
//! |------|----------|
//! | `<data-local>/space-reclaim/quarantine/` | quarantine area |
//! | `<data-local>/space-reclaim/history.db` | deletion history |
//! | `<config>/space-reclaim/exclusions.json` | JSON array of directory prefixes |

use crate::core::paths::{comparison_key, normalize};
use crate::core::scanner::ExclusionSet;
use crate::error::ConfigError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const APP_DIR_NAME: &str = "space-reclaim";

/// Resolved application directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl AppPaths {
    /// Platform defaults from `dirs`
    pub fn from_environment() -> Result<Self, ConfigError> {
        let data_dir = dirs::data_local_dir()
            .ok_or(ConfigError::NoDataDir)?
            .join(APP_DIR_NAME);
        let config_dir = dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| data_dir.clone());
        Ok(Self {
            data_dir,
            config_dir,
        })
    }

    /// Keep everything, configuration included, under one directory
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config_dir: dir.clone(),
            data_dir: dir,
        }
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.data_dir.join("quarantine")
    }

    pub fn history_db(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }

    pub fn exclusions_file(&self) -> PathBuf {
        self.config_dir.join("exclusions.json")
    }
}

/// The persisted exclusion list.
///
/// Load it fresh for each scan and turn it into an [`ExclusionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionList {
    path: PathBuf,
    entries: Vec<String>,
}

impl ExclusionList {
    /// A missing file is an empty list; an unreadable or malformed one is an error
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no exclusion list yet");
                return Ok(Self {
                    path: path.to_path_buf(),
                    entries: Vec::new(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let entries: Vec<String> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: entries
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a directory; returns false if it was already listed
    pub fn add(&mut self, dir: &Path) -> bool {
        let normalized = normalize(dir);
        let key = comparison_key(&normalized);
        if self
            .entries
            .iter()
            .any(|e| comparison_key(Path::new(e)) == key)
        {
            return false;
        }
        self.entries.push(normalized.to_string_lossy().into_owned());
        true
    }

    /// Remove a directory; returns false if it was not listed
    pub fn remove(&mut self, dir: &Path) -> bool {
        let key = comparison_key(&normalize(dir));
        let before = self.entries.len();
        self.entries.retain(|e| comparison_key(Path::new(e)) != key);
        self.entries.len() != before
    }

    /// Rewrite the file in full
    pub fn save(&self) -> Result<(), ConfigError> {
        let write_failed = |source: io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(write_failed)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".exclusions-")
            .tempfile_in(dir)
            .map_err(write_failed)?;
        serde_json::to_writer_pretty(&mut temp, &self.entries)
            .map_err(|e| write_failed(io::Error::from(e)))?;
        temp.flush().map_err(write_failed)?;
        temp.persist(&self.path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    /// Snapshot for one scan
    pub fn to_set(&self) -> ExclusionSet {
        ExclusionSet::from_paths(self.entries.iter().map(|e| normalize(Path::new(e))))
    }
}
