//! Rule-based path categorizer.

use super::Category;
use crate::core::paths::{comparison_key, key_is_under, lowercase_name, normalize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Fixed inputs to categorization.
///
/// `Default` carries only the built-in marker lists. Use
/// [`CategorizerConfig::from_environment`] to also fill in the platform and
/// user locations.
#[derive(Debug, Clone)]
pub struct CategorizerConfig {
    /// Operating system roots
    pub system_roots: Vec<PathBuf>,
    /// Program installation roots
    pub program_roots: Vec<PathBuf>,
    /// The user's Downloads directory
    pub downloads: Option<PathBuf>,
    /// The user's Documents directory
    pub documents: Option<PathBuf>,
    /// Pictures, videos, music, desktop
    pub user_libraries: Vec<PathBuf>,
    /// File name suffixes (without the dot) that are always disposable
    pub disposable_extensions: Vec<String>,
    /// Folder names that make everything beneath them disposable
    pub disposable_folders: Vec<String>,
    /// Entry names that mark a project root
    pub project_markers: Vec<String>,
    /// Extensions that mark a project root (e.g. a solution file)
    pub project_marker_extensions: Vec<String>,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            system_roots: Vec::new(),
            program_roots: Vec::new(),
            downloads: None,
            documents: None,
            user_libraries: Vec::new(),
            disposable_extensions: owned(&["log", "tmp", "temp", "bak", "dmp", "thumbcache"]),
            disposable_folders: owned(&["temp", "tmp", "cache", "prefetch", "__pycache__"]),
            project_markers: owned(&[
                ".git",
                ".hg",
                ".svn",
                "node_modules",
                "package.json",
                "package-lock.json",
                "yarn.lock",
                "cargo.lock",
                "requirements.txt",
                "pipfile.lock",
                "poetry.lock",
                ".idea",
                ".vscode",
                "venv",
                ".venv",
            ]),
            project_marker_extensions: owned(&["sln"]),
        }
    }
}

impl CategorizerConfig {
    /// Built-in rules plus the locations of this machine and user
    pub fn from_environment() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));

        let user_libraries = [
            dirs::picture_dir().unwrap_or_else(|| home.join("Pictures")),
            dirs::video_dir().unwrap_or_else(|| home.join("Videos")),
            dirs::audio_dir().unwrap_or_else(|| home.join("Music")),
            dirs::desktop_dir().unwrap_or_else(|| home.join("Desktop")),
        ]
        .to_vec();

        Self {
            system_roots: platform_system_roots(),
            program_roots: platform_program_roots(),
            downloads: Some(dirs::download_dir().unwrap_or_else(|| home.join("Downloads"))),
            documents: Some(dirs::document_dir().unwrap_or_else(|| home.join("Documents"))),
            user_libraries,
            ..Self::default()
        }
    }
}

#[cfg(windows)]
fn platform_system_roots() -> Vec<PathBuf> {
    vec![std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))]
}

#[cfg(not(windows))]
fn platform_system_roots() -> Vec<PathBuf> {
    ["/usr", "/bin", "/sbin", "/lib", "/lib64", "/etc", "/boot", "/System"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

#[cfg(windows)]
fn platform_program_roots() -> Vec<PathBuf> {
    let mut roots = vec![std::env::var_os("ProgramFiles")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"))];
    roots.push(
        std::env::var_os("ProgramFiles(x86)")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files (x86)")),
    );
    roots
}

#[cfg(not(windows))]
fn platform_program_roots() -> Vec<PathBuf> {
    ["/opt", "/Applications", "/snap"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Classifies paths into [`Category`] tiers.
///
/// Project detection lists the containing directory once; the answer is
/// cached for the lifetime of the categorizer, so create one per scan.
pub struct Categorizer {
    system_keys: Vec<String>,
    program_keys: Vec<String>,
    downloads_key: Option<String>,
    documents_key: Option<String>,
    library_keys: Vec<String>,
    disposable_suffixes: Vec<String>,
    disposable_folders: Vec<String>,
    project_markers: Vec<String>,
    project_suffixes: Vec<String>,
    project_cache: RwLock<HashMap<PathBuf, bool>>,
}

impl Categorizer {
    pub fn new(config: CategorizerConfig) -> Self {
        let keys = |paths: &[PathBuf]| -> Vec<String> {
            paths.iter().map(|p| comparison_key(p)).collect()
        };
        let lower = |items: &[String]| -> Vec<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        };
        let suffixes = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
                .collect()
        };

        Self {
            system_keys: keys(&config.system_roots),
            program_keys: keys(&config.program_roots),
            downloads_key: config.downloads.as_deref().map(comparison_key),
            documents_key: config.documents.as_deref().map(comparison_key),
            library_keys: keys(&config.user_libraries),
            disposable_suffixes: suffixes(&config.disposable_extensions),
            disposable_folders: lower(&config.disposable_folders),
            project_markers: lower(&config.project_markers),
            project_suffixes: suffixes(&config.project_marker_extensions),
            project_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Categorizer for the current machine and user
    pub fn from_environment() -> Self {
        Self::new(CategorizerConfig::from_environment())
    }

    /// Assign exactly one category to `path`.
    pub fn classify(&self, path: &Path) -> Category {
        let normalized = normalize(path);
        let key = comparison_key(&normalized);

        if self.is_disposable(&key) {
            return Category::SafeToDelete;
        }
        if self.system_keys.iter().any(|root| key_is_under(&key, root)) {
            return Category::System;
        }
        if self.program_keys.iter().any(|root| key_is_under(&key, root)) {
            return Category::Application;
        }
        if let Some(parent) = normalized.parent() {
            if self.looks_like_project(parent) {
                return Category::DevelopmentProject;
            }
        }
        if under(&key, &self.downloads_key) {
            return Category::UserDownloads;
        }
        if under(&key, &self.documents_key) {
            return Category::UserDocuments;
        }
        if self.library_keys.iter().any(|root| key_is_under(&key, root)) {
            return Category::OtherUser;
        }
        Category::Unknown
    }

    /// Forget cached project listings so the next scan sees fresh state
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.project_cache.write() {
            cache.clear();
        }
    }

    fn is_disposable(&self, key: &str) -> bool {
        let in_disposable_folder = key
            .split('/')
            .any(|component| self.disposable_folders.iter().any(|f| f == component));
        if in_disposable_folder {
            return true;
        }

        let name = key.rsplit('/').next().unwrap_or(key);
        self.disposable_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }

    fn is_marker(&self, lowercase_name: &str) -> bool {
        self.project_markers.iter().any(|m| m == lowercase_name)
            || self
                .project_suffixes
                .iter()
                .any(|suffix| lowercase_name.ends_with(suffix.as_str()))
    }

    fn looks_like_project(&self, dir: &Path) -> bool {
        let in_marker_component = dir
            .components()
            .any(|c| self.is_marker(&c.as_os_str().to_string_lossy().to_lowercase()));
        if in_marker_component {
            return true;
        }

        if let Ok(cache) = self.project_cache.read() {
            if let Some(&cached) = cache.get(dir) {
                return cached;
            }
        }

        let answer = self.has_marker_child(dir);
        if let Ok(mut cache) = self.project_cache.write() {
            cache.insert(dir.to_path_buf(), answer);
        }
        answer
    }

    fn has_marker_child(&self, dir: &Path) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "project check could not list directory");
                return false;
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .any(|entry| self.is_marker(&lowercase_name(&entry.path())))
    }
}

fn under(key: &str, root: &Option<String>) -> bool {
    root.as_deref().is_some_and(|root| key_is_under(key, root))
}
