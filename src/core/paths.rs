//! Path normalization shared by the categorizer, scanners and exclusions.
//!
//! Paths keep their original spelling for display. Every comparison goes
//! through a *comparison key*: absolute, lexically cleaned, `/`-separated
//! and lowercased.

use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and drop `.`/`..` components without touching
/// the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Case-folded, separator-consistent key for prefix comparisons.
pub fn comparison_key(path: &Path) -> String {
    let normalized = normalize(path);
    let mut key = normalized.to_string_lossy().to_lowercase();
    if cfg!(windows) {
        key = key.replace('\\', "/");
    }
    while key.len() > 1 && key.ends_with('/') {
        key.pop();
    }
    key
}

/// True if `key` is `prefix` itself or lies beneath it.
///
/// Matching is per component: `/data/cache2` is not under `/data/cache`.
pub fn key_is_under(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if prefix.ends_with('/') {
        return key.starts_with(prefix);
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Lowercased file name, or an empty string for roots
pub fn lowercase_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_removes_dot_components() {
        let path = normalize(Path::new("/data/./projects/../downloads/file.zip"));
        assert_eq!(path, PathBuf::from("/data/downloads/file.zip"));
    }

    #[test]
    fn normalize_makes_relative_paths_absolute() {
        assert!(normalize(Path::new("some/relative")).is_absolute());
    }

    #[test]
    fn comparison_key_is_case_folded_without_trailing_separator() {
        assert_eq!(comparison_key(Path::new("/Data/Downloads/")), "/data/downloads");
        assert_eq!(comparison_key(Path::new("/")), "/");
    }

    #[test]
    fn prefix_matching_respects_component_boundaries() {
        assert!(key_is_under("/data/cache", "/data/cache"));
        assert!(key_is_under("/data/cache/x.bin", "/data/cache"));
        assert!(!key_is_under("/data/cache2/x.bin", "/data/cache"));
        assert!(key_is_under("/anything", "/"));
        assert!(!key_is_under("/anything", ""));
    }
}
