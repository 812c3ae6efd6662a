//! Moving and copying objects in and out of the quarantine area.
//!
//! Source and quarantine area may sit on different volumes, so every
//! operation here has to work without a plain rename.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Move a file, falling back to copy + verify + delete when rename fails
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    copy_file_verified(source, destination)?;
    if let Err(e) = fs::remove_file(source) {
        // Leave the original in place rather than end up with two copies
        let _ = fs::remove_file(destination);
        return Err(e);
    }
    Ok(())
}

/// Why a move did not finish
#[derive(Debug)]
pub enum MoveError {
    /// Nothing was moved; the source is untouched
    NotMoved(io::Error),
    /// The destination holds a complete copy but part of the source is
    /// still in place
    SourceLeftBehind(io::Error),
}

/// Copy a directory tree, then delete the original tree.
///
/// A failed copy is rolled back. A failed delete is not: the copy is
/// complete, and the source may already be partly gone.
pub fn move_dir(source: &Path, destination: &Path) -> Result<(), MoveError> {
    if let Err(e) = copy_dir_recursive(source, destination) {
        let _ = fs::remove_dir_all(destination);
        return Err(MoveError::NotMoved(e));
    }
    fs::remove_dir_all(source).map_err(MoveError::SourceLeftBehind)
}

/// Copy one file and check the copy has the source's length
pub fn copy_file_verified(source: &Path, destination: &Path) -> io::Result<()> {
    let source_size = fs::metadata(source)?.len();
    fs::copy(source, destination)?;

    let destination_size = fs::metadata(destination)?.len();
    if destination_size != source_size {
        let _ = fs::remove_file(destination);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "copy verification failed: source {} bytes, copy {} bytes",
                source_size, destination_size
            ),
        ));
    }
    Ok(())
}

/// Recreate `source` beneath `destination`, which must not exist yet
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file_verified(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

/// Copy a file or directory tree
pub fn copy_any(source: &Path, destination: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        copy_dir_recursive(source, destination)
    } else {
        copy_file_verified(source, destination)
    }
}

/// Delete a file or directory tree
pub fn remove_any(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Total bytes of the files beneath `path` (or the file itself)
pub fn tree_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
