//! The OS recycle bin behind a trait, so batches can be tested without one.

use std::io;
use std::path::Path;

/// Somewhere disposed objects go when the user picked the recycle bin
pub trait RecycleBin: Send + Sync {
    fn recycle(&self, path: &Path) -> io::Result<()>;
}

/// The platform recycle bin via the `trash` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRecycleBin;

impl RecycleBin for SystemRecycleBin {
    fn recycle(&self, path: &Path) -> io::Result<()> {
        trash::delete(path).map_err(|e| io::Error::other(e.to_string()))
    }
}
