//! Content hashing for exact-duplicate detection.
//!
//! Two stages, both xxh3:
//! - a 64-bit hash over a fixed prefix to split size buckets cheaply
//! - a 128-bit hash over the whole file, streamed in fixed chunks

use crate::core::cancel::CancellationToken;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Hash the first `prefix_bytes` of a file.
///
/// Short files hash whatever they contain.
pub fn prefix_hash(path: &Path, prefix_bytes: usize) -> io::Result<u64> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(prefix_bytes);
    file.take(prefix_bytes as u64).read_to_end(&mut buffer)?;
    Ok(xxh3_64(&buffer))
}

/// Hash an entire file in `chunk_size` reads.
///
/// Returns `Ok(None)` if `cancel` fires between two chunks.
pub fn full_hash(
    path: &Path,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> io::Result<Option<u128>> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(Some(hasher.digest128()))
}

/// Lowercase hex rendering of a full hash
pub fn to_hex(hash: u128) -> String {
    format!("{hash:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn prefix_hash_ignores_bytes_past_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        fs::write(&a, [vec![1u8; 16], vec![2u8; 16]].concat()).unwrap();
        fs::write(&b, [vec![1u8; 16], vec![3u8; 16]].concat()).unwrap();

        assert_eq!(prefix_hash(&a, 16).unwrap(), prefix_hash(&b, 16).unwrap());
        assert_ne!(prefix_hash(&a, 32).unwrap(), prefix_hash(&b, 32).unwrap());
    }

    #[test]
    fn full_hash_is_independent_of_chunk_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        let cancel = CancellationToken::new();
        let small = full_hash(&path, 7, &cancel).unwrap();
        let large = full_hash(&path, 65536, &cancel).unwrap();
        assert_eq!(small, large);
        assert_eq!(small, Some(xxhash_rust::xxh3::xxh3_128(&content)));
    }

    #[test]
    fn full_hash_stops_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        fs::write(&path, vec![0u8; 4096]).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(full_hash(&path, 512, &cancel).unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let cancel = CancellationToken::new();
        assert!(full_hash(Path::new("/nonexistent/file.bin"), 64, &cancel).is_err());
        assert!(prefix_hash(Path::new("/nonexistent/file.bin"), 64).is_err());
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(to_hex(1).len(), 32);
    }
}
