use assert_fs::prelude::*;
use space_reclaim::core::duplicates::{DuplicateFinder, DuplicateSet};
use space_reclaim::core::paths::normalize;
use space_reclaim::core::{CancellationToken, ExclusionSet};
use std::collections::HashSet;
use std::fs::OpenOptions;

fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

/// Write `bytes` under `temp`, creating parent directories
fn put(temp: &assert_fs::TempDir, relative: &str, bytes: &[u8]) {
    let child = temp.child(relative);
    if let Some(parent) = child.path().parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    child.write_binary(bytes).unwrap();
}

fn find(root: &std::path::Path) -> Vec<DuplicateSet> {
    DuplicateFinder::default()
        .find(root, &ExclusionSet::new(), &CancellationToken::new())
        .unwrap()
        .sets
}

#[test]
fn identical_pair_is_found_and_last_byte_difference_is_not() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    let bytes = content(64 * 1024 + 17);

    put(&temp, "A.bin", &bytes);
    put(&temp, "sub/B.bin", &bytes);
    let mut almost = bytes.clone();
    let last = almost.len() - 1;
    almost[last] ^= 0xFF;
    put(&temp, "C.bin", &almost);

    let sets = find(&root);

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].paths, vec![root.join("A.bin"), root.join("sub/B.bin")]);
    assert!(!sets[0].paths.contains(&root.join("C.bin")));
}

#[test]
fn truncating_a_file_removes_it_from_the_set() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    let bytes = content(20_000);
    put(&temp, "A.bin", &bytes);
    put(&temp, "B.bin", &bytes);
    assert_eq!(find(&root).len(), 1);

    let file = OpenOptions::new()
        .write(true)
        .open(root.join("A.bin"))
        .unwrap();
    file.set_len(15_000).unwrap();

    let sets = find(&root);
    assert!(sets.iter().all(|s| !s.paths.contains(&root.join("A.bin"))));
    assert!(sets.is_empty());
}

#[test]
fn repeated_scans_yield_the_same_groups() {
    let temp = assert_fs::TempDir::new().unwrap();
    for (group, len) in [(0u8, 5_000usize), (1, 9_000), (2, 70_000)] {
        let bytes: Vec<u8> = content(len).into_iter().map(|b| b ^ group).collect();
        for copy in 0..3 {
            put(&temp, &format!("g{group}/copy{copy}.bin"), &bytes);
        }
    }
    temp.child("unique.bin").write_binary(&content(5_001)).unwrap();

    let first: HashSet<DuplicateSet> = find(temp.path()).into_iter().collect();
    let second: HashSet<DuplicateSet> = find(temp.path()).into_iter().collect();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn excluded_directory_is_never_hashed() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    let bytes = content(4_000);
    put(&temp, "keep/a.bin", &bytes);
    put(&temp, "keep/b.bin", &bytes);
    put(&temp, "vault/c.bin", &bytes);

    let exclusions = ExclusionSet::from_paths([root.join("vault")]);
    let result = DuplicateFinder::default()
        .find(&root, &exclusions, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.sets.len(), 1);
    assert_eq!(result.sets[0].paths.len(), 2);
    assert_eq!(result.files_considered, 2);
}
