use assert_fs::prelude::*;
use predicates::prelude::*;
use space_reclaim::config::{AppPaths, ExclusionList};
use space_reclaim::core::category::{Categorizer, CategorizerConfig, Category};
use space_reclaim::core::empty_folders::{EmptyFolderConfig, EmptyFolderFinder};
use space_reclaim::core::paths::normalize;
use space_reclaim::core::scanner::{DirectoryScanner, EntryKind, ScanConfig};
use space_reclaim::core::{CancellationToken, ExclusionSet};
use space_reclaim::events::{Event, EventChannel, ScanEvent};
use std::path::{Path, PathBuf};

/// Rules without the `tmp` folder marker, so temp directories are not
/// swallowed by the disposable rule
fn plain_categorizer() -> Categorizer {
    Categorizer::new(CategorizerConfig {
        disposable_folders: vec!["cache".to_string()],
        ..CategorizerConfig::default()
    })
}

fn scanner() -> DirectoryScanner {
    DirectoryScanner::new(ScanConfig::default(), plain_categorizer())
}

#[test]
fn excluded_subtree_never_appears_in_scan_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    temp.child("visible").create_dir_all().unwrap();
    temp.child("visible/notes.txt").write_str("notes").unwrap();
    temp.child("private/deep").create_dir_all().unwrap();
    temp.child("private/deep/sentinel.txt").write_str("secret").unwrap();

    let exclusions = ExclusionSet::from_paths([root.join("private")]);
    let result = scanner()
        .scan(&root, &exclusions, &CancellationToken::new())
        .unwrap();

    assert!(result.outcome.completed);
    assert!(result
        .items
        .iter()
        .all(|item| !item.path.starts_with(root.join("private"))));
    assert!(result
        .items
        .iter()
        .any(|item| item.path == root.join("visible/notes.txt")));
    assert!(!result.outcome.dir_sizes.contains_key(&root.join("private")));
}

#[test]
fn cumulative_sizes_roll_up_to_the_root() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    temp.child("a/b").create_dir_all().unwrap();
    temp.child("a/b/one.bin").write_binary(&[0u8; 300]).unwrap();
    temp.child("a/two.bin").write_binary(&[0u8; 200]).unwrap();
    temp.child("three.bin").write_binary(&[0u8; 100]).unwrap();

    let outcome = scanner()
        .scan(&root, &ExclusionSet::new(), &CancellationToken::new())
        .unwrap()
        .outcome;

    assert_eq!(outcome.dir_sizes[&root.join("a/b")], 300);
    assert_eq!(outcome.dir_sizes[&root.join("a")], 500);
    assert_eq!(outcome.total_size_bytes(), 600);
    assert_eq!(outcome.files, 3);
    assert_eq!(outcome.directories, 2);
    assert_eq!(outcome.largest_directories(1), vec![(root.join("a"), 500)]);
}

#[test]
fn scan_events_end_with_completed_totals() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    temp.child("docs").create_dir_all().unwrap();
    temp.child("docs/readme.txt").write_str("hello").unwrap();

    let (sender, receiver) = EventChannel::new();
    let outcome = scanner()
        .scan_with_events(&root, &ExclusionSet::new(), &sender, &CancellationToken::new())
        .unwrap();
    drop(sender);
    let events: Vec<Event> = receiver.iter().collect();

    assert!(outcome.completed);
    assert!(matches!(events.first(), Some(Event::Scan(ScanEvent::Started { .. }))));
    assert!(matches!(
        events.last(),
        Some(Event::Scan(ScanEvent::Completed {
            total_items: 2,
            total_size_bytes: 5
        }))
    ));
    let found: Vec<PathBuf> = events
        .iter()
        .filter_map(|e| match e {
            Event::Scan(ScanEvent::ItemFound(item)) => Some(item.path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(found, vec![root.join("docs"), root.join("docs/readme.txt")]);
}

#[test]
fn cancelled_scan_reports_cancelled_event() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a.txt").write_str("a").unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (sender, receiver) = EventChannel::new();
    let outcome = scanner()
        .scan_with_events(temp.path(), &ExclusionSet::new(), &sender, &cancel)
        .unwrap();
    drop(sender);

    assert!(!outcome.completed);
    assert!(receiver
        .iter()
        .any(|e| matches!(e, Event::Scan(ScanEvent::Cancelled { .. }))));
}

#[test]
fn project_directory_is_detected_on_disk() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    temp.child("webapp/src").create_dir_all().unwrap();
    temp.child("webapp/package.json").write_str("{}").unwrap();
    temp.child("webapp/index.js").write_str("//").unwrap();
    temp.child("letters").create_dir_all().unwrap();
    temp.child("letters/note.txt").write_str("hi").unwrap();

    let categorizer = plain_categorizer();
    assert_eq!(
        categorizer.classify(&root.join("webapp/index.js")),
        Category::DevelopmentProject
    );
    assert_eq!(
        categorizer.classify(&root.join("letters/note.txt")),
        Category::Unknown
    );

    let scanned = scanner()
        .scan(&root, &ExclusionSet::new(), &CancellationToken::new())
        .unwrap();
    let js = scanned
        .items
        .iter()
        .find(|item| item.path == root.join("webapp/index.js"))
        .unwrap();
    assert_eq!(js.kind, EntryKind::File);
    assert_eq!(js.category, Category::DevelopmentProject);
}

#[test]
fn classification_is_stable_across_instances() {
    let paths = [
        "/home/sam/Downloads/setup.exe",
        "/home/sam/Documents/thesis.pdf",
        "/var/cache/apt/archive.deb",
        "/srv/data/blob.bin",
        "/home/sam/old.BAK",
    ];
    let config = CategorizerConfig {
        downloads: Some("/home/sam/Downloads".into()),
        documents: Some("/home/sam/Documents".into()),
        ..CategorizerConfig::default()
    };

    let first: Vec<Category> = {
        let c = Categorizer::new(config.clone());
        paths.iter().map(|p| c.classify(Path::new(p))).collect()
    };
    let second: Vec<Category> = {
        let c = Categorizer::new(config);
        paths.iter().map(|p| c.classify(Path::new(p))).collect()
    };

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            Category::UserDownloads,
            Category::UserDocuments,
            Category::SafeToDelete,
            Category::Unknown,
            Category::SafeToDelete,
        ]
    );
}

#[test]
fn empty_folder_finder_skips_excluded_subtrees() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(temp.path());
    temp.child("empty_here").create_dir_all().unwrap();
    temp.child("vault/empty_inside").create_dir_all().unwrap();
    temp.child("full").create_dir_all().unwrap();
    temp.child("full/keep.txt").write_str("x").unwrap();

    let exclusions = ExclusionSet::from_paths([root.join("vault")]);
    let result = EmptyFolderFinder::new(EmptyFolderConfig::default())
        .find(&root, &exclusions, &CancellationToken::new())
        .unwrap();

    assert_eq!(result.folders, vec![root.join("empty_here")]);
}

#[test]
fn saved_exclusions_prune_the_next_scan() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = normalize(&temp.path().join("tree"));
    temp.child("tree/skip").create_dir_all().unwrap();
    temp.child("tree/skip/hidden.txt").write_str("h").unwrap();
    temp.child("tree/shown.txt").write_str("s").unwrap();

    let paths = AppPaths::rooted_at(temp.path().join("app"));
    let mut list = ExclusionList::load(&paths.exclusions_file()).unwrap();
    assert!(list.add(&root.join("skip")));
    list.save().unwrap();
    temp.child("app/exclusions.json")
        .assert(predicate::str::contains("skip"));

    let reloaded = ExclusionList::load(&paths.exclusions_file()).unwrap();
    let items = scanner()
        .scan(&root, &reloaded.to_set(), &CancellationToken::new())
        .unwrap()
        .items;

    let names: Vec<_> = items.iter().map(|i| i.path.clone()).collect();
    assert_eq!(names, vec![root.join("shown.txt")]);
}
