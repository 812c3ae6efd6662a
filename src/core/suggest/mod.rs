//! # Suggest Module
//!
//! The boundary to an external "what else could go" classifier. This
//! module only prepares its inputs and converts its outputs; the model
//! itself lives behind the [`Suggester`] trait.
//!
//! ## Labelling
//! | Label | Items |
//! |-------|-------|
//! | positive | every `SafeToDelete` item, every `UserDownloads` file |
//! | negative | up to 500 files each from `System`, `Application`, `DevelopmentProject`, `UserDocuments` |
//! | candidate | `OtherUser`, `Unknown` and `UserDocuments` files |

use crate::core::category::Category;
use crate::core::disposal::DisposeRequest;
use crate::core::quarantine::PreservedAttributes;
use crate::core::scanner::{EntryKind, ScanItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, PathBuf};
use std::time::SystemTime;

/// Negative examples kept per protected category
pub const NEGATIVE_SAMPLE_LIMIT: usize = 500;

const NEGATIVE_CATEGORIES: [Category; 4] = [
    Category::System,
    Category::Application,
    Category::DevelopmentProject,
    Category::UserDocuments,
];

const CANDIDATE_CATEGORIES: [Category; 3] = [
    Category::OtherUser,
    Category::Unknown,
    Category::UserDocuments,
];

/// What the classifier sees of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionFeatures {
    pub category: Category,
    pub size_bytes: u64,
    /// Seconds since last modification; 0 when unknown
    pub age_seconds: u64,
    /// Lowercase, without the dot; empty when there is none
    pub extension: String,
    /// Number of normal components in the path
    pub path_depth: usize,
}

impl SuggestionFeatures {
    pub fn from_item(item: &ScanItem, now: SystemTime) -> Self {
        let age_seconds = item
            .modified
            .and_then(|modified| now.duration_since(modified).ok())
            .map(|age| age.as_secs())
            .unwrap_or(0);

        let extension = match item.kind {
            EntryKind::Directory => String::new(),
            EntryKind::File => item
                .path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        };

        let path_depth = item
            .path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count();

        Self {
            category: item.category,
            size_bytes: item.size_bytes,
            age_seconds,
            extension,
            path_depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: SuggestionFeatures,
    /// True when the item is the kind of thing users dispose of
    pub disposable: bool,
}

/// Labelled examples drawn from one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub examples: Vec<TrainingExample>,
}

impl TrainingSet {
    /// Label items by category; items fitting neither label are left out
    pub fn from_items(items: &[ScanItem], now: SystemTime) -> Self {
        let mut negatives_taken: HashMap<Category, usize> = HashMap::new();
        let mut examples = Vec::new();

        for item in items {
            let disposable = match (item.category, item.kind) {
                (Category::SafeToDelete, _) => true,
                (Category::UserDownloads, EntryKind::File) => true,
                (category, EntryKind::File) if NEGATIVE_CATEGORIES.contains(&category) => {
                    let taken = negatives_taken.entry(category).or_insert(0);
                    if *taken >= NEGATIVE_SAMPLE_LIMIT {
                        continue;
                    }
                    *taken += 1;
                    false
                }
                _ => continue,
            };
            examples.push(TrainingExample {
                features: SuggestionFeatures::from_item(item, now),
                disposable,
            });
        }

        Self { examples }
    }

    pub fn positives(&self) -> usize {
        self.examples.iter().filter(|e| e.disposable).count()
    }

    pub fn negatives(&self) -> usize {
        self.examples.len() - self.positives()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// A classifier needs at least one example of each label
    pub fn is_usable(&self) -> bool {
        self.positives() > 0 && self.negatives() > 0
    }
}

/// Files the classifier is asked about
pub fn candidate_pool(items: &[ScanItem]) -> Vec<ScanItem> {
    items
        .iter()
        .filter(|item| item.kind == EntryKind::File)
        .filter(|item| CANDIDATE_CATEGORIES.contains(&item.category))
        .cloned()
        .collect()
}

/// A candidate the classifier thinks could go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub category: Category,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reason: Option<String>,
}

impl Suggestion {
    pub fn for_item(item: &ScanItem, confidence: f64, reason: Option<String>) -> Self {
        Self {
            path: item.path.clone(),
            size_bytes: item.size_bytes,
            category: item.category,
            confidence: confidence.clamp(0.0, 1.0),
            reason,
        }
    }
}

impl From<Suggestion> for DisposeRequest {
    fn from(suggestion: Suggestion) -> Self {
        DisposeRequest::new(suggestion.path, suggestion.size_bytes)
            .with_category(suggestion.category)
            .with_attributes(PreservedAttributes {
                suggestion_confidence: Some(suggestion.confidence),
                confidence: None,
                reason: suggestion.reason,
            })
    }
}

/// An opaque classifier over candidate files
pub trait Suggester {
    /// Return the subset of `candidates` worth disposing of
    fn suggest(&self, training: &TrainingSet, candidates: &[ScanItem]) -> Vec<Suggestion>;
}
