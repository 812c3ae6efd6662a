//! # Category Module
//!
//! Assigns every filesystem path a protection tier.
//!
//! ## Evaluation Order
//! | Step | Rule | Category |
//! |------|------|----------|
//! | 1 | disposable folder component or extension | `SafeToDelete` |
//! | 2 | under a system root | `System` |
//! | 3 | under a program-install root | `Application` |
//! | 4 | containing directory looks like a project | `DevelopmentProject` |
//! | 5 | under Downloads / Documents / a user library | `UserDownloads` / `UserDocuments` / `OtherUser` |
//! | 6 | anything else | `Unknown` |
//!
//! The first matching rule wins.

mod classifier;

pub use classifier::{Categorizer, CategorizerConfig};

use serde::{Deserialize, Serialize};

/// Protection tier of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    System,
    Application,
    DevelopmentProject,
    UserDownloads,
    UserDocuments,
    SafeToDelete,
    OtherUser,
    Unknown,
}

impl Category {
    /// Every category in display order
    pub const ALL: [Category; 8] = [
        Category::System,
        Category::Application,
        Category::DevelopmentProject,
        Category::UserDownloads,
        Category::UserDocuments,
        Category::SafeToDelete,
        Category::OtherUser,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Application => "application",
            Self::DevelopmentProject => "development_project",
            Self::UserDownloads => "user_downloads",
            Self::UserDocuments => "user_documents",
            Self::SafeToDelete => "safe_to_delete",
            Self::OtherUser => "other_user",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::System => "Essential System Files",
            Self::Application => "Application Files",
            Self::DevelopmentProject => "Development Projects",
            Self::UserDownloads => "User Downloads",
            Self::UserDocuments => "User Documents",
            Self::SafeToDelete => "Safe to Delete",
            Self::OtherUser => "Other User Files",
            Self::Unknown => "Unknown",
        }
    }

    /// Categories a UI should refuse to dispose of without extra confirmation
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::System | Self::Application | Self::DevelopmentProject | Self::UserDocuments
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
