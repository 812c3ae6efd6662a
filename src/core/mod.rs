//! # Core Module
//!
//! The UI-agnostic engine.
//!
//! ## Modules
//! - `category` - Assigns each path a protection tier
//! - `scanner` - Streams classified entries and directory sizes
//! - `duplicates` - Finds byte-identical files
//! - `empty_folders` - Finds directories with nothing in them
//! - `quarantine` - Reversible holding area with a persisted index
//! - `disposal` - Recycle-or-quarantine batches
//! - `history` - Audit trail of disposals
//! - `suggest` - Inputs and outputs of an external classifier

pub mod cancel;
pub mod category;
pub mod disposal;
pub mod duplicates;
pub mod empty_folders;
pub mod history;
pub mod paths;
pub mod quarantine;
pub mod scanner;
pub mod suggest;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use category::{Categorizer, CategorizerConfig, Category};
pub use disposal::{DeletionEngine, DisposeMode, DisposeReport, DisposeRequest};
pub use duplicates::{DuplicateFinder, DuplicateSet};
pub use quarantine::QuarantineStore;
pub use scanner::{DirectoryScanner, ExclusionSet, ScanItem};
