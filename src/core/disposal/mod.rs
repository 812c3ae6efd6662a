//! # Disposal Module
//!
//! Runs disposal batches. A batch picks one mode for all of its items:
//! the OS recycle bin or the quarantine area. Per-item failures are
//! collected with a readable reason and never stop the batch.

mod engine;
mod recycle;

pub use engine::{
    DeletionEngine, DisposeErrorKind, DisposeFailure, DisposeMode, DisposeReport, DisposeRequest,
    DisposedItem,
};
pub use recycle::{RecycleBin, SystemRecycleBin};
