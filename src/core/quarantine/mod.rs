//! # Quarantine Module
//!
//! A reversible holding area for disposed files, separate from the OS
//! recycle bin.
//!
//! ## Lifecycle
//! ```text
//! Live ──quarantine──▶ Quarantined ──restore──▶ Restored
//!                           │
//!                           └──purge_permanently──▶ Purged
//! ```
//!
//! ## On-disk layout
//! - `<area>/<uuid>_<name>` - one physical object per quarantined item
//! - `<area>/quarantine_metadata.json` - id → entry index, rewritten in full
//!   on every change
//!
//! The object is always moved before the index is touched. An interrupted
//! sequence leaves an unindexed object that [`QuarantineStore::reconcile`]
//! reports; nothing is ever deleted to "fix" such a state.

mod index;
mod store;
mod transfer;
mod types;

pub use index::INDEX_FILE_NAME;
pub use store::QuarantineStore;
pub use types::{
    ItemFailure, ListedItem, PreservedAttributes, PurgeReport, QuarantinedEntry, QuarantinedItem,
    ReconcileReport, RestoreReport, RestoredItem,
};
