//! # Space Reclaim
//!
//! Finds reclaimable disk space and disposes of it without ever losing
//! data by accident.
//!
//! ## Core Philosophy
//! - **Never destroy silently** - permanent deletion needs an explicit call
//! - **Always undoable** - quarantined items keep enough metadata to restore
//! - **Explain failures** - every failed item carries a readable reason
//!
//! ## Architecture
//! - `core` - Categorizer, scanner, finders, quarantine and disposal
//! - `config` - Application paths and the exclusion list
//! - `events` - Event-driven progress reporting (UI-ready)
//! - `error` - User-friendly error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ReclaimError, Result};

/// Initialize tracing for the application
///
/// Call once from the entry point; the filter comes from `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already installed");
    }
}
