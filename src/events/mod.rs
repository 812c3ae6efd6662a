//! # Events Module
//!
//! Event-driven progress reporting for scans and disposal batches.
//!
//! ## Design
//! The core library emits events through channels, allowing any UI
//! (CLI, GUI, web) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Scan(ScanEvent::ItemFound(item)) = event {
//!             println!("{} ({})", item.path.display(), item.category);
//!         }
//!     }
//! });
//!
//! scanner.scan_with_events(&root, &exclusions, &sender, &cancel)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
