//! # reclaim CLI
//!
//! Command-line interface for the space reclaimer.
//!
//! ## Usage
//! ```bash
//! reclaim scan ~/
//! reclaim --output json dupes ~/Downloads
//! ```

mod cli;

use space_reclaim::Result;

fn main() -> Result<()> {
    space_reclaim::init_tracing();
    cli::run()
}
