//! One module per subcommand

pub mod chunk;
pub mod export;
pub mod report;
pub mod sources;
pub mod stats;
pub mod usage;

use colored::Colorize;
use std::path::Path;

/// Progress line on stderr
pub fn progress(message: &str) {
    eprintln!("  {}", message.bright_black());
}

/// Result line on stdout
pub fn wrote(what: &str, path: &Path) {
    println!("Wrote {} to {}", what, path.display());
}
