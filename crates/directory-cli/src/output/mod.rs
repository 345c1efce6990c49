//! Output formatting and display utilities.

mod error;
mod report;

pub use error::{print_error, CliError, ErrorKind};
pub use report::ImportReport;
#[cfg(test)]
pub use report::RowSource;

use colored::Colorize;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prints a warning message.
pub fn warn(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}
