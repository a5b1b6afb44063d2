//! Console reporting for the command-line host

use colored::Colorize;

/// Report a fatal problem on stderr. Multi-line messages (load errors
/// quote the offending source line on a second line) keep their shape
/// after the colored prefix.
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// Print a bold section header, used between demo runs
pub fn banner(title: &str) {
    println!("=== {} ===", title.bold());
}
