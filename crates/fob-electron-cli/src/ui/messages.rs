//! Status message functions for terminal output.

use owo_colors::OwoColorize;

use super::{color_enabled, enabled};
use crate::cli::LogLevel;

/// Print a success message to stderr.
///
/// ```no_run
/// use fob_electron_cli::ui::success;
///
/// success("build the electron preload files successfully");
/// ```
pub fn success(message: &str) {
    if !enabled(LogLevel::Info) {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", "✓".green().bold(), message.green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    if !enabled(LogLevel::Info) {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", "ℹ".blue().bold(), message.cyan());
    } else {
        eprintln!("ℹ {message}");
    }
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    if !enabled(LogLevel::Warn) {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {message}");
    }
}

/// Print an error message to stderr.
///
/// Build errors in `dev` are reported here instead of ending the session.
pub fn error(message: &str) {
    if !enabled(LogLevel::Error) {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", " ERROR ".white().on_red(), message.red());
    } else {
        eprintln!("ERROR {message}");
    }
}
