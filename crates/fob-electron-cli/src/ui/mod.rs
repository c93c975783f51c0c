//! Terminal output for the fob-electron CLI.
//!
//! Status lines go to stderr and respect `-l/--logLevel` and `--quiet`.
//!
//! ```no_run
//! use fob_electron_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("build the electron main process successfully");
//! ui::warning("you have skipped the main process and preload scripts building");
//! ```

mod format;
mod messages;
mod spinner;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::cli::LogLevel;

pub use format::{build_summary, print_urls, separator};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static COLOR: AtomicBool = AtomicBool::new(true);

/// Set the lowest level that still prints.
pub fn set_level(level: Option<LogLevel>, quiet: bool) {
    let level = if quiet {
        LogLevel::Error
    } else {
        level.unwrap_or(LogLevel::Info)
    };
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Whether a message at `level` should be printed.
pub(crate) fn enabled(level: LogLevel) -> bool {
    let current = LEVEL.load(Ordering::Relaxed);
    current != LogLevel::Silent as u8 && level as u8 >= current
}

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, then falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Initialize color support based on `--no-color` and the environment.
pub fn init_colors(no_color: bool) {
    let color = !no_color && should_use_color();
    COLOR.store(color, Ordering::Relaxed);
    console::set_colors_enabled_stderr(color);
}

pub(crate) fn color_enabled() -> bool {
    COLOR.load(Ordering::Relaxed)
}

/// Clear the terminal if allowed and stderr is interactive.
pub fn clear_screen(allowed: Option<bool>) {
    if allowed == Some(false) || is_ci() || !console::user_attended_stderr() {
        return;
    }
    let _ = console::Term::stderr().clear_screen();
}
