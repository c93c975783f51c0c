//! Build summaries, the dev server address and section breaks.

use owo_colors::OwoColorize;
use std::time::Duration;

use super::{color_enabled, enabled};
use crate::cli::LogLevel;

/// Status line for a finished target build.
///
/// ```
/// use std::time::Duration;
/// use fob_electron_cli::ui::build_summary;
///
/// assert_eq!(
///     build_summary("main process", 1, Duration::from_millis(42)),
///     "build the electron main process successfully (1 file in 42ms)"
/// );
/// ```
pub fn build_summary(label: &str, files: usize, elapsed: Duration) -> String {
    let noun = if files == 1 { "file" } else { "files" };
    format!(
        "build the electron {label} successfully ({files} {noun} in {})",
        elapsed_label(elapsed)
    )
}

// Sub-second builds in whole milliseconds, anything longer in seconds.
fn elapsed_label(elapsed: Duration) -> String {
    match elapsed.as_millis() {
        ms @ 0..1000 => format!("{ms}ms"),
        _ => format!("{:.2}s", elapsed.as_secs_f64()),
    }
}

/// Print the gray break between target sections.
pub fn separator() {
    if !enabled(LogLevel::Info) {
        return;
    }
    if color_enabled() {
        eprintln!("\n{}\n", "-----".dimmed());
    } else {
        eprintln!("\n-----\n");
    }
}

/// Print the renderer dev server address.
pub fn print_urls(url: &str) {
    if !enabled(LogLevel::Info) {
        return;
    }
    if color_enabled() {
        eprintln!("  {} {}   {}", "➜".green(), "Local:".bold(), url.cyan());
    } else {
        eprintln!("  ➜ Local:   {url}");
    }
}
