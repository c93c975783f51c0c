//! Spinner shown while a target builds.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

use super::{color_enabled, enabled, is_ci};
use crate::cli::LogLevel;

/// Spinner for a build of unknown duration.
///
/// Hidden when output is not interactive, in CI, or below the info level.
///
/// ```no_run
/// use fob_electron_cli::ui::Spinner;
///
/// let spinner = Spinner::new("building the electron main process...");
/// spinner.finish("build the electron main process successfully");
/// ```
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if enabled(LogLevel::Info) && !is_ci() && console::user_attended_stderr() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Stop the spinner and print a success line.
    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        super::success(message);
    }

    /// Stop the spinner and print an error line.
    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        if enabled(LogLevel::Error) {
            if color_enabled() {
                eprintln!("{} {}", "✗".red().bold(), message.red());
            } else {
                eprintln!("✗ {message}");
            }
        }
    }
}
