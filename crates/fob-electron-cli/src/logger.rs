//! Logging setup for the fob-electron CLI.
//!
//! The library crates log through `tracing`; this module installs the
//! subscriber that prints those events.
//!
//! The filter is picked in this order:
//! 1. `--verbose`: DEBUG for the fob-electron crates
//! 2. `--quiet`: errors only
//! 3. `-l/--logLevel`
//! 4. `RUST_LOG`
//! 5. INFO for the fob-electron crates

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

const CRATES: [&str; 3] = ["fob_electron_cli", "fob_electron_bundler", "fob_electron_config"];

/// Filter directives for the fob-electron crates at `level`.
fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the filter for the given flags.
pub fn build_filter(verbose: bool, quiet: bool, log_level: Option<LogLevel>) -> EnvFilter {
    if verbose {
        return EnvFilter::new(directives("debug"));
    }
    if quiet {
        return EnvFilter::new(directives("error"));
    }
    if let Some(level) = log_level {
        return EnvFilter::new(directives(level.filter_level()));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")))
}

/// Initialize the tracing subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, log_level: Option<LogLevel>, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet, log_level))
        .with(fmt_layer)
        .init();
}

/// Check if colored output should be enabled.
///
/// `NO_COLOR` disables colors and `FORCE_COLOR` forces them; otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_directives_cover_every_crate() {
        assert_eq!(
            directives("warn"),
            "fob_electron_cli=warn,fob_electron_bundler=warn,fob_electron_config=warn"
        );
    }

    #[test]
    fn test_silent_turns_logging_off() {
        let filter = build_filter(false, false, Some(LogLevel::Silent));
        assert!(filter.to_string().contains("fob_electron_cli=off"));
    }

    #[test]
    fn test_verbose_wins_over_log_level() {
        let filter = build_filter(true, false, Some(LogLevel::Error));
        assert!(filter.to_string().contains("fob_electron_bundler=debug"));
    }

    #[test]
    #[serial]
    fn test_no_color_disables_colors() {
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_colors());
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::remove_var("FORCE_COLOR");
        }
    }
}
