//! Error handling for the fob-electron CLI.
//!
//! [`CliError`] wraps the errors of the config and bundler crates and adds
//! the failures that only happen at the command line: bad flags, layering
//! the inline config, and launching the Electron app. `main` converts it into
//! a miette report through [`cli_error_to_miette`].

mod report;

use std::path::PathBuf;
use thiserror::Error;

pub use report::{bundler_error_to_miette, cli_error_to_miette};

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Config discovery, evaluation or validation failed
    #[error(transparent)]
    Config(#[from] fob_electron_config::ConfigError),

    /// The Electron runtime could not be inspected
    #[error(transparent)]
    Runtime(#[from] fob_electron_config::RuntimeError),

    /// A target build failed
    #[error(transparent)]
    Bundler(#[from] fob_electron_bundler::Error),

    /// A workflow step failed; `during` names the step
    #[error("error during {during}: {source}")]
    Failed {
        during: String,
        #[source]
        source: Box<CliError>,
    },

    /// Command-line flags could not be turned into an inline config
    #[error("Invalid options: {0}\n\nHint: Run 'fob-electron --help' to see the accepted flags")]
    InvalidOptions(String),

    /// Invalid command-line arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The Electron process could not be spawned or controlled
    #[error("Failed to start electron app: {0}\n\nHint: Check that electron is installed in node_modules")]
    Launch(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl CliError {
    /// Wrap an error with the workflow step it happened in.
    pub fn during(self, during: impl Into<String>) -> Self {
        CliError::Failed {
            during: during.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a `NotFound` I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Record which workflow step failed, keeping the original error.
    fn during(self, step: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn during(self, step: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            err.during(step)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fob_electron_config::ConfigError;

    #[test]
    fn test_config_error_is_transparent() {
        let err: CliError = ConfigError::ReservedName("fob.config.ts".to_string()).into();
        assert_eq!(err.to_string(), "config file cannot be named fob.config.ts.");
    }

    #[test]
    fn test_during_names_the_step() {
        let result: std::result::Result<(), ConfigError> = Err(ConfigError::MissingMainField);
        let err = result.during("build").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("error during build: "));
        assert!(msg.contains("\"main\" field"));
        assert!(matches!(err, CliError::Failed { .. }));
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/app/package.json").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_result_ext_with_hint() {
        let result: std::result::Result<(), CliError> =
            Err(CliError::InvalidArgument("--outDir".to_string()));

        let err = result.with_hint("Pass a directory").unwrap_err();
        assert!(err.to_string().contains("Hint: Pass a directory"));
    }

    #[test]
    fn test_launch_error_has_hint() {
        let msg = CliError::Launch("Electron uninstall".to_string()).to_string();
        assert!(msg.contains("Electron uninstall"));
        assert!(msg.contains("Hint:"));
    }
}
