//! Error types for the engine, presets and post-processors.

use std::path::PathBuf;

use fob_electron_config::ConfigError;

use crate::target::TargetKind;

/// Result type alias for fob-electron-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A diagnostic pulled out of a rolldown failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerDiagnostic {
    pub message: String,
    pub file: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bundler rejected options or failed while generating.
    #[error("{}", format_bundler_error(.0))]
    Bundler(Vec<BundlerDiagnostic>),

    /// A target config failed validation after resolution.
    #[error("{message}")]
    InvalidConfig { target: TargetKind, message: String },

    /// Unknown name in a declarative plugin list.
    #[error("unknown plugin \"{0}\"")]
    UnknownPlugin(String),

    #[error("[{plugin}] {message}")]
    Plugin { plugin: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// The renderer dev server could not start.
    #[error("{0}")]
    Server(String),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error at {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an error from a rolldown diagnostic batch.
    pub fn from_rolldown_batch(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(extract_diagnostics(error))
    }

    pub(crate) fn invalid(target: TargetKind, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            target,
            message: message.into(),
        }
    }

    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }
}

fn extract_diagnostics(error: &dyn std::fmt::Debug) -> Vec<BundlerDiagnostic> {
    let raw = format!("{error:?}");
    let file = extract_file_path(&raw);
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(1)
        .map(|line| BundlerDiagnostic {
            message: line.to_string(),
            file: file.clone(),
        })
        .collect()
}

fn extract_file_path(raw: &str) -> Option<String> {
    raw.split(|c: char| c.is_whitespace() || c == '"' || c == '\'')
        .find(|token| {
            [".ts", ".js", ".mjs", ".cjs", ".mts", ".cts", ".tsx", ".jsx"]
                .iter()
                .any(|ext| token.ends_with(ext))
        })
        .map(str::to_string)
}

fn format_bundler_error(diagnostics: &[BundlerDiagnostic]) -> String {
    match diagnostics {
        [] => "Unknown bundler error".to_string(),
        [single] => single.message.clone(),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(|d| d.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundler(_) => "BUNDLER_ERROR",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::UnknownPlugin(_) => "UNKNOWN_PLUGIN",
            Error::Plugin { .. } => "PLUGIN_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Server(_) => "DEV_SERVER_ERROR",
            Error::Watch(_) => "WATCH_ERROR",
            Error::IoAt { .. } | Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig { target, .. } => Some(Box::new(format!(
                "Check the \"{}\" section of electron.fob.config.",
                target.slot()
            ))),
            Error::UnknownPlugin(_) => Some(Box::new(
                "Available plugins: externalizeDeps, bytecode, decorators.",
            )),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Ensure it stays inside the output directory."
            ))),
            Error::WriteFailure(_) => Some(Box::new("Check disk space and permissions.")),
            Error::Server(_) => Some(Box::new(
                "Another process may be using the port. Set server.port or disable server.strictPort.",
            )),
            Error::Bundler(diagnostics) => diagnostics
                .first()
                .and_then(|d| d.file.as_ref())
                .map(|file| Box::new(format!("Error occurred in {file}")) as Box<dyn std::fmt::Display>),
            _ => None,
        }
    }
}
