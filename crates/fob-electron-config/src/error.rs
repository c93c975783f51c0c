//! Error types for configuration loading and runtime introspection.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Discovery errors
    #[error("config file cannot be named {0}.")]
    ReservedName(String),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    // Shape errors
    #[error("config must export or return an object")]
    NotAnObject,

    #[error("{0} config must export or return an object")]
    SlotNotAnObject(String),

    #[error("invalid config value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    // Evaluation errors
    #[error("failed to load config from {}: {message}", .path.display())]
    EvaluationFailed { path: PathBuf, message: String },

    #[error("invalid env file {}: {message}", .path.display())]
    EnvFile { path: PathBuf, message: String },

    // Package manifest errors
    #[error("Not found: package.json")]
    ManifestNotFound,

    #[error("invalid package.json at {}: {message}", .path.display())]
    InvalidManifest { path: PathBuf, message: String },

    #[error("No entry point found for electron app, please add a \"main\" field to package.json")]
    MissingMainField,

    #[error("No electron app entry file found: {}", .0.display())]
    EntryFileNotFound(PathBuf),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while introspecting the installed Electron runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The `electron` package could not be located and no override is set.
    #[error("Electron uninstall")]
    NotInstalled,

    /// `electron/package.json` exists but cannot be read.
    #[error("cannot read electron package metadata at {}: {message}", .path.display())]
    UnreadableManifest { path: PathBuf, message: String },

    /// The `ELECTRON_MAJOR_VER` override is not a number.
    #[error("invalid ELECTRON_MAJOR_VER value: {0}")]
    InvalidOverride(String),
}
