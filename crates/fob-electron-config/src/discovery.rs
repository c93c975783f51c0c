//! File-based config discovery.
//!
//! Looks for `electron.fob.config.<ext>` in the project root. Script formats
//! are tried first in a fixed order, then the static `json` and `toml` forms.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::package::is_file_path_esm;

/// Base name of the user config file.
pub const CONFIG_BASE_NAME: &str = "electron.fob.config";

/// Script extensions, in lookup priority order.
pub const SCRIPT_EXTENSIONS: [&str; 6] = ["js", "ts", "mjs", "cjs", "mts", "cts"];

/// Static extensions, tried after all script extensions.
pub const STATIC_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Prefix of the bundler's own config file name, which this tool refuses to load.
const RESERVED_PREFIX: &str = "fob.config.";

/// How a config file has to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Script { esm: bool },
    Json,
    Toml,
}

pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find the config file by conventional name.
    pub fn find(&self) -> Option<PathBuf> {
        SCRIPT_EXTENSIONS
            .iter()
            .chain(STATIC_EXTENSIONS.iter())
            .map(|ext| self.root.join(format!("{CONFIG_BASE_NAME}.{ext}")))
            .find(|path| path.is_file())
    }

    /// Resolve the config file to load.
    ///
    /// An explicit path is resolved against the root and must exist. Without
    /// one, a missing config is not an error and yields `Ok(None)`.
    pub fn locate(&self, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        let path = match explicit {
            Some(file) => {
                check_reserved_name(file)?;
                let path = path_clean::clean(self.root.join(file));
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                path
            }
            None => match self.find() {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        check_reserved_name(&path)?;
        Ok(Some(path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reject file names reserved for the bundler's own configuration.
pub fn check_reserved_name(path: &Path) -> Result<()> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };

    let reserved = name.strip_prefix(RESERVED_PREFIX).is_some_and(|ext| {
        SCRIPT_EXTENSIONS.contains(&ext) || STATIC_EXTENSIONS.contains(&ext)
    });

    if reserved {
        return Err(ConfigError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Classify a config file by extension.
pub fn config_format(path: &Path, root: &Path) -> Result<ConfigFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "json" => Ok(ConfigFormat::Json),
        "toml" => Ok(ConfigFormat::Toml),
        e if SCRIPT_EXTENSIONS.contains(&e) => Ok(ConfigFormat::Script {
            esm: is_file_path_esm(path, root)?,
        }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a `json` or `toml` config file into a JSON value.
pub fn load_static(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let invalid = |message: String| ConfigError::EvaluationFailed {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string())),
        Some("toml") => {
            let toml_val: toml::Value = toml::from_str(&content)
                .map_err(|e| invalid(format!("Invalid TOML syntax: {e}")))?;
            serde_json::to_value(toml_val)
                .map_err(|e| invalid(format!("TOML to JSON conversion failed: {e}")))
        }
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}
