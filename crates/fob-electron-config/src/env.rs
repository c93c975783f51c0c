//! `.env` file loading.
//!
//! Files are read in increasing priority: `.env`, `.env.local`,
//! `.env.<mode>`, `.env.<mode>.local`. Only keys matching one of the target's
//! prefixes are exposed, and variables already present in the process
//! environment win over file values.

use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};

/// Load the variables visible to a target.
pub fn load_env(mode: &str, env_dir: &Path, prefixes: &[String]) -> Result<IndexMap<String, String>> {
    if prefixes.iter().any(String::is_empty) {
        return Err(ConfigError::InvalidValue {
            field: "envPrefix".to_string(),
            message: "envPrefix option contains value '', which could lead unexpected exposure of sensitive information.".to_string(),
        });
    }

    let files = [
        ".env".to_string(),
        ".env.local".to_string(),
        format!(".env.{mode}"),
        format!(".env.{mode}.local"),
    ];

    let mut parsed = IndexMap::new();
    for file in &files {
        let path = env_dir.join(file);
        if !path.is_file() {
            continue;
        }
        let vars = dotenvy::from_path_iter(&path)
            .and_then(|iter| iter.collect::<dotenvy::Result<Vec<_>>>())
            .map_err(|e| env_file_error(&path, e))?;
        parsed.extend(vars);
    }

    let matches = |key: &str| prefixes.iter().any(|p| key.starts_with(p.as_str()));

    let mut env: IndexMap<String, String> = parsed
        .into_iter()
        .filter(|(key, _)| matches(key))
        .collect();

    for (key, value) in std::env::vars() {
        if matches(&key) {
            env.insert(key, value);
        }
    }

    tracing::debug!(count = env.len(), dir = %env_dir.display(), "loaded env variables");
    Ok(env)
}

/// Compile-time replacements exposing env vars as `import.meta.env.*`.
pub fn env_defines(env: &IndexMap<String, String>, mode: &str, dev: bool) -> IndexMap<String, String> {
    let mut defines = IndexMap::new();
    for (key, value) in env {
        defines.insert(format!("import.meta.env.{key}"), quote(value));
    }
    defines.insert("import.meta.env.MODE".to_string(), quote(mode));
    defines.insert("import.meta.env.DEV".to_string(), dev.to_string());
    defines.insert("import.meta.env.PROD".to_string(), (!dev).to_string());
    defines
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Parse dotenv content from any reader.
///
/// Quoting, `export` prefixes, comments, multi-line values and `${VAR}`
/// substitution follow dotenvy.
pub fn parse_dotenv<R: Read>(reader: R) -> dotenvy::Result<IndexMap<String, String>> {
    dotenvy::from_read_iter(reader).collect()
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> ConfigError {
    ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
