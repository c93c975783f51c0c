//! Cached view of the project's `package.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

static PACKAGE_CACHE: Lazy<RwLock<HashMap<PathBuf, Arc<PackageData>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The subset of `package.json` the orchestrator cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageData {
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default, rename = "type")]
    pub module_type: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
}

impl PackageData {
    /// Load `<root>/package.json`, memoized per root for the process lifetime.
    ///
    /// Returns `Ok(None)` when the manifest does not exist.
    pub fn load(root: &Path) -> Result<Option<Arc<PackageData>>> {
        let path = root.join("package.json");

        if let Some(cached) = PACKAGE_CACHE.read().get(&path) {
            return Ok(Some(Arc::clone(cached)));
        }

        if !path.is_file() {
            return Ok(None);
        }

        let data = Arc::new(Self::parse(&path)?);
        PACKAGE_CACHE.write().insert(path, Arc::clone(&data));
        Ok(Some(data))
    }

    fn parse(path: &Path) -> Result<PackageData> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// `true` when the manifest declares `"type": "module"`.
    pub fn is_module(&self) -> bool {
        self.module_type.as_deref() == Some("module")
    }
}

/// Whether a file is treated as an ES module by Node.
///
/// `.mjs`, `.mts` and `.ts` are always modules, `.cjs` and `.cts` never are,
/// everything else follows the package `type` field.
pub fn is_file_path_esm(path: &Path, root: &Path) -> Result<bool> {
    let name = path.to_string_lossy();
    if name.ends_with(".cjs") || name.ends_with(".cts") {
        return Ok(false);
    }
    if name.ends_with(".mjs") || name.ends_with(".ts") {
        return Ok(true);
    }
    Ok(PackageData::load(root)?.is_some_and(|pkg| pkg.is_module()))
}

/// Checks that the app has an entry file Electron can start.
///
/// An explicit entry override skips the manifest check entirely.
pub fn ensure_entry_file(root: &Path, entry_override: Option<&Path>) -> Result<()> {
    if entry_override.is_some() {
        return Ok(());
    }

    let pkg = PackageData::load(root)?.ok_or(ConfigError::ManifestNotFound)?;
    let main = pkg.main.as_deref().ok_or(ConfigError::MissingMainField)?;

    let entry = path_clean::clean(root.join(main));
    if !entry.exists() {
        return Err(ConfigError::EntryFileNotFound(entry));
    }
    Ok(())
}
