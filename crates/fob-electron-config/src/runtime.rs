//! Facts about the installed Electron runtime.
//!
//! The major version drives output-format legality and the compatibility
//! targets handed to the bundler. It is read from the `ELECTRON_MAJOR_VER`
//! override when present, otherwise from `node_modules/electron/package.json`,
//! and memoized for the lifetime of the process.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

use crate::error::RuntimeError;

/// First Electron major version able to load ES module entry points.
pub const ES_MODULE_MIN_MAJOR: u32 = 28;

/// First Electron major version exposing `import.meta.filename` and `import.meta.dirname`.
pub const IMPORT_META_PATHS_MIN_MAJOR: u32 = 30;

/// Electron major version to bundled Node.js version.
const NODE_TARGETS: &[(u32, &str)] = &[
    (13, "14.17"),
    (14, "14.17"),
    (15, "16.5"),
    (16, "16.9"),
    (17, "16.13"),
    (18, "16.13"),
    (19, "16.14"),
    (20, "16.15"),
    (21, "16.16"),
    (22, "16.17"),
    (23, "18.12"),
    (24, "18.14"),
    (25, "18.15"),
    (26, "18.16"),
    (27, "18.17"),
    (28, "18.18"),
    (29, "20.9"),
    (30, "20.11"),
    (31, "20.14"),
    (32, "20.16"),
    (33, "20.18"),
];

/// Electron major version to bundled Chromium version.
const CHROME_TARGETS: &[(u32, &str)] = &[
    (13, "91"),
    (14, "93"),
    (15, "94"),
    (16, "96"),
    (17, "98"),
    (18, "100"),
    (19, "102"),
    (20, "104"),
    (21, "106"),
    (22, "108"),
    (23, "110"),
    (24, "112"),
    (25, "114"),
    (26, "116"),
    (27, "118"),
    (28, "120"),
    (29, "122"),
    (30, "124"),
    (31, "126"),
    (32, "128"),
    (33, "130"),
];

static DETECTED_MAJOR: OnceCell<Option<u32>> = OnceCell::new();

/// Derived, immutable facts about the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeFacts {
    pub major_version: Option<u32>,
    pub supports_es_modules: bool,
    /// e.g. `node20.18`, empty when the version is unknown
    pub host_platform_target: String,
    /// e.g. `chrome130`, empty when the version is unknown
    pub engine_target: String,
}

impl RuntimeFacts {
    /// Compute the facts for a given major version.
    pub fn from_major(major_version: Option<u32>) -> Self {
        Self {
            major_version,
            supports_es_modules: major_version.is_some_and(|v| v >= ES_MODULE_MIN_MAJOR),
            host_platform_target: lookup_target(NODE_TARGETS, major_version, "node"),
            engine_target: lookup_target(CHROME_TARGETS, major_version, "chrome"),
        }
    }

    pub fn supports_import_meta_paths(&self) -> bool {
        self.major_version
            .is_some_and(|v| v >= IMPORT_META_PATHS_MIN_MAJOR)
    }
}

fn lookup_target(table: &[(u32, &str)], major: Option<u32>, prefix: &str) -> String {
    match major {
        Some(major) if major > 10 => {
            let version = table
                .iter()
                .find(|(key, _)| *key == major)
                .or_else(|| table.last())
                .map(|(_, v)| *v)
                .unwrap_or_default();
            format!("{prefix}{version}")
        }
        _ => String::new(),
    }
}

/// Overrides read from the process environment at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOverrides {
    /// `ELECTRON_MAJOR_VER`
    pub major_version: Option<String>,
    /// `ELECTRON_EXEC_PATH`
    pub exec_path: Option<PathBuf>,
}

impl RuntimeOverrides {
    pub fn from_env() -> Self {
        Self {
            major_version: non_empty_var("ELECTRON_MAJOR_VER"),
            exec_path: non_empty_var("ELECTRON_EXEC_PATH").map(PathBuf::from),
        }
    }
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Locates the Electron package and answers runtime questions about it.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    root: PathBuf,
    overrides: RuntimeOverrides,
}

impl RuntimeProbe {
    pub fn new(root: impl Into<PathBuf>, overrides: RuntimeOverrides) -> Self {
        Self {
            root: root.into(),
            overrides,
        }
    }

    /// Major version of the installed runtime.
    ///
    /// The first on-disk lookup is cached for the rest of the process.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotInstalled`] when no override is set and the
    /// `electron` package cannot be found above the project root.
    pub fn major_version(&self) -> Result<Option<u32>, RuntimeError> {
        if let Some(raw) = &self.overrides.major_version {
            return parse_override(raw).map(Some);
        }

        DETECTED_MAJOR
            .get_or_try_init(|| detect_major(&self.root))
            .copied()
    }

    pub fn facts(&self) -> Result<RuntimeFacts, RuntimeError> {
        self.major_version().map(RuntimeFacts::from_major)
    }

    /// Path to the Electron executable.
    ///
    /// Uses `ELECTRON_EXEC_PATH` when set, otherwise the `path.txt` marker that
    /// the electron package writes after downloading its binary.
    pub fn executable(&self) -> Result<PathBuf, RuntimeError> {
        if let Some(path) = &self.overrides.exec_path {
            return Ok(path.clone());
        }

        let module_dir = locate_electron(&self.root).ok_or(RuntimeError::NotInstalled)?;
        let marker = module_dir.join("path.txt");
        let relative = fs::read_to_string(&marker).unwrap_or_default();
        let relative = relative.trim();
        if relative.is_empty() {
            return Err(RuntimeError::NotInstalled);
        }

        Ok(module_dir.join("dist").join(relative))
    }
}

fn parse_override(raw: &str) -> Result<u32, RuntimeError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| RuntimeError::InvalidOverride(raw.to_string()))
}

/// Walk up from `root` looking for `node_modules/electron/package.json`.
fn locate_electron(root: &Path) -> Option<PathBuf> {
    root.ancestors()
        .map(|dir| dir.join("node_modules").join("electron"))
        .find(|dir| dir.join("package.json").is_file())
}

fn detect_major(root: &Path) -> Result<Option<u32>, RuntimeError> {
    let module_dir = locate_electron(root).ok_or(RuntimeError::NotInstalled)?;
    let manifest = module_dir.join("package.json");

    let unreadable = |message: String| RuntimeError::UnreadableManifest {
        path: manifest.clone(),
        message,
    };
    let content = fs::read_to_string(&manifest).map_err(|e| unreadable(e.to_string()))?;
    let parsed: Value = serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

    let major = parsed
        .get("version")
        .and_then(Value::as_str)
        .and_then(major_of);

    tracing::debug!(?major, path = %manifest.display(), "detected electron version");
    Ok(major)
}

fn major_of(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}
