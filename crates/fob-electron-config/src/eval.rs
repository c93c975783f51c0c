//! Config evaluation seam.
//!
//! Static formats are parsed here. Script configs need a JavaScript runtime
//! and are evaluated by an implementation living next to the bundler.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::context::ConfigCommand;
use crate::discovery::load_static;
use crate::error::Result;

/// Arguments handed to function-form configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEnv {
    pub mode: String,
    pub command: ConfigCommand,
}

/// Result of evaluating a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedConfig {
    pub value: Value,
    /// Files the config was built from, for watch invalidation.
    pub dependencies: Vec<PathBuf>,
}

#[async_trait]
pub trait ConfigEvaluator: Send + Sync {
    /// Whether this evaluator understands the given file.
    fn supports(&self, path: &Path) -> bool;

    async fn evaluate(&self, path: &Path, env: &ConfigEnv) -> Result<EvaluatedConfig>;
}

/// Evaluator for `.json` and `.toml` configs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEvaluator;

#[async_trait]
impl ConfigEvaluator for StaticEvaluator {
    fn supports(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("toml")
        )
    }

    async fn evaluate(&self, path: &Path, _env: &ConfigEnv) -> Result<EvaluatedConfig> {
        Ok(EvaluatedConfig {
            value: load_static(path)?,
            dependencies: vec![path.to_path_buf()],
        })
    }
}
