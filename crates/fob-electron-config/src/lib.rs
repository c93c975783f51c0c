//! Configuration layer for fob-electron.
//!
//! Holds the typed per-target schema, config file discovery, merge rules,
//! `.env` loading, facts about the installed Electron runtime, and the
//! [`ProcessContext`] passed through every workflow.

pub mod context;
pub mod discovery;
pub mod env;
pub mod error;
pub mod eval;
pub mod merge;
pub mod package;
pub mod runtime;
pub mod schema;

pub use context::{ConfigCommand, InlineConfig, LaunchOptions, Phase, ProcessContext};
pub use discovery::{ConfigDiscovery, ConfigFormat};
pub use error::{ConfigError, Result, RuntimeError};
pub use eval::{ConfigEnv, ConfigEvaluator, EvaluatedConfig, StaticEvaluator};
pub use merge::{merge_config, merge_targets};
pub use package::PackageData;
pub use runtime::{RuntimeFacts, RuntimeOverrides, RuntimeProbe};
pub use schema::*;
