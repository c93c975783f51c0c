#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-electron-bundler
//!
//! Rolldown-backed builds for the three targets of an Electron app: the main
//! process, the preload bridge and the renderer UI.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fob_electron_bundler::{Engine, RolldownEngine, resolve_config};
//! use fob_electron_config::{ConfigCommand, InlineConfig, Phase, ProcessContext};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let process = ProcessContext::new(".", Phase::Production, ConfigCommand::Build);
//! let resolved = resolve_config(&InlineConfig::default(), &process).await?;
//!
//! let engine = RolldownEngine::new();
//! for target in resolved.targets() {
//!     let report = engine.build(target).await?;
//!     println!("{}: {} files", target.kind, report.files.len());
//! }
//! # Ok(()) }
//! ```
//!
//! Presets fill in runtime-correct defaults per target and reject configs
//! that would produce a broken artifact. Orchestrator plugins
//! ([`plugins::TargetPlugin`]) hook into every stage of a target build.

pub mod engine;
pub mod error;
pub mod eval;
pub mod plugins;
pub mod presets;
pub mod resolver;
pub mod target;

pub use engine::{
    BuildReport, DevServer, Engine, RendererServer, ResolvedTarget, RolldownEngine, WatchEvent,
    WatchHandle,
};
pub use error::{Error, Result};
pub use eval::ScriptEvaluator;
pub use plugins::{PluginSet, SharedTargetPlugin, TargetPlugin};
pub use presets::{PresetContext, Warning};
pub use resolver::{ConfigResolver, ResolvedConfig, resolve_config};
pub use target::TargetKind;
