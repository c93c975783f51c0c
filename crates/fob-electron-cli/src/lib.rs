//! fob-electron CLI - dev server, build and preview for Electron apps.
//!
//! # Architecture
//!
//! - [`cli`] - clap command surface
//! - [`config`] - flags layered into the inline config and process context
//! - [`commands`] - the `dev`, `build` and `preview` workflows
//! - [`launcher`] - starting and stopping the Electron app
//! - [`error`] - error types and miette reporting
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines, spinners and colors
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_electron_cli::commands::build;
//! use fob_electron_bundler::RolldownEngine;
//! use fob_electron_config::{ConfigCommand, InlineConfig, Phase, ProcessContext};
//!
//! # async fn run() -> fob_electron_cli::Result<()> {
//! let process = ProcessContext::new(".", Phase::Production, ConfigCommand::Build);
//! build::run(&RolldownEngine::new(), &InlineConfig::default(), &process).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod launcher;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
pub use launcher::{AppLauncher, AppProcess, ElectronLauncher};
