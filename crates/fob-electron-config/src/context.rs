//! Per-workflow process context.
//!
//! Everything the orchestrator would otherwise keep in process-wide
//! environment variables lives here instead. The CLI builds one context per
//! workflow, components borrow it, and environment variables are written only
//! onto the spawned Electron process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::runtime::{RuntimeFacts, RuntimeOverrides, RuntimeProbe, non_empty_var};
use crate::schema::TargetConfig;

/// Env var carrying the workflow phase into the Electron process.
pub const PHASE_ENV: &str = "NODE_ENV_ELECTRON_FOB";

/// Env var carrying the renderer dev server URL into the Electron process.
pub const RENDERER_URL_ENV: &str = "ELECTRON_RENDERER_URL";

/// Which workflow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Development,
    Production,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Development => "development",
            Phase::Production => "production",
        }
    }
}

/// The command passed to function-form configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigCommand {
    Serve,
    Build,
}

impl ConfigCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigCommand::Serve => "serve",
            ConfigCommand::Build => "build",
        }
    }
}

/// How the Electron app gets started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// App entry passed to Electron instead of `.`
    pub entry: Option<PathBuf>,
    /// Extra arguments, forwarded verbatim
    pub args: Vec<String>,
    pub remote_debugging_port: Option<String>,
    pub inspect: Option<String>,
    pub inspect_brk: Option<String>,
    pub no_sandbox: bool,
    /// Set by `dev` once the renderer server is listening.
    pub renderer_url: Option<String>,
}

impl LaunchOptions {
    /// Read launch overrides from the environment.
    ///
    /// `ELECTRON_CLI_ARGS` must be a JSON array of strings.
    pub fn from_env() -> Result<Self> {
        let args = match non_empty_var("ELECTRON_CLI_ARGS") {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "ELECTRON_CLI_ARGS".to_string(),
                    message: e.to_string(),
                }
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            entry: non_empty_var("ELECTRON_ENTRY").map(PathBuf::from),
            args,
            remote_debugging_port: non_empty_var("REMOTE_DEBUGGING_PORT"),
            inspect: non_empty_var("V8_INSPECTOR_PORT"),
            inspect_brk: non_empty_var("V8_INSPECTOR_BRK_PORT"),
            no_sandbox: std::env::var("NO_SANDBOX").is_ok_and(|v| v == "1"),
            renderer_url: None,
        })
    }

    /// Fill unset fields from `fallback`.
    pub fn or(mut self, fallback: LaunchOptions) -> Self {
        self.entry = self.entry.or(fallback.entry);
        if self.args.is_empty() {
            self.args = fallback.args;
        }
        self.remote_debugging_port = self.remote_debugging_port.or(fallback.remote_debugging_port);
        self.inspect = self.inspect.or(fallback.inspect);
        self.inspect_brk = self.inspect_brk.or(fallback.inspect_brk);
        self.no_sandbox |= fallback.no_sandbox;
        self.renderer_url = self.renderer_url.or(fallback.renderer_url);
        self
    }

    /// Full Electron argument list, entry first.
    ///
    /// Debugging flags only apply in development; `--no-sandbox` always does.
    pub fn command_line(&self, phase: Phase) -> Vec<String> {
        let entry = self
            .entry
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());

        let mut argv = vec![entry];
        argv.extend(self.args.iter().cloned());

        if phase == Phase::Development {
            if let Some(port) = &self.remote_debugging_port {
                argv.push(format!("--remote-debugging-port={port}"));
            }
            if let Some(port) = &self.inspect {
                argv.push(format!("--inspect={port}"));
            }
            if let Some(port) = &self.inspect_brk {
                argv.push(format!("--inspect-brk={port}"));
            }
        }

        if self.no_sandbox {
            argv.push("--no-sandbox".to_string());
        }

        argv
    }

    /// Environment variables for the spawned app.
    pub fn child_env(&self, phase: Phase, facts: Option<&RuntimeFacts>) -> Vec<(String, String)> {
        let mut env = vec![(PHASE_ENV.to_string(), phase.as_str().to_string())];
        if let Some(url) = &self.renderer_url {
            env.push((RENDERER_URL_ENV.to_string(), url.clone()));
        }
        if let Some(major) = facts.and_then(|f| f.major_version) {
            env.push(("ELECTRON_MAJOR_VER".to_string(), major.to_string()));
        }
        env
    }
}

/// Config-level overrides coming from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineConfig {
    /// Explicit config file, relative to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    #[serde(default)]
    pub ignore_config_warning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_screen: Option<bool>,
    /// Merged into every target slot.
    #[serde(default)]
    pub target: TargetConfig,
}

impl InlineConfig {
    pub fn mode(&self) -> Option<&str> {
        self.target.mode.as_deref()
    }

    pub fn out_dir(&self) -> Option<&Path> {
        self.target.out_dir().map(PathBuf::as_path)
    }
}

/// State shared by every component for one workflow invocation.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pub root: PathBuf,
    pub phase: Phase,
    pub command: ConfigCommand,
    pub runtime: RuntimeOverrides,
    pub launch: LaunchOptions,
}

impl ProcessContext {
    pub fn new(root: impl Into<PathBuf>, phase: Phase, command: ConfigCommand) -> Self {
        Self {
            root: root.into(),
            phase,
            command,
            runtime: RuntimeOverrides::default(),
            launch: LaunchOptions::default(),
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeOverrides) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    pub fn runtime_probe(&self) -> RuntimeProbe {
        RuntimeProbe::new(&self.root, self.runtime.clone())
    }

    pub fn is_development(&self) -> bool {
        self.phase == Phase::Development
    }
}
