use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::LogLevel;
use crate::cli::validation::parse_port;

/// Port used by `--inspect` and `--inspectBrk` when no value is given.
pub const DEFAULT_INSPECTOR_PORT: &str = "5858";

/// Available fob-electron subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start dev server and electron app
    #[command(visible_alias = "serve")]
    Dev(DevArgs),

    /// Build for production
    Build(BuildArgs),

    /// Start electron app to preview production build
    Preview(PreviewArgs),
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct SharedArgs {
    /// Project root (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Use specified config file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// info | warn | error | silent
    #[arg(short = 'l', long = "logLevel", value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Allow/disable clear screen when logging
    #[arg(
        long = "clearScreen",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub clear_screen: Option<bool>,

    /// Set env mode
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    pub mode: Option<String>,

    /// Ignore config warning
    #[arg(long = "ignoreConfigWarning")]
    pub ignore_config_warning: bool,

    /// Output source maps for debug (default: false)
    #[arg(long = "sourcemap")]
    pub sourcemap: bool,

    /// Output directory (default: out)
    #[arg(long = "outDir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Specify electron entry file
    #[arg(long = "entry", value_name = "FILE")]
    pub entry: Option<PathBuf>,
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Rebuild when main process or preload script modules have changed on disk
    #[arg(short = 'w', long = "watch")]
    pub watch: bool,

    /// Enable V8 inspector on the specified port
    #[arg(
        long = "inspect",
        value_name = "PORT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_INSPECTOR_PORT,
        value_parser = parse_port
    )]
    pub inspect: Option<String>,

    /// Enable V8 inspector on the specified port and break before user code
    #[arg(
        long = "inspectBrk",
        value_name = "PORT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_INSPECTOR_PORT,
        value_parser = parse_port
    )]
    pub inspect_brk: Option<String>,

    /// Port for remote debugging
    #[arg(long = "remoteDebuggingPort", value_name = "PORT", value_parser = parse_port)]
    pub remote_debugging_port: Option<String>,

    /// Forces renderer process to run un-sandboxed
    #[arg(long = "noSandbox")]
    pub no_sandbox: bool,

    /// Only dev server for the renderer
    #[arg(long = "rendererOnly")]
    pub renderer_only: bool,

    /// Arguments passed through to Electron
    #[arg(last = true, value_name = "ELECTRON_ARGS")]
    pub electron_args: Vec<String>,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub shared: SharedArgs,
}

/// Arguments for the preview command
#[derive(Args, Debug, Clone, Default)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Forces renderer process to run un-sandboxed
    #[arg(long = "noSandbox")]
    pub no_sandbox: bool,

    /// Skip the production build
    #[arg(long = "skipBuild")]
    pub skip_build: bool,

    /// Arguments passed through to Electron
    #[arg(last = true, value_name = "ELECTRON_ARGS")]
    pub electron_args: Vec<String>,
}
