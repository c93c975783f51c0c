//! Command-line interface definition for fob-electron.
//!
//! - `fob-electron [root]` (alias `dev`, `serve`) - build main and preload,
//!   start the renderer dev server and launch the app
//! - `fob-electron build [root]` - production build of every target
//! - `fob-electron preview [root]` - production build, then launch the app

mod commands;
pub mod enums;
mod tests;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs, PreviewArgs, SharedArgs};
pub use enums::LogLevel;
pub use validation::parse_port;

/// fob-electron - build tooling for Electron apps
#[derive(Parser, Debug)]
#[command(
    name = "fob-electron",
    version,
    about = "Dev server, build and preview for Electron apps",
    long_about = "fob-electron bundles the main process, the preload scripts and the renderer\n\
                  of an Electron app with rolldown, serves the renderer with live reload and\n\
                  restarts the app when the main process changes.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute; `dev` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub dev: DevArgs,
}

impl Cli {
    /// Flags shared by every command, whichever one was picked.
    pub fn shared(&self) -> &SharedArgs {
        match &self.command {
            Some(Command::Dev(args)) => &args.shared,
            Some(Command::Build(args)) => &args.shared,
            Some(Command::Preview(args)) => &args.shared,
            None => &self.dev.shared,
        }
    }

    /// The command to run, falling back to the top-level dev arguments.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Dev(self.dev))
    }
}
