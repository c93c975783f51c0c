//! fob-electron CLI entry point.
//!
//! Parses arguments, sets up logging and dispatches to the workflows.

use clap::Parser;
use fob_electron_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let shared = args.shared();
    logger::init_logger(args.verbose, args.quiet, shared.log_level, args.no_color);
    ui::init_colors(args.no_color);
    ui::set_level(shared.log_level, args.quiet);

    let result = match args.command() {
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Preview(preview_args) => commands::preview_execute(preview_args).await,
    };

    match result {
        Ok(commands::Exit::Done) => Ok(()),
        // The app's own exit status becomes ours.
        Ok(commands::Exit::App(code)) => std::process::exit(code),
        Err(err) => Err(error::cli_error_to_miette(err)),
    }
}
