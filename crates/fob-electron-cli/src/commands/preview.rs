//! `fob-electron preview`.

use fob_electron_bundler::{Engine, RolldownEngine};
use fob_electron_config::{ConfigCommand, InlineConfig, LaunchOptions, Phase, ProcessContext};

use super::{Exit, build};
use crate::cli::PreviewArgs;
use crate::config;
use crate::error::{Result, ResultExt};
use crate::launcher::{AppLauncher, ElectronLauncher};
use crate::ui;

/// Execute the preview command.
pub async fn execute(args: PreviewArgs) -> Result<Exit> {
    let inline = config::inline_config(&args.shared, false)?;
    let launch = LaunchOptions {
        args: args.electron_args.clone(),
        no_sandbox: args.no_sandbox,
        ..Default::default()
    };
    let process = config::process_context(
        &args.shared,
        Phase::Production,
        ConfigCommand::Build,
        launch,
    )?;

    run(
        &RolldownEngine::new(),
        &ElectronLauncher,
        &inline,
        &process,
        args.skip_build,
    )
    .await
    .during("preview electron app")
}

/// Build unless `skip_build`, then run the app until it exits.
pub async fn run(
    engine: &dyn Engine,
    launcher: &dyn AppLauncher,
    inline: &InlineConfig,
    process: &ProcessContext,
    skip_build: bool,
) -> Result<Exit> {
    if !skip_build {
        build::run(engine, inline, process).await?;
    }

    let mut app = launcher.launch(process).await?;
    ui::success("start electron app...");
    let code = app.wait().await?;
    Ok(Exit::App(code))
}
