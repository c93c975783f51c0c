//! `fob-electron build`.

use std::time::Instant;

use fob_electron_bundler::{
    BuildReport, Engine, ResolvedConfig, RolldownEngine, TargetKind, resolve_config,
};
use fob_electron_config::{ConfigCommand, InlineConfig, LaunchOptions, Phase, ProcessContext};

use super::{Exit, target_label};
use crate::cli::BuildArgs;
use crate::config;
use crate::error::{Result, ResultExt};
use crate::ui;

/// Execute the build command.
pub async fn execute(args: BuildArgs) -> Result<Exit> {
    let inline = config::inline_config(&args.shared, false)?;
    let process = config::process_context(
        &args.shared,
        Phase::Production,
        ConfigCommand::Build,
        LaunchOptions::default(),
    )?;

    run(&RolldownEngine::new(), &inline, &process)
        .await
        .during("build")?;
    Ok(Exit::Done)
}

/// Resolve the config and build every target.
pub async fn run(
    engine: &dyn Engine,
    inline: &InlineConfig,
    process: &ProcessContext,
) -> Result<Vec<(TargetKind, BuildReport)>> {
    let resolved = resolve_config(inline, process).await?;
    if resolved.is_empty() {
        ui::warning("no electron.fob.config file found, nothing to build");
        return Ok(Vec::new());
    }
    build_targets(engine, resolved).await
}

/// Build main, then preload, then renderer.
///
/// Watch settings are dropped. The first failure stops the remaining
/// targets.
pub async fn build_targets(
    engine: &dyn Engine,
    mut resolved: ResolvedConfig,
) -> Result<Vec<(TargetKind, BuildReport)>> {
    for kind in TargetKind::ALL {
        if let Some(build) = resolved
            .target_mut(kind)
            .and_then(|target| target.config.build.as_mut())
        {
            build.watch = None;
        }
    }

    let mut reports = Vec::new();
    for target in resolved.targets() {
        let label = target_label(target.kind);
        let spinner = ui::Spinner::new(&format!("building the electron {label}..."));
        let start = Instant::now();

        match engine.build(target).await {
            Ok(report) => {
                spinner.finish(&ui::build_summary(label, report.files.len(), start.elapsed()));
                reports.push((target.kind, report));
            }
            Err(err) => {
                spinner.fail(&format!("failed to build the electron {label}"));
                return Err(err.into());
            }
        }
    }
    Ok(reports)
}
