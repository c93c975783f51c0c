use std::path::PathBuf;

use async_trait::async_trait;
use fob_electron_config::{
    InputOption, ModulePreload, ModulePreloadOptions, OneOrMany, Phase, TargetConfig, Toggle,
    merge_targets,
};

use super::{PresetContext, Warning, find_html_input, path_string, resolve_against};
use crate::error::{Error, Result};
use crate::plugins::{Enforce, TargetPlugin};
use crate::target::TargetKind;

/// UI bundle preset.
#[derive(Debug, Default, Clone, Copy)]
pub struct RendererPreset;

#[async_trait]
impl TargetPlugin for RendererPreset {
    fn name(&self) -> &'static str {
        "fob-electron:renderer-preset"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Pre
    }

    fn config(&self, config: &mut TargetConfig, ctx: &PresetContext) -> Result<()> {
        let production =
            ctx.phase == Phase::Production || config.mode.as_deref() == Some("production");
        if production {
            config.base = Some("./".to_string());
        }
        if config.root.is_none() {
            config.root = Some(PathBuf::from("./src/renderer"));
        }

        let user_out_dir = config
            .out_dir()
            .map(|dir| resolve_against(&ctx.root, dir));
        // Only clear directories that live strictly inside the project.
        let empty_out_dir = match &user_out_dir {
            Some(dir) => dir.starts_with(&ctx.root) && dir != &ctx.root,
            None => true,
        };
        if let Some(dir) = user_out_dir {
            config.build_mut().out_dir = Some(dir);
        }

        let mut defaults = TargetConfig::default();
        let build = defaults.build_mut();
        build.out_dir = Some(ctx.root.join("out").join("renderer"));
        if !ctx.facts.engine_target.is_empty() {
            build.target = Some(OneOrMany::One(ctx.facts.engine_target.clone()));
        }
        build.module_preload = Some(ModulePreload::Options(ModulePreloadOptions {
            polyfill: Some(false),
        }));
        if let Some(html) = find_html_input(&ctx.root) {
            build.rollup_options_mut().input = Some(InputOption::Single(path_string(&html)));
        }
        build.report_compressed_size = Some(false);
        build.minify = Some(Toggle::Enabled(false));
        build.empty_out_dir = Some(empty_out_dir);

        let mut merged = merge_targets(&defaults, config)?;
        if merged.env_dir.is_none() {
            merged.env_dir = Some(ctx.root.clone());
        }
        if merged.env_prefix.is_none() {
            merged.env_prefix = Some(OneOrMany::Many(TargetKind::Renderer.env_prefixes()));
        }

        *config = merged;
        Ok(())
    }

    fn config_resolved(&self, config: &TargetConfig, ctx: &PresetContext) -> Result<Vec<Warning>> {
        let kind = ctx.kind;
        let label = kind.config_label();
        let mut warnings = Vec::new();

        let base = config.base.as_deref().unwrap_or("/");
        if base != "./" && base != "/" {
            warnings.push(Warning::new(
                kind,
                format!("(!) Should not set \"base\" option for the {label}."),
            ));
        }

        let build = config.build.clone().unwrap_or_default();
        let targets = build.targets();
        if targets.is_empty() {
            return Err(Error::invalid(
                kind,
                format!("build.target option is required in the {label}."),
            ));
        }
        if targets
            .iter()
            .any(|t| !t.starts_with("chrome") && !is_es_target(t))
        {
            warnings.push(Warning::new(
                kind,
                format!(
                    "The {label} build.target is not \"chrome?\" or \"es?\". This could be a mistake."
                ),
            ));
        }

        if build.input().is_none() {
            tracing::warn!("index.html file is not found in /src/renderer directory.");
            return Err(Error::invalid(
                kind,
                format!("build.rollupOptions.input option is required in the {label}."),
            ));
        }

        Ok(warnings)
    }
}

/// `es2020` to `es2029`, or `esnext`.
fn is_es_target(target: &str) -> bool {
    match target.strip_prefix("es202") {
        Some(rest) => rest.len() == 1 && rest.chars().all(|c| c.is_ascii_digit()),
        None => target == "esnext",
    }
}
