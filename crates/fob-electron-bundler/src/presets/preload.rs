use async_trait::async_trait;
use fob_electron_config::{ModuleFormat, OneOrMany, OutputOptions, TargetConfig};

use super::{PresetContext, Warning, force_node_fields, node_target_defaults, validate_node_target};
use crate::error::Result;
use crate::plugins::{Enforce, TargetPlugin};
use crate::target::TargetKind;

/// Bridge layer preset.
///
/// Same shape as the host preset, except that ES output gets explicit `.mjs`
/// file names: Electron only loads a preload script as a module when its
/// extension says so.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreloadPreset;

#[async_trait]
impl TargetPlugin for PreloadPreset {
    fn name(&self) -> &'static str {
        "fob-electron:preload-preset"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Pre
    }

    fn config(&self, config: &mut TargetConfig, ctx: &PresetContext) -> Result<()> {
        let mut merged = node_target_defaults(config, ctx)?;

        let build = merged.build_mut();
        let has_es = build
            .resolved_outputs()
            .iter()
            .any(|output| output.format == Some(ModuleFormat::Es));
        if has_es {
            match build.rollup_options_mut().output.as_mut() {
                Some(OneOrMany::Many(outputs)) => outputs
                    .iter_mut()
                    .filter(|output| output.format == Some(ModuleFormat::Es))
                    .for_each(use_mjs_names),
                Some(OneOrMany::One(output)) => use_mjs_names(output),
                None => {}
            }
        }

        force_node_fields(&mut merged, TargetKind::Preload.env_prefixes());
        *config = merged;
        Ok(())
    }

    fn config_resolved(&self, config: &TargetConfig, ctx: &PresetContext) -> Result<Vec<Warning>> {
        let label = ctx.kind.config_label();
        validate_node_target(
            config,
            ctx,
            &format!("The {label} build.target must be \"node?\"."),
        )?;
        Ok(Vec::new())
    }
}

fn use_mjs_names(output: &mut OutputOptions) {
    output.entry_file_names = Some("[name].mjs".to_string());
    output.chunk_file_names = Some("[name]-[hash].mjs".to_string());
}
