use async_trait::async_trait;
use fob_electron_config::{ResolveOptions, TargetConfig, merge_targets};

use super::{PresetContext, Warning, force_node_fields, node_target_defaults, validate_node_target};
use crate::error::Result;
use crate::plugins::{Enforce, TargetPlugin};
use crate::target::TargetKind;

/// Host process preset.
#[derive(Debug, Default, Clone, Copy)]
pub struct MainPreset;

#[async_trait]
impl TargetPlugin for MainPreset {
    fn name(&self) -> &'static str {
        "fob-electron:main-preset"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Pre
    }

    fn config(&self, config: &mut TargetConfig, ctx: &PresetContext) -> Result<()> {
        let mut merged = node_target_defaults(config, ctx)?;

        let resolve_defaults = TargetConfig {
            resolve: Some(ResolveOptions {
                browser_field: Some(false),
                main_fields: Some(vec![
                    "module".to_string(),
                    "jsnext:main".to_string(),
                    "jsnext".to_string(),
                ]),
                conditions: Some(vec!["node".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let with_resolve = merge_targets(
            &resolve_defaults,
            &TargetConfig {
                resolve: merged.resolve.take(),
                ..Default::default()
            },
        )?;
        merged.resolve = with_resolve.resolve;

        force_node_fields(&mut merged, TargetKind::Main.env_prefixes());
        *config = merged;
        Ok(())
    }

    fn config_resolved(&self, config: &TargetConfig, ctx: &PresetContext) -> Result<Vec<Warning>> {
        let label = ctx.kind.config_label();
        validate_node_target(
            config,
            ctx,
            &format!("The {label} build.target option must be \"node?\"."),
        )?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::test_support::context;
    use fob_electron_config::{ExternalPattern, ModuleFormat, OneOrMany};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/main")).unwrap();
        fs::write(dir.path().join("src/main/index.ts"), "export {}").unwrap();
        dir
    }

    fn apply(user: serde_json::Value, dir: &TempDir, major: u32, module: bool) -> (TargetConfig, Result<Vec<Warning>>) {
        let ctx = context(TargetKind::Main, dir.path(), Some(major), module);
        let mut config = TargetConfig::from_value(user).unwrap();
        MainPreset.config(&mut config, &ctx).unwrap();
        let validated = MainPreset.config_resolved(&config, &ctx);
        (config, validated)
    }

    #[test]
    fn empty_config_yields_valid_defaults() {
        let dir = project();
        let (config, validated) = apply(json!({}), &dir, 31, false);
        validated.unwrap();

        let build = config.build.as_ref().unwrap();
        assert_eq!(build.out_dir.as_ref().unwrap(), &dir.path().join("out/main"));
        assert_eq!(build.targets(), ["node20.14".to_string()]);
        assert_eq!(build.copy_public_dir, Some(false));
        assert_eq!(build.ssr, Some(true));
        assert_eq!(build.resolved_outputs()[0].format, Some(ModuleFormat::Cjs));
        assert_eq!(
            build.resolved_outputs()[0].asset_file_names.as_deref(),
            Some("chunks/[name]-[hash].[ext]")
        );
        assert_eq!(config.public_dir.as_deref(), Some(std::path::Path::new("resources")));
        assert_eq!(
            config.resolve.as_ref().unwrap().conditions,
            Some(vec!["node".to_string()])
        );
        assert_eq!(
            config.env_prefixes(),
            vec!["MAIN_VITE_".to_string(), "VITE_".to_string()]
        );
    }

    #[test]
    fn module_package_on_modern_runtime_builds_es() {
        let dir = project();
        let (config, validated) = apply(json!({}), &dir, 31, true);
        validated.unwrap();
        let outputs = config.build.as_ref().unwrap().resolved_outputs();
        assert_eq!(outputs[0].format, Some(ModuleFormat::Es));
    }

    #[test]
    fn user_externals_are_appended_to_defaults() {
        let dir = project();
        let (config, _) = apply(
            json!({ "build": { "rollupOptions": { "external": ["sqlite3"] } } }),
            &dir,
            31,
            false,
        );
        let external = config.build.unwrap().rollup_options.unwrap().external.unwrap();
        let external = external.as_slice();
        assert_eq!(external.first(), Some(&ExternalPattern::Exact("electron".into())));
        assert_eq!(external.last(), Some(&ExternalPattern::Exact("sqlite3".into())));
    }

    #[test]
    fn explicit_input_sets_output_format_instead_of_lib() {
        let dir = project();
        let (config, validated) = apply(
            json!({ "build": { "rollupOptions": { "input": { "index": "src/main/app.ts" } } } }),
            &dir,
            31,
            false,
        );
        validated.unwrap();
        let build = config.build.unwrap();
        assert!(build.lib.is_none());
        let output = build.rollup_options.unwrap().output.unwrap();
        assert!(matches!(output, OneOrMany::One(ref o) if o.format == Some(ModuleFormat::Cjs)));
    }

    #[test]
    fn user_define_wins_over_process_env_identity() {
        let dir = project();
        let (config, _) = apply(json!({ "define": { "process.env": "{}" } }), &dir, 31, false);
        let define = config.define.unwrap();
        assert_eq!(define["process.env"], "{}");
        assert_eq!(define["globalThis.process.env"], "globalThis.process.env");
    }

    #[test]
    fn forced_fields_override_user_settings() {
        let dir = project();
        let (config, _) = apply(
            json!({ "build": { "copyPublicDir": true, "ssr": false } }),
            &dir,
            31,
            false,
        );
        let build = config.build.unwrap();
        assert_eq!(build.copy_public_dir, Some(false));
        assert_eq!(build.ssr, Some(true));
    }

    #[test]
    fn browser_target_is_rejected() {
        let dir = project();
        let (_, validated) = apply(json!({ "build": { "target": "chrome120" } }), &dir, 31, false);
        assert_eq!(
            validated.unwrap_err().to_string(),
            "The fob-electron main config build.target option must be \"node?\"."
        );
    }

    #[test]
    fn unknown_runtime_version_requires_target() {
        let dir = project();
        let (_, validated) = apply(json!({}), &dir, 10, false);
        assert_eq!(
            validated.unwrap_err().to_string(),
            "build.target option is required in the fob-electron main config."
        );
    }

    #[test]
    fn missing_entry_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (_, validated) = apply(json!({}), &dir, 31, false);
        assert!(validated.unwrap_err().to_string().starts_with(
            "An entry point is required in the fob-electron main config"
        ));
    }

    #[test]
    fn multiple_outputs_are_rejected() {
        let dir = project();
        let (_, validated) = apply(
            json!({ "build": { "lib": { "formats": ["es", "cjs"] } } }),
            &dir,
            31,
            false,
        );
        assert_eq!(
            validated.unwrap_err().to_string(),
            "The fob-electron main config does not support multiple outputs."
        );
    }

    #[test]
    fn es_output_on_old_runtime_is_rejected() {
        let dir = project();
        let (_, validated) = apply(
            json!({ "build": { "rollupOptions": { "output": { "format": "es" } } } }),
            &dir,
            27,
            false,
        );
        assert!(validated
            .unwrap_err()
            .to_string()
            .contains("output format does not support \"es\""));
    }

    #[test]
    fn non_node_format_is_rejected() {
        let dir = project();
        let (_, validated) = apply(
            json!({ "build": { "rollupOptions": { "output": { "format": "iife" } } } }),
            &dir,
            31,
            false,
        );
        assert_eq!(
            validated.unwrap_err().to_string(),
            "The fob-electron main config output format must be \"cjs\" or \"es\"."
        );
    }
}
