//! Orchestrator plugins.
//!
//! A [`TargetPlugin`] sees a target at every stage of its life: it can
//! rewrite the config before resolution, veto the resolved config, hand a
//! rolldown plugin to the engine, rewrite rendered chunks, add files to the
//! bundle and finally post-process what landed on disk.
//!
//! Plugins run in a fixed order. The set is assembled as user plugins
//! followed by the target's built-in plugins, then stably sorted into the
//! [`Enforce::Pre`], [`Enforce::Normal`] and [`Enforce::Post`] buckets, the
//! same way fob's registry orders rolldown plugins by phase.

mod asset;
mod bytecode;
mod chunk_ref;
mod context;
mod decorators;
mod esm_shim;
mod external;
mod externalize_deps;
mod import_meta;
mod module_path;
pub mod util;
mod worker;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use fob_electron_config::{PluginSpec, TargetConfig};
use rolldown::BundlerOptions;
use rolldown_plugin::__inner::SharedPluginable;

use crate::engine::{ChunkFile, OutputFile, WrittenBundle};
use crate::error::{Error, Result};
use crate::presets::{MainPreset, PreloadPreset, PresetContext, RendererPreset, Warning};
use crate::target::TargetKind;

pub use asset::AssetPlugin;
pub use bytecode::{BYTECODE_LOADER, BytecodeOptions, BytecodePlugin};
pub use context::{BuildContext, RenderContext};
pub use decorators::DecoratorsPlugin;
pub use esm_shim::{EsmShimPlugin, cjs_shim};
pub use external::ExternalPlugin;
pub use externalize_deps::{ExternalizeDepsOptions, ExternalizeDepsPlugin};
pub use import_meta::ImportMetaPlugin;
pub use module_path::ModulePathPlugin;
pub use worker::WorkerPlugin;

/// Ordering bucket of a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Enforce {
    Pre,
    #[default]
    Normal,
    Post,
}

/// A plugin taking part in a target's config resolution and build.
///
/// Every hook except [`name`](TargetPlugin::name) has a no-op default.
#[async_trait]
pub trait TargetPlugin: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn enforce(&self) -> Enforce {
        Enforce::Normal
    }

    /// Adjust the target config before it is resolved.
    fn config(&self, _config: &mut TargetConfig, _ctx: &PresetContext) -> Result<()> {
        Ok(())
    }

    /// Inspect the resolved config. An error aborts the workflow.
    fn config_resolved(
        &self,
        _config: &TargetConfig,
        _ctx: &PresetContext,
    ) -> Result<Vec<Warning>> {
        Ok(Vec::new())
    }

    /// Last chance to touch the engine options.
    fn options(&self, _options: &mut BundlerOptions, _ctx: &BuildContext) {}

    /// A rolldown plugin for module-level hooks (resolve, load, transform).
    fn engine_plugin(&self, _ctx: &BuildContext) -> Option<SharedPluginable> {
        None
    }

    /// Rewrite a rendered chunk before it is written.
    fn render_chunk(&self, _chunk: &mut ChunkFile, _ctx: &RenderContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Add, drop or edit files before the bundle is written.
    fn generate_bundle(&self, _bundle: &mut Vec<OutputFile>, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// Post-process files after they were written to the output directory.
    async fn write_bundle(&self, _bundle: &WrittenBundle, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// Runs once the build is done, also after a failed write.
    fn close_bundle(&self, _ctx: &BuildContext) {}
}

pub type SharedTargetPlugin = Arc<dyn TargetPlugin>;

/// Ordered plugins of one target.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    plugins: Vec<SharedTargetPlugin>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// User plugins first, then built-ins, sorted into enforce buckets.
    pub fn assemble(
        user: impl IntoIterator<Item = SharedTargetPlugin>,
        builtin: impl IntoIterator<Item = SharedTargetPlugin>,
    ) -> Self {
        let mut plugins: Vec<SharedTargetPlugin> = user.into_iter().chain(builtin).collect();
        // sort_by_key is stable, so registration order survives within a bucket
        plugins.sort_by_key(|plugin| plugin.enforce());
        Self { plugins }
    }

    /// Add a plugin and restore ordering.
    pub fn push(&mut self, plugin: SharedTargetPlugin) {
        self.plugins.push(plugin);
        self.plugins.sort_by_key(|plugin| plugin.enforce());
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedTargetPlugin> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.name() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Rolldown plugins contributed by this set, in order.
    pub fn engine_plugins(&self, ctx: &BuildContext) -> Vec<SharedPluginable> {
        self.plugins
            .iter()
            .filter_map(|plugin| plugin.engine_plugin(ctx))
            .collect()
    }
}

/// Built-in plugins of a target: its preset followed by the shared post-processors.
pub fn builtin_plugins(kind: TargetKind) -> Vec<SharedTargetPlugin> {
    match kind {
        TargetKind::Main => vec![
            Arc::new(MainPreset),
            Arc::new(AssetPlugin::new()),
            Arc::new(WorkerPlugin::new()),
            Arc::new(ModulePathPlugin::new()),
            Arc::new(ImportMetaPlugin),
            Arc::new(EsmShimPlugin),
        ],
        TargetKind::Preload => vec![
            Arc::new(PreloadPreset),
            Arc::new(AssetPlugin::new()),
            Arc::new(ImportMetaPlugin),
            Arc::new(EsmShimPlugin),
        ],
        TargetKind::Renderer => vec![Arc::new(RendererPreset)],
    }
}

/// Instantiate an opt-in plugin from its declarative form.
///
/// Returns `Ok(None)` for plugins that opt out in the current phase, such as
/// `bytecode` outside production builds.
pub fn from_spec(spec: &PluginSpec, ctx: &PresetContext) -> Result<Option<SharedTargetPlugin>> {
    let options = |plugin: &str| -> Result<serde_json::Value> {
        match &spec.options {
            serde_json::Value::Null => Ok(serde_json::Value::Object(Default::default())),
            value @ serde_json::Value::Object(_) => Ok(value.clone()),
            _ => Err(Error::Plugin {
                plugin: plugin.to_string(),
                message: "options must be an object".to_string(),
            }),
        }
    };
    let parse_error = |plugin: &str, e: serde_json::Error| Error::Plugin {
        plugin: plugin.to_string(),
        message: e.to_string(),
    };

    let plugin: SharedTargetPlugin = match spec.name.as_str() {
        "externalizeDeps" => {
            let opts: ExternalizeDepsOptions = serde_json::from_value(options(&spec.name)?)
                .map_err(|e| parse_error(&spec.name, e))?;
            Arc::new(ExternalizeDepsPlugin::new(opts, ctx.package.as_deref()))
        }
        "bytecode" => {
            if !ctx.is_production() {
                return Ok(None);
            }
            let opts: BytecodeOptions = serde_json::from_value(options(&spec.name)?)
                .map_err(|e| parse_error(&spec.name, e))?;
            Arc::new(BytecodePlugin::new(opts))
        }
        "decorators" => Arc::new(DecoratorsPlugin),
        other => return Err(Error::UnknownPlugin(other.to_string())),
    };

    tracing::debug!(plugin = plugin.name(), target = %ctx.kind, "enabled plugin");
    Ok(Some(plugin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::test_support::context;
    use fob_electron_config::Phase;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Named(&'static str, Enforce);

    impl TargetPlugin for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn enforce(&self) -> Enforce {
            self.1
        }
    }

    #[test]
    fn user_plugins_come_first_within_a_bucket() {
        let user: Vec<SharedTargetPlugin> = vec![
            Arc::new(Named("user-post", Enforce::Post)),
            Arc::new(Named("user-normal", Enforce::Normal)),
        ];
        let set = PluginSet::assemble(user, builtin_plugins(TargetKind::Main));
        assert_eq!(
            set.names(),
            vec![
                "fob-electron:main-preset",
                "fob-electron:asset",
                "fob-electron:worker",
                "fob-electron:module-path",
                "fob-electron:import-meta",
                "user-normal",
                "user-post",
                "fob-electron:esm-shim",
            ]
        );
    }

    #[test]
    fn renderer_only_gets_its_preset() {
        let set = PluginSet::assemble(Vec::new(), builtin_plugins(TargetKind::Renderer));
        assert_eq!(set.names(), vec!["fob-electron:renderer-preset"]);
    }

    #[test]
    fn preload_gets_asset_and_shims() {
        let set = PluginSet::assemble(Vec::new(), builtin_plugins(TargetKind::Preload));
        assert!(set.contains("fob-electron:asset"));
        assert!(!set.contains("fob-electron:worker"));
        assert!(set.contains("fob-electron:esm-shim"));
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        let err = from_spec(&PluginSpec::new("swc"), &ctx).unwrap_err();
        assert!(matches!(err, Error::UnknownPlugin(name) if name == "swc"));
    }

    #[test]
    fn bytecode_is_skipped_outside_production() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        ctx.phase = Phase::Development;
        assert!(from_spec(&PluginSpec::new("bytecode"), &ctx).unwrap().is_none());

        ctx.phase = Phase::Production;
        let plugin = from_spec(&PluginSpec::new("bytecode"), &ctx).unwrap().unwrap();
        assert_eq!(plugin.name(), "fob-electron:bytecode");
    }

    #[test]
    fn malformed_options_name_the_plugin() {
        let dir = TempDir::new().unwrap();
        let ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        let spec = PluginSpec::new("externalizeDeps").with_options(json!({ "include": 3 }));
        let err = from_spec(&spec, &ctx).unwrap_err();
        assert!(matches!(err, Error::Plugin { plugin, .. } if plugin == "externalizeDeps"));
    }
}
