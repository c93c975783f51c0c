//! Target presets.
//!
//! Each preset is a [`TargetPlugin`](crate::plugins::TargetPlugin) pair of
//! hooks: `config` injects runtime-correct defaults underneath the user's
//! settings and forces the handful of fields the orchestrator owns, and
//! `config_resolved` rejects combinations that would produce a broken
//! artifact.

mod builtins;
mod main;
mod preload;
mod renderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fob_electron_config::{
    ConfigCommand, ExternalPattern, InputOption, ModuleFormat, OneOrMany, OutputOptions,
    PackageData, Phase, ProcessContext, RuntimeFacts, RuntimeProbe, TargetConfig, merge_targets,
};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::target::TargetKind;

pub use builtins::{BUILTIN_MODULES, builtin_ids};
pub use main::MainPreset;
pub use preload::PreloadPreset;
pub use renderer::RendererPreset;

/// What a preset needs to know about the project and the runtime.
#[derive(Debug, Clone)]
pub struct PresetContext {
    pub kind: TargetKind,
    /// Project root, not the target's own `root`.
    pub root: PathBuf,
    pub phase: Phase,
    pub command: ConfigCommand,
    pub facts: RuntimeFacts,
    pub runtime: RuntimeProbe,
    pub package: Option<Arc<PackageData>>,
}

impl PresetContext {
    /// Build the context for one target, probing the runtime and reading the manifest.
    pub fn for_target(kind: TargetKind, process: &ProcessContext) -> Result<Self> {
        let runtime = process.runtime_probe();
        let facts = runtime.facts().map_err(fob_electron_config::ConfigError::from)?;
        let package = PackageData::load(&process.root)?;

        Ok(Self {
            kind,
            root: process.root.clone(),
            phase: process.phase,
            command: process.command,
            facts,
            runtime,
            package,
        })
    }

    pub fn with_kind(&self, kind: TargetKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Output format for Node targets: `es` only for module packages on a runtime that can load them.
    pub fn node_format(&self) -> ModuleFormat {
        let module_package = self.package.as_ref().is_some_and(|pkg| pkg.is_module());
        if module_package && self.facts.supports_es_modules {
            ModuleFormat::Es
        } else {
            ModuleFormat::Cjs
        }
    }

    pub fn is_production(&self) -> bool {
        self.phase == Phase::Production
    }
}

/// A non-fatal finding reported after config resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// `None` for warnings about the config file as a whole.
    pub target: Option<TargetKind>,
    pub message: String,
}

impl Warning {
    pub fn new(target: TargetKind, message: impl Into<String>) -> Self {
        Self {
            target: Some(target),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self {
            target: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Probe `src/<scope>/{index,<scope>}.{js,ts,mjs,cjs}`, first match wins.
pub fn find_lib_entry(root: &Path, scope: &str) -> Option<PathBuf> {
    ["index", scope]
        .iter()
        .flat_map(|name| {
            ["js", "ts", "mjs", "cjs"]
                .iter()
                .map(move |ext| root.join("src").join(scope).join(format!("{name}.{ext}")))
        })
        .find(|path| path.is_file())
}

/// `src/renderer/index.html`, if it exists.
pub fn find_html_input(root: &Path) -> Option<PathBuf> {
    let html = root.join("src").join("renderer").join("index.html");
    html.is_file().then_some(html)
}

/// Keeps `process.env` references intact instead of letting the bundler inline them.
pub fn process_env_define() -> IndexMap<String, String> {
    ["process.env", "global.process.env", "globalThis.process.env"]
        .into_iter()
        .map(|key| (key.to_string(), key.to_string()))
        .collect()
}

/// `electron`, its sub-paths and every Node built-in.
pub fn node_externals() -> Vec<ExternalPattern> {
    let mut externals = vec![
        ExternalPattern::Exact("electron".to_string()),
        ExternalPattern::regex("^electron/.+"),
    ];
    externals.extend(builtin_ids().map(ExternalPattern::Exact));
    externals
}

/// Resolve `path` against `base` unless it is already absolute.
pub(crate) fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path_clean::clean(path)
    } else {
        path_clean::clean(base.join(path))
    }
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Defaults shared by the main and preload presets.
///
/// Returns the merged config with `lib` or `output.format` filled in the way
/// the bundler expects for a Node target.
pub(crate) fn node_target_defaults(
    user: &TargetConfig,
    ctx: &PresetContext,
) -> Result<TargetConfig> {
    let scope = ctx.kind.slot();
    let format = ctx.node_format();
    let user_build = user.build.clone().unwrap_or_default();

    let mut defaults = TargetConfig::default();
    let build = defaults.build_mut();
    build.out_dir = Some(ctx.root.join("out").join(scope));
    if !ctx.facts.host_platform_target.is_empty() {
        build.target = Some(OneOrMany::One(ctx.facts.host_platform_target.clone()));
    }
    build.assets_dir = Some("chunks".to_string());
    build.report_compressed_size = Some(false);
    build.minify = Some(fob_electron_config::Toggle::Enabled(false));

    let mut output = OutputOptions::default();
    if user_build.input().is_none() {
        let user_formats = user_build
            .lib
            .as_ref()
            .and_then(|lib| lib.formats.as_ref())
            .is_some_and(|formats| !formats.is_empty());

        let formats = if user_formats {
            Vec::new()
        } else {
            let single = match user_build
                .rollup_options
                .as_ref()
                .and_then(|r| r.output.as_ref())
            {
                Some(OneOrMany::One(out)) => out.format,
                _ => None,
            };
            vec![single.unwrap_or(format)]
        };

        build.lib = Some(fob_electron_config::LibOptions {
            entry: find_lib_entry(&ctx.root, scope).map(|p| InputOption::Single(path_string(&p))),
            formats: Some(formats),
            file_name: None,
        });
    } else {
        output.format = Some(format);
    }

    let assets_dir = user_build.assets_dir.as_deref().unwrap_or("chunks");
    output.asset_file_names = Some(posix_join(assets_dir, "[name]-[hash].[ext]"));

    let rollup = build.rollup_options_mut();
    rollup.external = Some(OneOrMany::Many(node_externals()));
    rollup.output = Some(OneOrMany::One(output));

    merge_targets(&defaults, user).map_err(Error::from)
}

/// Settings the orchestrator always overwrites on Node targets.
pub(crate) fn force_node_fields(config: &mut TargetConfig, env_prefixes: Vec<String>) {
    let mut define = process_env_define();
    if let Some(user) = config.define.take() {
        define.extend(user);
    }
    config.define = Some(define);

    if config.env_prefix.is_none() {
        config.env_prefix = Some(OneOrMany::Many(env_prefixes));
    }
    if config.public_dir.is_none() {
        config.public_dir = Some(PathBuf::from("resources"));
    }

    let build = config.build_mut();
    build.copy_public_dir = Some(false);
    build.module_preload = Some(fob_electron_config::ModulePreload::Enabled(false));
    build.ssr = Some(true);
    build.ssr_emit_assets = Some(true);

    let ssr = config.ssr.get_or_insert_with(Default::default);
    ssr.no_external = Some(fob_electron_config::NoExternal::All(true));
}

/// Validation shared by the main and preload presets.
pub(crate) fn validate_node_target(
    config: &TargetConfig,
    ctx: &PresetContext,
    target_message: &str,
) -> Result<()> {
    let kind = ctx.kind;
    let label = kind.config_label();
    let build = config.build.clone().unwrap_or_default();

    let targets = build.targets();
    if targets.is_empty() {
        return Err(Error::invalid(
            kind,
            format!("build.target option is required in the {label}."),
        ));
    }
    if targets.iter().any(|t| !t.starts_with("node")) {
        return Err(Error::invalid(kind, target_message.to_string()));
    }

    if build.lib_entry().is_none() && build.input().is_none() {
        return Err(Error::invalid(
            kind,
            format!(
                "An entry point is required in the {label}, which can be specified using \"build.lib.entry\" or \"build.rollupOptions.input\"."
            ),
        ));
    }

    let outputs = build.resolved_outputs();
    if outputs.len() > 1 {
        return Err(Error::invalid(
            kind,
            format!("The {label} does not support multiple outputs."),
        ));
    }

    if let Some(output) = outputs.first() {
        match output.format {
            Some(ModuleFormat::Es) if !ctx.facts.supports_es_modules => {
                return Err(Error::invalid(
                    kind,
                    format!(
                        "The {label} output format does not support \"es\", you can upgrade electron to the latest version or switch to \"cjs\" format."
                    ),
                ));
            }
            Some(ModuleFormat::Es | ModuleFormat::Cjs) => {}
            _ => {
                let es = if ctx.facts.supports_es_modules {
                    " or \"es\""
                } else {
                    ""
                };
                return Err(Error::invalid(
                    kind,
                    format!("The {label} output format must be \"cjs\"{es}."),
                ));
            }
        }
    }

    Ok(())
}

pub(crate) fn posix_join(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn context(kind: TargetKind, root: &Path, major: Option<u32>, module: bool) -> PresetContext {
        let package = PackageData {
            module_type: module.then(|| "module".to_string()),
            ..Default::default()
        };
        PresetContext {
            kind,
            root: root.to_path_buf(),
            phase: Phase::Production,
            command: ConfigCommand::Build,
            facts: RuntimeFacts::from_major(major),
            runtime: RuntimeProbe::new(root, Default::default()),
            package: Some(Arc::new(package)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lib_entry_prefers_index_then_extension_order() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("src/main");
        fs::create_dir_all(&main).unwrap();
        fs::write(main.join("main.js"), "").unwrap();
        fs::write(main.join("index.ts"), "").unwrap();
        assert_eq!(find_lib_entry(dir.path(), "main"), Some(main.join("index.ts")));

        fs::write(main.join("index.js"), "").unwrap();
        assert_eq!(find_lib_entry(dir.path(), "main"), Some(main.join("index.js")));
    }

    #[test]
    fn lib_entry_falls_back_to_scope_name() {
        let dir = TempDir::new().unwrap();
        let preload = dir.path().join("src/preload");
        fs::create_dir_all(&preload).unwrap();
        fs::write(preload.join("preload.mjs"), "").unwrap();
        assert_eq!(
            find_lib_entry(dir.path(), "preload"),
            Some(preload.join("preload.mjs"))
        );
        assert_eq!(find_lib_entry(dir.path(), "main"), None);
    }

    #[test]
    fn node_format_needs_module_package_and_runtime_support() {
        let dir = TempDir::new().unwrap();
        let ctx = test_support::context(TargetKind::Main, dir.path(), Some(28), true);
        assert_eq!(ctx.node_format(), ModuleFormat::Es);
        let ctx = test_support::context(TargetKind::Main, dir.path(), Some(27), true);
        assert_eq!(ctx.node_format(), ModuleFormat::Cjs);
        let ctx = test_support::context(TargetKind::Main, dir.path(), Some(31), false);
        assert_eq!(ctx.node_format(), ModuleFormat::Cjs);
    }

    #[test]
    fn externals_cover_electron_and_builtins() {
        let externals = node_externals();
        assert!(externals.contains(&ExternalPattern::Exact("electron".into())));
        assert!(externals.contains(&ExternalPattern::regex("^electron/.+")));
        assert!(externals.contains(&ExternalPattern::Exact("node:path".into())));
    }

    #[test]
    fn asset_names_join_posix_style() {
        assert_eq!(posix_join("chunks", "[name]-[hash].[ext]"), "chunks/[name]-[hash].[ext]");
        assert_eq!(posix_join("static/", "[name]-[hash].[ext]"), "static/[name]-[hash].[ext]");
        assert_eq!(posix_join("", "[name]-[hash].[ext]"), "[name]-[hash].[ext]");
    }
}
