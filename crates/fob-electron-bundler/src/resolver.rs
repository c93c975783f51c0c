//! Configuration resolution.
//!
//! Turns the user's `electron.fob.config.*` plus command-line overrides into
//! up to three [`ResolvedTarget`]s. Each slot is merged with its own copy of
//! the inline overrides, runs through its preset and plugin `config` hooks,
//! picks up `.env` defines and is finally validated by `config_resolved`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fob_electron_config::env::{env_defines, load_env};
use fob_electron_config::{
    ConfigDiscovery, ConfigEnv, ConfigError, ConfigEvaluator, InlineConfig, Phase, ProcessContext,
    StaticEvaluator, TargetConfig, UserConfig, merge_targets,
};

use crate::engine::ResolvedTarget;
use crate::error::Result;
use crate::eval::ScriptEvaluator;
use crate::plugins::{PluginSet, builtin_plugins, from_spec};
use crate::presets::{PresetContext, Warning, resolve_against};
use crate::target::TargetKind;

/// The resolved configuration tree.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub main: Option<ResolvedTarget>,
    pub preload: Option<ResolvedTarget>,
    pub renderer: Option<ResolvedTarget>,
    /// Absolute path of the loaded config file.
    pub config_file: Option<PathBuf>,
    /// Files the config was built from.
    pub dependencies: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl ResolvedConfig {
    pub fn target(&self, kind: TargetKind) -> Option<&ResolvedTarget> {
        match kind {
            TargetKind::Main => self.main.as_ref(),
            TargetKind::Preload => self.preload.as_ref(),
            TargetKind::Renderer => self.renderer.as_ref(),
        }
    }

    pub fn target_mut(&mut self, kind: TargetKind) -> Option<&mut ResolvedTarget> {
        match kind {
            TargetKind::Main => self.main.as_mut(),
            TargetKind::Preload => self.preload.as_mut(),
            TargetKind::Renderer => self.renderer.as_mut(),
        }
    }

    /// Present targets in build order.
    pub fn targets(&self) -> impl Iterator<Item = &ResolvedTarget> {
        TargetKind::ALL.into_iter().filter_map(|kind| self.target(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.targets().next().is_none()
    }
}

/// Locates, evaluates and resolves the user config.
#[derive(Clone)]
pub struct ConfigResolver {
    evaluators: Vec<Arc<dyn ConfigEvaluator>>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self {
            evaluators: vec![Arc::new(StaticEvaluator), Arc::new(ScriptEvaluator::new())],
        }
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("evaluators", &self.evaluators.len())
            .finish()
    }
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the evaluators; the first one supporting a file is used.
    pub fn with_evaluators(evaluators: Vec<Arc<dyn ConfigEvaluator>>) -> Self {
        Self { evaluators }
    }

    pub async fn resolve(&self, inline: &InlineConfig, process: &ProcessContext) -> Result<ResolvedConfig> {
        let default_mode = process.phase.as_str();
        let mode = inline.mode().unwrap_or(default_mode).to_string();

        let discovery = ConfigDiscovery::new(&process.root);
        let Some(path) = discovery.locate(inline.config_file.as_deref())? else {
            tracing::debug!(root = %process.root.display(), "no config file found");
            return Ok(ResolvedConfig::default());
        };

        let env = ConfigEnv {
            mode: mode.clone(),
            command: process.command,
        };
        let (user, dependencies) = self.load(&path, &env).await.inspect_err(|_| {
            tracing::error!("failed to load config from {}", path.display());
        })?;

        let missing: Vec<&str> = [
            ("main", user.main.is_none()),
            ("renderer", user.renderer.is_none()),
            ("preload", user.preload.is_none()),
        ]
        .into_iter()
        .filter_map(|(slot, missing)| missing.then_some(slot))
        .collect();

        let mut resolved = ResolvedConfig {
            config_file: Some(path),
            dependencies,
            ..Default::default()
        };
        if !inline.ignore_config_warning && !missing.is_empty() {
            resolved
                .warnings
                .push(Warning::config(format!("{} config is missing", missing.join(" and "))));
        }

        let mut base: Option<PresetContext> = None;
        let slots = [
            (TargetKind::Main, user.main),
            (TargetKind::Preload, user.preload),
            (TargetKind::Renderer, user.renderer),
        ];
        for (kind, slot) in slots {
            let Some(slot) = slot else {
                continue;
            };
            let context = match &base {
                Some(ctx) => ctx.with_kind(kind),
                None => {
                    let ctx = PresetContext::for_target(kind, process)?;
                    base = Some(ctx.clone());
                    ctx
                }
            };

            let (target, warnings) = resolve_target(kind, slot, inline, &mode, context)?;
            resolved.warnings.extend(warnings);
            match kind {
                TargetKind::Main => resolved.main = Some(target),
                TargetKind::Preload => resolved.preload = Some(target),
                TargetKind::Renderer => resolved.renderer = Some(target),
            }
        }

        for warning in &resolved.warnings {
            tracing::warn!("{warning}");
        }
        Ok(resolved)
    }

    async fn load(&self, path: &Path, env: &ConfigEnv) -> Result<(UserConfig, Vec<PathBuf>)> {
        let evaluator = self
            .evaluators
            .iter()
            .find(|evaluator| evaluator.supports(path))
            .ok_or_else(|| {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
                ConfigError::UnsupportedFormat(ext.to_string())
            })?;

        let evaluated = evaluator.evaluate(path, env).await?;
        let user = UserConfig::from_value(evaluated.value)?;
        Ok((user, evaluated.dependencies))
    }
}

/// Resolve with the default evaluators.
pub async fn resolve_config(inline: &InlineConfig, process: &ProcessContext) -> Result<ResolvedConfig> {
    ConfigResolver::new().resolve(inline, process).await
}

fn resolve_target(
    kind: TargetKind,
    slot: TargetConfig,
    inline: &InlineConfig,
    mode: &str,
    context: PresetContext,
) -> Result<(ResolvedTarget, Vec<Warning>)> {
    let slot_mode = slot.mode.clone();
    let mut config = merge_targets(&slot, &inline.target.clone())?;
    config.mode = Some(
        inline
            .mode()
            .map(str::to_string)
            .or(slot_mode)
            .unwrap_or_else(|| mode.to_string()),
    );
    if let Some(out_dir) = inline.out_dir() {
        reset_out_dir(&mut config, out_dir, kind, &context.root);
    }

    let user_plugins = config
        .plugins
        .iter()
        .filter_map(|spec| from_spec(spec, &context).transpose())
        .collect::<Result<Vec<_>>>()?;
    let plugins = PluginSet::assemble(user_plugins, builtin_plugins(kind));

    for plugin in plugins.iter() {
        plugin.config(&mut config, &context)?;
    }
    apply_env_defines(&mut config, &context)?;

    let mut warnings = Vec::new();
    for plugin in plugins.iter() {
        warnings.extend(plugin.config_resolved(&config, &context)?);
    }

    tracing::debug!(target = %kind, plugins = ?plugins.names(), "resolved target");
    Ok((
        ResolvedTarget {
            kind,
            config,
            plugins,
            context,
        },
        warnings,
    ))
}

/// Point a shared `--outDir` at `<outDir>/<slot>` unless the slot chose its own.
fn reset_out_dir(config: &mut TargetConfig, out_dir: &Path, kind: TargetKind, root: &Path) {
    if config.out_dir().map(PathBuf::as_path) != Some(out_dir) {
        return;
    }
    let base = config
        .root
        .as_deref()
        .map(|dir| resolve_against(root, dir))
        .unwrap_or_else(|| root.to_path_buf());
    config.build_mut().out_dir = Some(resolve_against(&base, out_dir).join(kind.slot()));
}

/// Expose prefixed `.env` variables as `import.meta.env.*`; explicit `define`s win.
fn apply_env_defines(config: &mut TargetConfig, ctx: &PresetContext) -> Result<()> {
    let prefixes = config.env_prefixes();
    if prefixes.is_empty() {
        return Ok(());
    }

    let mode = config.mode.clone().unwrap_or_else(|| ctx.phase.as_str().to_string());
    let env_dir = config
        .env_dir
        .as_deref()
        .map(|dir| resolve_against(&ctx.root, dir))
        .unwrap_or_else(|| ctx.root.clone());

    let env = load_env(&mode, &env_dir, &prefixes)?;
    let mut define = env_defines(&env, &mode, ctx.phase == Phase::Development);
    if let Some(user) = config.define.take() {
        define.extend(user);
    }
    config.define = Some(define);
    Ok(())
}
