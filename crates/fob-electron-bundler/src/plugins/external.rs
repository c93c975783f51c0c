use std::borrow::Cow;

use fob_electron_config::ExternalPattern;
use regex::Regex;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::target::TargetKind;

/// Marks `build.rollupOptions.external` matches as external.
///
/// Exact ids and `{ "$regex": ... }` patterns are matched against the import
/// specifier as written.
#[derive(Debug, Default)]
pub struct ExternalPlugin {
    exact: FxHashSet<String>,
    patterns: Vec<Regex>,
}

impl ExternalPlugin {
    pub fn new(target: TargetKind, patterns: &[ExternalPattern]) -> Result<Self> {
        let mut plugin = Self::default();
        for pattern in patterns {
            match pattern {
                ExternalPattern::Exact(id) => {
                    plugin.exact.insert(id.clone());
                }
                ExternalPattern::Regex { regex } => {
                    let compiled = Regex::new(regex).map_err(|e| {
                        Error::invalid(target, format!("invalid external pattern /{regex}/: {e}"))
                    })?;
                    plugin.patterns.push(compiled);
                }
            }
        }
        Ok(plugin)
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    pub fn is_external(&self, specifier: &str) -> bool {
        self.exact.contains(specifier) || self.patterns.iter().any(|re| re.is_match(specifier))
    }
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:external")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let external = self
            .is_external(args.specifier)
            .then(|| args.specifier.to_string());

        async move {
            Ok(external.map(|id| HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}
