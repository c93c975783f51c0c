use async_trait::async_trait;
use fob_electron_config::{ExternalPattern, OneOrMany, PackageData, TargetConfig, merge_targets};
use serde::Deserialize;

use super::{Enforce, TargetPlugin};
use crate::presets::PresetContext;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalizeDepsOptions {
    /// Extra ids to externalize.
    #[serde(default)]
    pub include: Vec<String>,
    /// Dependencies to bundle anyway.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Leaves `package.json` dependencies out of Node bundles.
///
/// Every dependency becomes an exact external, plus one pattern for deep
/// imports such as `lodash/merge`.
#[derive(Debug, Clone, Default)]
pub struct ExternalizeDepsPlugin {
    deps: Vec<String>,
}

impl ExternalizeDepsPlugin {
    pub fn new(options: ExternalizeDepsOptions, package: Option<&PackageData>) -> Self {
        let mut deps: Vec<String> = package
            .map(|pkg| pkg.dependencies.keys().cloned().collect())
            .unwrap_or_default();

        for id in options.include {
            let id = id.trim();
            if !id.is_empty() && !deps.iter().any(|dep| dep == id) {
                deps.push(id.to_string());
            }
        }
        deps.retain(|dep| !options.exclude.contains(dep));

        Self { deps }
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    fn externals(&self) -> Vec<ExternalPattern> {
        if self.deps.is_empty() {
            return Vec::new();
        }
        let mut externals: Vec<ExternalPattern> =
            self.deps.iter().cloned().map(ExternalPattern::Exact).collect();
        let alternatives = self
            .deps
            .iter()
            .map(|dep| regex::escape(dep))
            .collect::<Vec<_>>()
            .join("|");
        externals.push(ExternalPattern::regex(format!("^({alternatives})/.+")));
        externals
    }
}

#[async_trait]
impl TargetPlugin for ExternalizeDepsPlugin {
    fn name(&self) -> &'static str {
        "fob-electron:externalize-deps"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Pre
    }

    fn config(&self, config: &mut TargetConfig, _ctx: &PresetContext) -> Result<()> {
        let externals = self.externals();
        if externals.is_empty() {
            return Ok(());
        }

        let mut defaults = TargetConfig::default();
        defaults.build_mut().rollup_options_mut().external = Some(OneOrMany::Many(externals));
        *config = merge_targets(&defaults, config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::test_support::context;
    use crate::target::TargetKind;
    use indexmap::IndexMap;
    use serde_json::json;
    use tempfile::TempDir;

    fn package(deps: &[&str]) -> PackageData {
        PackageData {
            dependencies: deps
                .iter()
                .map(|d| (d.to_string(), "^1.0.0".to_string()))
                .collect::<IndexMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn include_and_exclude_adjust_the_dependency_list() {
        let options = ExternalizeDepsOptions {
            include: vec!["extra".into(), "  ".into(), "lodash".into()],
            exclude: vec!["electron-store".into()],
        };
        let plugin = ExternalizeDepsPlugin::new(options, Some(&package(&["lodash", "electron-store"])));
        assert_eq!(plugin.deps(), ["lodash".to_string(), "extra".to_string()]);
    }

    #[test]
    fn defaults_come_before_user_externals() {
        let dir = TempDir::new().unwrap();
        let ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        let plugin =
            ExternalizeDepsPlugin::new(ExternalizeDepsOptions::default(), Some(&package(&["@acme/ui", "lodash"])));

        let mut config = TargetConfig::from_value(json!({
            "build": { "rollupOptions": { "external": ["sharp"] } }
        }))
        .unwrap();
        plugin.config(&mut config, &ctx).unwrap();

        let external = config.build.unwrap().rollup_options.unwrap().external.unwrap();
        assert_eq!(
            external.as_slice(),
            [
                ExternalPattern::Exact("@acme/ui".into()),
                ExternalPattern::Exact("lodash".into()),
                ExternalPattern::regex("^(@acme/ui|lodash)/.+"),
                ExternalPattern::Exact("sharp".into()),
            ]
        );
    }

    #[test]
    fn no_dependencies_leaves_config_untouched() {
        let dir = TempDir::new().unwrap();
        let ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        let plugin = ExternalizeDepsPlugin::new(ExternalizeDepsOptions::default(), None);
        let mut config = TargetConfig::default();
        plugin.config(&mut config, &ctx).unwrap();
        assert_eq!(config, TargetConfig::default());
    }
}
