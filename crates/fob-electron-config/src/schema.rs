//! Typed per-target configuration.
//!
//! Each of the `main`, `preload` and `renderer` slots of a user config
//! deserializes into a [`TargetConfig`]. Every field is optional so that a
//! serialized config only carries what was actually set, which is what the
//! merge step relies on. Keys the orchestrator does not model are kept in
//! `extra` and passed through untouched.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// A value that may be written as a single item or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        OneOrMany::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(value: Vec<T>) -> Self {
        OneOrMany::Many(value)
    }
}

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[serde(alias = "esm", alias = "module")]
    Es,
    #[serde(alias = "commonjs")]
    Cjs,
    Iife,
    Umd,
    Amd,
    System,
}

impl ModuleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Es => "es",
            ModuleFormat::Cjs => "cjs",
            ModuleFormat::Iife => "iife",
            ModuleFormat::Umd => "umd",
            ModuleFormat::Amd => "amd",
            ModuleFormat::System => "system",
        }
    }
}

impl std::fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry points: a path, a list of paths, or named entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputOption {
    Single(String),
    Many(Vec<String>),
    Named(IndexMap<String, String>),
}

impl InputOption {
    /// Named entries; unnamed ones are keyed by their file stem.
    pub fn entries(&self) -> Vec<(String, String)> {
        match self {
            InputOption::Single(path) => vec![(stem_of(path), path.clone())],
            InputOption::Many(paths) => paths.iter().map(|p| (stem_of(p), p.clone())).collect(),
            InputOption::Named(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            InputOption::Single(path) => path.is_empty(),
            InputOption::Many(paths) => paths.is_empty(),
            InputOption::Named(map) => map.is_empty(),
        }
    }
}

fn stem_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// An externalized module: an exact id or a regular expression source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalPattern {
    Exact(String),
    Regex {
        #[serde(rename = "$regex")]
        regex: String,
    },
}

impl ExternalPattern {
    pub fn regex(source: impl Into<String>) -> Self {
        ExternalPattern::Regex {
            regex: source.into(),
        }
    }
}

/// `boolean | string` options such as `minify` or `sourcemap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toggle {
    Enabled(bool),
    Named(String),
}

impl Toggle {
    pub fn is_enabled(&self) -> bool {
        match self {
            Toggle::Enabled(on) => *on,
            Toggle::Named(name) => !name.is_empty() && name != "false",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulePreloadOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyfill: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModulePreload {
    Enabled(bool),
    Options(ModulePreloadOptions),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoExternal {
    All(bool),
    List(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ModuleFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_file_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_file_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_file_names: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<OneOrMany<ExternalPattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OneOrMany<OutputOptions>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<InputOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<ModuleFormat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<OneOrMany<String>>,
}

/// The `build` section of a target config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_compressed_size: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_public_dir: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_preload: Option<ModulePreload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssr: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssr_emit_assets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_out_dir: Option<bool>,
    /// `Some` enables watch mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib: Option<LibOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_options: Option<RollupOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size_warning_limit: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildOptions {
    pub fn rollup_options_mut(&mut self) -> &mut RollupOptions {
        self.rollup_options.get_or_insert_with(Default::default)
    }

    /// Configured input, if any.
    pub fn input(&self) -> Option<&InputOption> {
        self.rollup_options
            .as_ref()
            .and_then(|r| r.input.as_ref())
            .filter(|input| !input.is_empty())
    }

    pub fn lib_entry(&self) -> Option<&InputOption> {
        self.lib
            .as_ref()
            .and_then(|lib| lib.entry.as_ref())
            .filter(|entry| !entry.is_empty())
    }

    /// Output option sets as the engine will see them.
    ///
    /// In library mode a single output object is expanded once per listed
    /// format. An empty result means nothing was configured.
    pub fn resolved_outputs(&self) -> Vec<OutputOptions> {
        let output = self.rollup_options.as_ref().and_then(|r| r.output.as_ref());

        match (&self.lib, output) {
            (Some(lib), None | Some(OneOrMany::One(_))) => {
                let base = output
                    .and_then(|o| o.as_slice().first().cloned())
                    .unwrap_or_default();
                lib.formats
                    .iter()
                    .flatten()
                    .map(|format| OutputOptions {
                        format: Some(*format),
                        ..base.clone()
                    })
                    .collect()
            }
            (_, Some(output)) => output.as_slice().to_vec(),
            (None, None) => Vec::new(),
        }
    }

    pub fn targets(&self) -> &[String] {
        self.target.as_ref().map(OneOrMany::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `host` accepts `true` (all interfaces) or an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostOption {
    All(bool),
    Address(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_port: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_external: Option<NoExternal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A declarative plugin reference, e.g. `{ "name": "bytecode", "options": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// Configuration for a single build target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_prefix: Option<OneOrMany<String>>,
    /// Compile-time replacements, values are JS expressions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub define: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve: Option<ResolveOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssr: Option<SsrOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn build(&self) -> Option<&BuildOptions> {
        self.build.as_ref()
    }

    pub fn build_mut(&mut self) -> &mut BuildOptions {
        self.build.get_or_insert_with(Default::default)
    }

    pub fn out_dir(&self) -> Option<&PathBuf> {
        self.build.as_ref().and_then(|b| b.out_dir.as_ref())
    }

    pub fn is_watch(&self) -> bool {
        self.build.as_ref().is_some_and(|b| b.watch.is_some())
    }

    pub fn env_prefixes(&self) -> Vec<String> {
        self.env_prefix
            .as_ref()
            .map(|p| p.as_slice().to_vec())
            .unwrap_or_default()
    }
}

/// The three slots of a user config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserConfig {
    pub main: Option<TargetConfig>,
    pub preload: Option<TargetConfig>,
    pub renderer: Option<TargetConfig>,
}

impl UserConfig {
    /// Validate the shape of an evaluated config and split it into slots.
    ///
    /// `null` or absent slots are treated as missing.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let mut slot = |name: &str| -> Result<Option<TargetConfig>> {
            match map.remove(name) {
                None | Some(Value::Null) => Ok(None),
                Some(value @ Value::Object(_)) => TargetConfig::from_value(value)
                    .map(Some)
                    .map_err(|e| match e {
                        ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
                            field: name.to_string(),
                            message,
                        },
                        other => other,
                    }),
                Some(_) => Err(ConfigError::SlotNotAnObject(name.to_string())),
            }
        };

        Ok(Self {
            main: slot("main")?,
            preload: slot("preload")?,
            renderer: slot("renderer")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_fields_are_not_serialized() {
        let config = TargetConfig::default();
        assert_eq!(config.to_value().unwrap(), json!({}));
    }

    #[test]
    fn unknown_keys_round_trip_through_extra() {
        let value = json!({ "css": { "devSourcemap": true }, "build": { "outDir": "dist" } });
        let config = TargetConfig::from_value(value.clone()).unwrap();
        assert_eq!(config.out_dir(), Some(&PathBuf::from("dist")));
        assert!(config.extra.contains_key("css"));
        assert_eq!(config.to_value().unwrap(), value);
    }

    #[test]
    fn format_aliases() {
        let output: OutputOptions = serde_json::from_value(json!({ "format": "esm" })).unwrap();
        assert_eq!(output.format, Some(ModuleFormat::Es));
        let output: OutputOptions =
            serde_json::from_value(json!({ "format": "commonjs" })).unwrap();
        assert_eq!(output.format, Some(ModuleFormat::Cjs));
    }

    #[test]
    fn regex_externals_deserialize() {
        let rollup: RollupOptions = serde_json::from_value(json!({
            "external": ["electron", { "$regex": "^electron/.+" }]
        }))
        .unwrap();
        let external = rollup.external.unwrap();
        assert_eq!(
            external.as_slice(),
            &[
                ExternalPattern::Exact("electron".into()),
                ExternalPattern::regex("^electron/.+"),
            ]
        );
    }

    #[test]
    fn lib_formats_expand_into_outputs() {
        let build: BuildOptions = serde_json::from_value(json!({
            "lib": { "entry": "src/main/index.ts", "formats": ["es", "cjs"] }
        }))
        .unwrap();
        let outputs = build.resolved_outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].format, Some(ModuleFormat::Es));
        assert_eq!(outputs[1].format, Some(ModuleFormat::Cjs));
    }

    #[test]
    fn input_entries_are_named_by_stem() {
        let input = InputOption::Many(vec!["src/preload/index.ts".into(), "src/preload/extra.ts".into()]);
        assert_eq!(
            input.entries(),
            vec![
                ("index".to_string(), "src/preload/index.ts".to_string()),
                ("extra".to_string(), "src/preload/extra.ts".to_string()),
            ]
        );
    }

    #[test]
    fn user_config_rejects_non_objects() {
        assert!(matches!(
            UserConfig::from_value(json!([1, 2])),
            Err(ConfigError::NotAnObject)
        ));
        let err = UserConfig::from_value(json!({ "main": "nope" })).unwrap_err();
        assert_eq!(err.to_string(), "main config must export or return an object");
    }

    #[test]
    fn user_config_null_slots_are_missing() {
        let config = UserConfig::from_value(json!({ "main": null, "renderer": {} })).unwrap();
        assert!(config.main.is_none());
        assert!(config.preload.is_none());
        assert_eq!(config.renderer, Some(TargetConfig::default()));
    }
}
