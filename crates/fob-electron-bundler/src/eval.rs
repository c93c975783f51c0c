//! Evaluation of script configs (`.js`, `.ts`, `.mjs`, ...).
//!
//! The config file is bundled with rolldown, written to a throwaway file next
//! to the original and imported by a short-lived `node` process that prints
//! the resolved object as JSON. The throwaway file is removed as soon as the
//! process exits, so every evaluation sees the current source.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fob_electron_config::discovery::{ConfigFormat, config_format};
use fob_electron_config::{ConfigEnv, ConfigError, ConfigEvaluator, EvaluatedConfig};
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform};
use rolldown_common::{Output, ResolvedExternal};
use rolldown_plugin::__inner::SharedPluginable;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookTransformArgs,
    HookTransformOutput, HookTransformReturn, HookUsage, Plugin, PluginContext,
    SharedTransformPluginContext,
};
use serde_json::Value;

use crate::error::Error;
use crate::plugins::util::{is_script_id, js_string};

const DIRNAME_VAR: &str = "__fob_electron_injected_dirname";
const FILENAME_VAR: &str = "__fob_electron_injected_filename";
const IMPORT_META_URL_VAR: &str = "__fob_electron_injected_import_meta_url";

/// Separates the config JSON from anything the config itself printed.
const RESULT_MARKER: &str = "__FOB_ELECTRON_CONFIG__";
const MARKER_ENV: &str = "FOB_ELECTRON_CONFIG_MARKER";

const DRIVER: &str = r#"import { pathToFileURL } from "node:url";

const env = JSON.parse(process.env.FOB_ELECTRON_CONFIG_ENV);
const mod = await import(pathToFileURL(process.env.FOB_ELECTRON_CONFIG_FILE).href);

let config = mod.default;
if (config && config.__esModule) config = config.default;
if (typeof config === "function") config = await config(env);
config = await config;

if (config && typeof config === "object") {
  for (const slot of ["main", "preload", "renderer"]) {
    if (typeof config[slot] === "function") config[slot] = await config[slot](env);
    else if (config[slot]) config[slot] = await config[slot];
  }
}

const json = JSON.stringify(config ?? null, (_key, value) =>
  value instanceof RegExp ? { $regex: value.source } : value
);
process.stdout.write("\n" + process.env.FOB_ELECTRON_CONFIG_MARKER + json);
"#;

/// Evaluates script configs through rolldown and a `node` subprocess.
#[derive(Debug, Clone)]
pub struct ScriptEvaluator {
    node: PathBuf,
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self {
            node: PathBuf::from("node"),
        }
    }
}

impl ScriptEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `node` executable.
    pub fn with_node(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = node.into();
        self
    }

    async fn bundle(&self, path: &Path, esm: bool) -> Result<(String, Vec<PathBuf>), ConfigError> {
        let cwd = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let options = BundlerOptions {
            input: Some(vec![InputItem {
                name: Some("config".to_string()),
                import: path.to_string_lossy().into_owned(),
            }]),
            cwd: Some(cwd),
            format: Some(if esm { OutputFormat::Esm } else { OutputFormat::Cjs }),
            platform: Some(Platform::Node),
            define: Some(vec![
                ("__dirname".to_string(), DIRNAME_VAR.to_string()),
                ("__filename".to_string(), FILENAME_VAR.to_string()),
                ("import.meta.url".to_string(), IMPORT_META_URL_VAR.to_string()),
            ]
            .into_iter()
            .collect()),
            ..Default::default()
        };

        let failed = |message: String| ConfigError::EvaluationFailed {
            path: path.to_path_buf(),
            message,
        };

        let plugins: Vec<SharedPluginable> =
            vec![Arc::new(ExternalizeBareImports), Arc::new(InjectFileGlobals)];
        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| failed(Error::from_rolldown_batch(&e).to_string()))?;
        let bundle = bundler
            .generate()
            .await
            .map_err(|e| failed(Error::from_rolldown_batch(&e).to_string()))?;

        let entry = bundle
            .assets
            .iter()
            .find_map(|output| match output {
                Output::Chunk(chunk) if chunk.is_entry => Some(chunk),
                _ => None,
            })
            .ok_or_else(|| failed("bundling produced no entry chunk".to_string()))?;

        let dependencies = entry
            .module_ids
            .iter()
            .map(|id| id.to_string())
            .filter(|id| !id.starts_with('\0') && Path::new(id).is_absolute())
            .map(PathBuf::from)
            .collect();

        Ok((entry.code.clone(), dependencies))
    }

    async fn run(&self, path: &Path, code: &str, esm: bool, env: &ConfigEnv) -> Result<Value, ConfigError> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let failed = |message: String| ConfigError::EvaluationFailed {
            path: path.to_path_buf(),
            message,
        };

        let bundled = tempfile::Builder::new()
            .prefix("electron.fob.config.")
            .suffix(if esm { ".mjs" } else { ".cjs" })
            .tempfile_in(dir)?;
        std::fs::write(bundled.path(), code)?;

        let output = tokio::process::Command::new(&self.node)
            .arg("--input-type=module")
            .arg("-e")
            .arg(DRIVER)
            .env("FOB_ELECTRON_CONFIG_FILE", bundled.path())
            .env("FOB_ELECTRON_CONFIG_ENV", serde_json::to_string(env)?)
            .env(MARKER_ENV, RESULT_MARKER)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| failed(format!("cannot run {}: {e}", self.node.display())))?;

        // Evict the bundled copy before looking at the result.
        drop(bundled);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_result(&stdout).map_err(failed)
    }
}

#[async_trait]
impl ConfigEvaluator for ScriptEvaluator {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| fob_electron_config::discovery::SCRIPT_EXTENSIONS.contains(&ext))
    }

    async fn evaluate(&self, path: &Path, env: &ConfigEnv) -> fob_electron_config::Result<EvaluatedConfig> {
        let root = path.parent().unwrap_or(Path::new("."));
        let esm = match config_format(path, root)? {
            ConfigFormat::Script { esm } => esm,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        let (code, dependencies) = self.bundle(path, esm).await?;
        let value = self.run(path, &code, esm, env).await?;
        Ok(EvaluatedConfig {
            value,
            dependencies,
        })
    }
}

/// Config JSON printed after the last marker.
fn parse_result(stdout: &str) -> Result<Value, String> {
    let Some((_, json)) = stdout.rsplit_once(RESULT_MARKER) else {
        return Err("config evaluation printed no result".to_string());
    };
    serde_json::from_str(json.trim()).map_err(|e| e.to_string())
}

fn file_url(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let encoded = normalized.replace('%', "%25").replace(' ', "%20").replace('#', "%23");
    if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}

/// Leaves every bare import to the runtime.
#[derive(Debug)]
struct ExternalizeBareImports;

impl Plugin for ExternalizeBareImports {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:config-externals")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier;
        let bare = args.importer.is_some()
            && !specifier.starts_with('.')
            && !Path::new(specifier).is_absolute();
        let external = bare.then(|| specifier.to_string());

        async move {
            Ok(external.map(|id| HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}

/// Declares the per-module values that `__dirname`, `__filename` and
/// `import.meta.url` are replaced with.
#[derive(Debug)]
struct InjectFileGlobals;

impl Plugin for InjectFileGlobals {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:config-globals")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let code = is_script_id(args.id).then(|| {
            let id = args.id;
            let dir = Path::new(id)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!(
                "const {DIRNAME_VAR} = {};const {FILENAME_VAR} = {};const {IMPORT_META_URL_VAR} = {};{}",
                js_string(&dir),
                js_string(id),
                js_string(&file_url(id)),
                args.code
            )
        });

        async move {
            Ok(code.map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_follows_the_last_marker() {
        let stdout = format!("hello from config\n{RESULT_MARKER}{{\"main\":{{}}}}");
        assert_eq!(parse_result(&stdout).unwrap(), json!({ "main": {} }));
        assert!(parse_result("no marker").is_err());
    }

    #[test]
    fn file_urls() {
        assert_eq!(file_url("/app/my config.ts"), "file:///app/my%20config.ts");
        assert_eq!(file_url("C:\\app\\c.ts"), "file:///C:/app/c.ts");
    }

    #[test]
    fn supports_script_extensions_only() {
        let evaluator = ScriptEvaluator::new();
        assert!(evaluator.supports(Path::new("electron.fob.config.ts")));
        assert!(evaluator.supports(Path::new("electron.fob.config.cjs")));
        assert!(!evaluator.supports(Path::new("electron.fob.config.json")));
    }

    #[test]
    fn driver_prints_the_marker_it_is_given() {
        assert!(DRIVER.contains(&format!("process.env.{MARKER_ENV}")));
        assert!(!DRIVER.contains(RESULT_MARKER));
    }
}
