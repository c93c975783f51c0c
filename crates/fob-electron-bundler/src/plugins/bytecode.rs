//! V8 bytecode compilation of Node bundles.
//!
//! Selected chunks are compiled with the project's own Electron binary
//! (running as Node), written next to the bundle as `<file>c`, and loaded at
//! runtime through `bytecode-loader.cjs`, which registers the `.jsc`/`.cjsc`
//! extensions. Entry chunks become two-line stubs that require the loader
//! and then the compiled file.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use fob_electron_config::{OneOrMany, TargetConfig};
use parking_lot::Mutex;
use rolldown_plugin::__inner::SharedPluginable;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::util::{clean_url, to_relative_path};
use super::{BuildContext, Enforce, TargetPlugin};
use crate::engine::{AssetFile, ChunkFile, OutputFile, WrittenBundle};
use crate::error::{Error, Result};
use crate::presets::{PresetContext, Warning};
use crate::target::TargetKind;

/// File name of the emitted runtime loader.
pub const BYTECODE_LOADER: &str = "bytecode-loader.cjs";

const USE_STRICT: &str = "\"use strict\";";

const LOADER_LINES: &[&str] = &[
    r#""use strict";"#,
    r#"const fs = require("fs");"#,
    r#"const path = require("path");"#,
    r#"const vm = require("vm");"#,
    r#"const v8 = require("v8");"#,
    r#"const Module = require("module");"#,
    r#"v8.setFlagsFromString("--no-lazy");"#,
    r#"v8.setFlagsFromString("--no-flush-bytecode");"#,
    r#"const FLAG_HASH_OFFSET = 12;"#,
    r#"const SOURCE_HASH_OFFSET = 8;"#,
    r#"let dummyBytecode;"#,
    r#"function setFlagHashHeader(bytecodeBuffer) {"#,
    r#"  if (!dummyBytecode) {"#,
    r#"    const script = new vm.Script("", {"#,
    r#"      produceCachedData: true"#,
    r#"    });"#,
    r#"    dummyBytecode = script.createCachedData();"#,
    r#"  }"#,
    r#"  dummyBytecode.slice(FLAG_HASH_OFFSET, FLAG_HASH_OFFSET + 4).copy(bytecodeBuffer, FLAG_HASH_OFFSET);"#,
    r#"};"#,
    r#"function getSourceHashHeader(bytecodeBuffer) {"#,
    r#"  return bytecodeBuffer.slice(SOURCE_HASH_OFFSET, SOURCE_HASH_OFFSET + 4);"#,
    r#"};"#,
    r#"function buffer2Number(buffer) {"#,
    r#"  let ret = 0;"#,
    r#"  ret |= buffer[3] << 24;"#,
    r#"  ret |= buffer[2] << 16;"#,
    r#"  ret |= buffer[1] << 8;"#,
    r#"  ret |= buffer[0];"#,
    r#"  return ret;"#,
    r#"};"#,
    r#"Module._extensions[".jsc"] = Module._extensions[".cjsc"] = function (module, filename) {"#,
    r#"  const bytecodeBuffer = fs.readFileSync(filename);"#,
    r#"  if (!Buffer.isBuffer(bytecodeBuffer)) {"#,
    r#"    throw new Error("BytecodeBuffer must be a buffer object.");"#,
    r#"  }"#,
    r#"  setFlagHashHeader(bytecodeBuffer);"#,
    r#"  const length = buffer2Number(getSourceHashHeader(bytecodeBuffer));"#,
    r#"  let dummyCode = "";"#,
    r#"  if (length > 1) {"#,
    r#"    dummyCode = "\"" + "​".repeat(length - 2) + "\"";"#,
    r#"  }"#,
    r#"  const script = new vm.Script(dummyCode, {"#,
    r#"    filename: filename,"#,
    r#"    lineOffset: 0,"#,
    r#"    displayErrors: true,"#,
    r#"    cachedData: bytecodeBuffer"#,
    r#"  });"#,
    r#"  if (script.cachedDataRejected) {"#,
    r#"    throw new Error("Invalid or incompatible cached data (cachedDataRejected)");"#,
    r#"  }"#,
    r#"  const require = function (id) {"#,
    r#"    return module.require(id);"#,
    r#"  };"#,
    r#"  require.resolve = function (request, options) {"#,
    r#"    return Module._resolveFilename(request, module, false, options);"#,
    r#"  };"#,
    r#"  if (process.mainModule) {"#,
    r#"    require.main = process.mainModule;"#,
    r#"  }"#,
    r#"  require.extensions = Module._extensions;"#,
    r#"  require.cache = Module._cache;"#,
    r#"  const compiledWrapper = script.runInThisContext({"#,
    r#"    filename: filename,"#,
    r#"    lineOffset: 0,"#,
    r#"    columnOffset: 0,"#,
    r#"    displayErrors: true"#,
    r#"  });"#,
    r#"  const dirname = path.dirname(filename);"#,
    r#"  const args = [module.exports, require, module, filename, dirname, process, global];"#,
    r#"  return compiledWrapper.apply(module.exports, args);"#,
    r#"};"#,
];

/// Script run by Electron as Node: source on stdin, cached data on stdout.
const COMPILER_SCRIPT: &str = r#""use strict";
const vm = require("vm");
const v8 = require("v8");
const wrap = require("module").wrap;
v8.setFlagsFromString("--no-lazy");
v8.setFlagsFromString("--no-flush-bytecode");
let code = "";
process.stdin.setEncoding("utf-8");
process.stdin.on("data", data => {
  code += data;
});
process.stdin.on("end", () => {
  try {
    if (typeof code !== "string") {
      throw new Error("javascript code must be string.");
    }
    const script = new vm.Script(wrap(code), { produceCachedData: true });
    const bytecodeBuffer = script.createCachedData();
    process.stdout.write(bytecodeBuffer);
  } catch (error) {
    console.error(error);
    process.exitCode = 1;
  }
});
"#;

/// Source of `bytecode-loader.cjs`.
pub fn bytecode_loader_code() -> String {
    let mut code = LOADER_LINES.join("\n");
    code.push('\n');
    code
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytecodeOptions {
    /// Chunk names to compile. Empty means every chunk.
    #[serde(default)]
    pub chunk_alias: Option<OneOrMany<String>>,
    /// Delete the plain JS next to the compiled file. When `false` it is kept as `_<name>`.
    #[serde(default = "default_true", rename = "removeBundleJS")]
    pub remove_bundle_js: bool,
    /// String literals to hide from the compiled output.
    #[serde(default)]
    pub protected_strings: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for BytecodeOptions {
    fn default() -> Self {
        Self {
            chunk_alias: None,
            remove_bundle_js: true,
            protected_strings: Vec::new(),
        }
    }
}

/// Compiles Node bundles to V8 bytecode in production builds.
#[derive(Debug)]
pub struct BytecodePlugin {
    options: BytecodeOptions,
    /// `(file name, size)` of every compiled file, reported in `close_bundle`.
    compiled: Mutex<Vec<(String, usize)>>,
}

impl BytecodePlugin {
    pub fn new(options: BytecodeOptions) -> Self {
        Self {
            options,
            compiled: Mutex::default(),
        }
    }

    fn is_bytecode_chunk(&self, name: &str) -> bool {
        match &self.options.chunk_alias {
            None => true,
            Some(alias) if alias.is_empty() => true,
            Some(alias) => alias.as_slice().iter().any(|a| a == name),
        }
    }

    fn applies(ctx: &BuildContext) -> bool {
        ctx.kind != TargetKind::Renderer && !ctx.is_es()
    }

    fn bytecode_chunks<'a>(&self, chunks: impl Iterator<Item = &'a ChunkFile>) -> Vec<&'a ChunkFile> {
        chunks
            .filter(|chunk| self.is_bytecode_chunk(&chunk.name) && chunk.file_name != BYTECODE_LOADER)
            .collect()
    }

    async fn compile_all(
        &self,
        bundle: &WrittenBundle,
        executable: &Path,
        compiler: &Path,
    ) -> Result<()> {
        let chunks: Vec<&ChunkFile> = bundle.chunks().collect();
        let targets: FxHashSet<&str> = self
            .bytecode_chunks(chunks.iter().copied())
            .into_iter()
            .map(|chunk| chunk.file_name.as_str())
            .collect();
        let non_entry: Vec<String> = chunks
            .iter()
            .filter(|chunk| targets.contains(chunk.file_name.as_str()) && !chunk.is_entry)
            .map(|chunk| basename(&chunk.file_name).to_string())
            .collect();
        let by_file: FxHashMap<&str, &ChunkFile> = chunks
            .iter()
            .map(|chunk| (chunk.file_name.as_str(), *chunk))
            .collect();

        for chunk in &chunks {
            let path = bundle.path_of(&chunk.file_name);
            let code = rewrite_compiled_requires(&chunk.code, &non_entry)
                .unwrap_or_else(|| chunk.code.clone());

            if targets.contains(chunk.file_name.as_str()) {
                let bytecode = match compile(executable, compiler, &code).await {
                    Ok(bytecode) => bytecode,
                    Err(e) => {
                        tracing::error!(chunk = %chunk.file_name, "bytecode compilation failed: {e}");
                        continue;
                    }
                };
                let compiled_name = format!("{}c", chunk.file_name);
                write(&bundle.path_of(&compiled_name), &bytecode).await?;

                if !self.options.remove_bundle_js {
                    keep_bundle(&path).await?;
                } else if !chunk.is_entry {
                    tokio::fs::remove_file(&path)
                        .await
                        .map_err(|e| Error::io_at(&path, e))?;
                }
                if chunk.is_entry {
                    write(&path, entry_stub(&chunk.file_name).as_bytes()).await?;
                }

                self.compiled.lock().push((compiled_name, bytecode.len()));
            } else {
                let mut code = code;
                if chunk.is_entry && imports_any(chunk, &by_file, &targets) {
                    code = code.replacen(
                        USE_STRICT,
                        &format!("{USE_STRICT}\n{}", loader_require(&chunk.file_name)),
                        1,
                    );
                }
                if code != chunk.code {
                    write(&path, code.as_bytes()).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TargetPlugin for BytecodePlugin {
    fn name(&self) -> &'static str {
        "fob-electron:bytecode"
    }

    fn enforce(&self) -> Enforce {
        Enforce::Post
    }

    fn config_resolved(&self, config: &TargetConfig, ctx: &PresetContext) -> Result<Vec<Warning>> {
        let mut warnings = Vec::new();
        if ctx.kind == TargetKind::Renderer {
            warnings.push(Warning::new(ctx.kind, "bytecode plugin does not support renderer."));
        }
        let minify = config
            .build
            .as_ref()
            .and_then(|build| build.minify.as_ref())
            .is_some_and(|minify| minify.is_enabled());
        if minify && !self.options.protected_strings.is_empty() {
            warnings.push(Warning::new(
                ctx.kind,
                "Strings cannot be protected when minification is enabled.",
            ));
        }
        Ok(warnings)
    }

    fn engine_plugin(&self, ctx: &BuildContext) -> Option<SharedPluginable> {
        self.compiled.lock().clear();
        if ctx.minify || self.options.protected_strings.is_empty() || !Self::applies(ctx) {
            return None;
        }
        Some(Arc::new(ProtectStrings {
            strings: self.options.protected_strings.clone(),
        }))
    }

    fn generate_bundle(&self, bundle: &mut Vec<OutputFile>, ctx: &BuildContext) -> Result<()> {
        if ctx.kind == TargetKind::Renderer {
            return Ok(());
        }
        if ctx.is_es() {
            tracing::warn!(
                "bytecode plugin does not support ES module, please remove \"type\": \"module\" in package.json or set the \"build.rollupOptions.output.format\" option to \"cjs\"."
            );
            return Ok(());
        }
        let required = !self
            .bytecode_chunks(bundle.iter().filter_map(OutputFile::as_chunk))
            .is_empty();
        if required {
            bundle.push(OutputFile::Asset(AssetFile::new(
                BYTECODE_LOADER,
                bytecode_loader_code(),
            )));
        }
        Ok(())
    }

    async fn write_bundle(&self, bundle: &WrittenBundle, ctx: &BuildContext) -> Result<()> {
        if !Self::applies(ctx) || self.bytecode_chunks(bundle.chunks()).is_empty() {
            return Ok(());
        }

        let executable = match ctx.preset.runtime.executable() {
            Ok(executable) => executable,
            Err(e) => {
                tracing::error!("bytecode compilation skipped: {e}");
                return Ok(());
            }
        };

        let compiler = tempfile::Builder::new()
            .prefix("fob-electron-bytecode-")
            .suffix(".cjs")
            .tempfile()?;
        std::fs::write(compiler.path(), COMPILER_SCRIPT)?;

        self.compile_all(bundle, &executable, compiler.path()).await
    }

    fn close_bundle(&self, ctx: &BuildContext) {
        if !Self::applies(ctx) {
            return;
        }
        let compiled = std::mem::take(&mut *self.compiled.lock());
        tracing::info!("✓ {} bundles compiled into bytecode.", compiled.len());

        let out_dir = ctx.display_out_dir();
        let longest = compiled.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, size) in &compiled {
            let kb = *size as f64 / 1000.0;
            let line = format!("{out_dir}{name:<width$} {kb:.2} kB", width = longest + 2);
            if kb > f64::from(ctx.chunk_size_warning_limit) {
                tracing::warn!("{line}");
            } else {
                tracing::info!("{line}");
            }
        }
    }
}

fn basename(file_name: &str) -> &str {
    file_name.rsplit('/').next().unwrap_or(file_name)
}

fn loader_require(chunk_file_name: &str) -> String {
    format!(
        "require(\"{}\");",
        to_relative_path(BYTECODE_LOADER, chunk_file_name)
    )
}

/// Replacement body of a compiled entry chunk.
fn entry_stub(chunk_file_name: &str) -> String {
    format!(
        "{USE_STRICT}\n{}\nrequire(\"./{}c\");\n",
        loader_require(chunk_file_name),
        basename(chunk_file_name)
    )
}

/// Point `require()` calls at the compiled variant of `chunks` (`x.js` to `x.jsc`).
fn rewrite_compiled_requires(code: &str, chunks: &[String]) -> Option<String> {
    if chunks.is_empty() || !code.contains("require(") {
        return None;
    }

    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    let mut changed = false;

    while let Some(start) = rest.find("require(") {
        let arg_start = start + "require(".len();
        let arg_len = rest[arg_start..]
            .find(char::is_whitespace)
            .unwrap_or(rest.len() - arg_start);
        let arg = &rest[arg_start..arg_start + arg_len];

        // rightmost chunk name that is still followed by a closing paren
        let hit = chunks
            .iter()
            .filter_map(|name| {
                arg.rmatch_indices(name.as_str())
                    .map(|(i, _)| i + name.len())
                    .find(|end| arg[*end..].contains(')'))
            })
            .max();

        out.push_str(&rest[..arg_start]);
        match hit {
            Some(end) => {
                out.push_str(&arg[..end]);
                out.push('c');
                rest = &rest[arg_start + end..];
                changed = true;
            }
            None => rest = &rest[arg_start..],
        }
    }

    if !changed {
        return None;
    }
    out.push_str(rest);
    Some(out)
}

/// Whether `entry` reaches any of `targets` through static or dynamic imports.
fn imports_any(
    entry: &ChunkFile,
    by_file: &FxHashMap<&str, &ChunkFile>,
    targets: &FxHashSet<&str>,
) -> bool {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut queue: Vec<&str> = entry
        .imports
        .iter()
        .chain(&entry.dynamic_imports)
        .map(String::as_str)
        .collect();

    while let Some(file) = queue.pop() {
        if !seen.insert(file) {
            continue;
        }
        if targets.contains(file) {
            return true;
        }
        if let Some(chunk) = by_file.get(file) {
            queue.extend(chunk.imports.iter().chain(&chunk.dynamic_imports).map(String::as_str));
        }
    }
    false
}

async fn write(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io_at(path, e))
}

/// Keep the plain bundle as `_<name>` next to the compiled one.
async fn keep_bundle(path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| format!("_{}", name.to_string_lossy()))
        .unwrap_or_default();
    let kept: PathBuf = path.with_file_name(file_name);
    tokio::fs::rename(path, &kept)
        .await
        .map_err(|e| Error::io_at(path, e))
}

/// Compile `code` by piping it through the compiler script under Electron.
async fn compile(executable: &Path, compiler: &Path, code: &str) -> anyhow::Result<Vec<u8>> {
    let mut child = Command::new(executable)
        .arg(compiler)
        .env("ELECTRON_RUN_AS_NODE", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow::anyhow!("compiler stdin is not piped"))?;
    let input = code.as_bytes().to_vec();
    let writer = tokio::spawn(async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    });

    let output = child.wait_with_output().await?;
    writer.await??;

    if !output.stderr.is_empty() {
        tracing::error!("Error: {}", String::from_utf8_lossy(&output.stderr));
    }
    if !output.status.success() {
        anyhow::bail!("compiler exited with {}", output.status);
    }
    if output.stdout.is_empty() {
        anyhow::bail!("compiler produced no output");
    }
    Ok(output.stdout)
}

/// Replaces protected string literals with `String.fromCharCode(...)`.
#[derive(Debug)]
struct ProtectStrings {
    strings: Vec<String>,
}

fn is_protectable_id(id: &str) -> bool {
    let path = clean_url(id);
    [".js", ".mjs", ".ts", ".mts", ".jsx", ".tsx"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

fn char_codes(value: &str) -> String {
    let codes: Vec<String> = value.encode_utf16().map(|unit| unit.to_string()).collect();
    format!("String.fromCharCode({})", codes.join(","))
}

/// Replace `'value'` and `"value"` literals of every protected string.
fn protect_strings(code: &str, strings: &[String]) -> Option<String> {
    let mut result = Cow::Borrowed(code);
    for value in strings {
        let replacement = char_codes(value);
        for quote in ['\'', '"'] {
            let literal = format!("{quote}{value}{quote}");
            if result.contains(&literal) {
                result = Cow::Owned(result.replace(&literal, &replacement));
            }
        }
    }
    match result {
        Cow::Owned(code) => Some(code),
        Cow::Borrowed(_) => None,
    }
}

impl Plugin for ProtectStrings {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:bytecode-strings")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let protected = is_protectable_id(args.id)
            .then(|| protect_strings(args.code, &self.strings))
            .flatten();

        async move {
            Ok(protected.map(|code| HookTransformOutput {
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
    use crate::presets::test_support::context;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn chunk(file_name: &str, name: &str, is_entry: bool, code: &str) -> ChunkFile {
        ChunkFile {
            file_name: file_name.into(),
            name: name.into(),
            is_entry,
            code: code.into(),
            ..Default::default()
        }
    }

    #[test]
    fn options_default_to_removing_the_plain_bundle() {
        let options: BytecodeOptions = serde_json::from_value(json!({})).unwrap();
        assert!(options.remove_bundle_js);
        let options: BytecodeOptions = serde_json::from_value(json!({
            "chunkAlias": "index",
            "removeBundleJS": false,
            "protectedStrings": ["secret"]
        }))
        .unwrap();
        assert_eq!(options.chunk_alias, Some(OneOrMany::One("index".to_string())));
        assert!(!options.remove_bundle_js);
    }

    #[test]
    fn chunk_alias_selects_chunks() {
        let all = BytecodePlugin::new(BytecodeOptions::default());
        assert!(all.is_bytecode_chunk("anything"));

        let some = BytecodePlugin::new(BytecodeOptions {
            chunk_alias: Some(OneOrMany::Many(vec!["index".into()])),
            ..Default::default()
        });
        assert!(some.is_bytecode_chunk("index"));
        assert!(!some.is_bytecode_chunk("vendor"));
    }

    #[test]
    fn entry_stub_requires_loader_then_compiled_file() {
        assert_eq!(
            entry_stub("index.js"),
            "\"use strict\";\nrequire(\"./bytecode-loader.cjs\");\nrequire(\"./index.jsc\");\n"
        );
        assert_eq!(
            entry_stub("nested/worker.js"),
            "\"use strict\";\nrequire(\"../bytecode-loader.cjs\");\nrequire(\"./worker.jsc\");\n"
        );
    }

    #[test]
    fn requires_of_compiled_chunks_point_at_bytecode() {
        let code = "const a = require(\"./chunks/shared-abc.js\");\nconst b = require('fs');\nrequire('./chunks/other.js')";
        let rewritten =
            rewrite_compiled_requires(code, &["shared-abc.js".to_string()]).unwrap();
        assert_eq!(
            rewritten,
            "const a = require(\"./chunks/shared-abc.jsc\");\nconst b = require('fs');\nrequire('./chunks/other.js')"
        );
        assert!(rewrite_compiled_requires(code, &["missing.js".to_string()]).is_none());
        assert!(rewrite_compiled_requires(code, &[]).is_none());
    }

    #[test]
    fn loader_code_registers_extensions() {
        let code = bytecode_loader_code();
        assert!(code.starts_with("\"use strict\";\n"));
        assert!(code.contains("Module._extensions[\".jsc\"] = Module._extensions[\".cjsc\"]"));
        assert!(code.contains(r#"dummyCode = "\"" + "​".repeat(length - 2) + "\"";"#));
        assert!(code.ends_with("};\n"));
    }

    #[test]
    fn protected_strings_become_char_codes() {
        let code = "const key = 'ab'; const other = \"ab\"; const keep = `ab`;";
        let protected = protect_strings(code, &["ab".to_string()]).unwrap();
        assert_eq!(
            protected,
            "const key = String.fromCharCode(97,98); const other = String.fromCharCode(97,98); const keep = `ab`;"
        );
        assert!(protect_strings("nothing", &["ab".to_string()]).is_none());
        assert!(is_protectable_id("/app/src/main/index.ts"));
        assert!(!is_protectable_id("/app/src/main/index.cjs"));
    }

    #[test]
    fn transitive_imports_are_followed() {
        let entry = ChunkFile {
            imports: vec!["chunks/a.js".into()],
            ..chunk("index.js", "index", true, "")
        };
        let a = ChunkFile {
            dynamic_imports: vec!["chunks/b.js".into()],
            ..chunk("chunks/a.js", "a", false, "")
        };
        let b = chunk("chunks/b.js", "b", false, "");
        let by_file: FxHashMap<&str, &ChunkFile> =
            [("index.js", &entry), ("chunks/a.js", &a), ("chunks/b.js", &b)]
                .into_iter()
                .collect();

        let targets: FxHashSet<&str> = ["chunks/b.js"].into_iter().collect();
        assert!(imports_any(&entry, &by_file, &targets));
        let targets: FxHashSet<&str> = ["other.js"].into_iter().collect();
        assert!(!imports_any(&entry, &by_file, &targets));
    }

    #[test]
    fn loader_is_emitted_only_for_cjs_node_targets() {
        let dir = TempDir::new().unwrap();
        let plugin = BytecodePlugin::new(BytecodeOptions::default());

        let preset = context(TargetKind::Main, dir.path(), Some(31), false);
        let build = BuildContext::new(&TargetConfig::default(), &preset);
        let mut bundle = vec![OutputFile::Chunk(chunk("index.js", "index", true, ""))];
        plugin.generate_bundle(&mut bundle, &build).unwrap();
        assert_eq!(bundle.last().unwrap().file_name(), BYTECODE_LOADER);

        let preset = context(TargetKind::Main, dir.path(), Some(31), true);
        let build = BuildContext::new(&TargetConfig::default(), &preset);
        let mut bundle = vec![OutputFile::Chunk(chunk("index.js", "index", true, ""))];
        plugin.generate_bundle(&mut bundle, &build).unwrap();
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn renderer_and_minify_warnings() {
        let dir = TempDir::new().unwrap();
        let plugin = BytecodePlugin::new(BytecodeOptions {
            protected_strings: vec!["secret".into()],
            ..Default::default()
        });

        let ctx = context(TargetKind::Renderer, dir.path(), Some(31), false);
        let warnings = plugin.config_resolved(&TargetConfig::default(), &ctx).unwrap();
        assert_eq!(warnings[0].message, "bytecode plugin does not support renderer.");

        let ctx = context(TargetKind::Main, dir.path(), Some(31), false);
        let config = TargetConfig::from_value(json!({ "build": { "minify": true } })).unwrap();
        let warnings = plugin.config_resolved(&config, &ctx).unwrap();
        assert_eq!(
            warnings[0].message,
            "Strings cannot be protected when minification is enabled."
        );
    }

    #[tokio::test]
    async fn missing_runtime_leaves_bundle_untouched() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out/main");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("index.js"), "\"use strict\";\nconsole.log(1);\n").unwrap();

        let preset = context(TargetKind::Main, dir.path(), None, false);
        let build = BuildContext::new(&TargetConfig::default(), &preset);
        let bundle = WrittenBundle {
            out_dir: out.clone(),
            files: vec![OutputFile::Chunk(chunk(
                "index.js",
                "index",
                true,
                "\"use strict\";\nconsole.log(1);\n",
            ))],
        };

        let plugin = BytecodePlugin::new(BytecodeOptions::default());
        plugin.write_bundle(&bundle, &build).await.unwrap();
        assert!(!out.join("index.jsc").exists());
        assert_eq!(
            fs::read_to_string(out.join("index.js")).unwrap(),
            "\"use strict\";\nconsole.log(1);\n"
        );
    }
}
