//! Static assets, native addons and wasm for Node targets.
//!
//! - `import icon from './icon.png?asset'` resolves to an absolute path at
//!   runtime (`?asset&asarUnpack` points into `app.asar.unpacked`).
//! - `import addon from './addon.node'` requires the emitted addon.
//! - `import init from './lib.wasm?loader'` yields an instantiation helper.
//!
//! Files inside the public directory are not emitted; chunks reference them
//! relative to where the chunk lands.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rolldown_common::{EmittedAsset, ModuleType, ResolvedExternal};
use rolldown_plugin::__inner::SharedPluginable;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use rustc_hash::FxHashMap;

use super::util::{
    clean_url, get_hash, js_string, parse_request, replace_markers, resolve_from_importer,
    to_relative_path,
};
use super::{BuildContext, RenderContext, TargetPlugin};
use crate::engine::ChunkFile;
use crate::error::Result;

const ASSET_MARKER: &str = "__FOB_NODE_ASSET__";
const PUBLIC_ASSET_MARKER: &str = "__FOB_NODE_PUBLIC_ASSET__";
const WASM_HELPER_ID: &str = "\0__fob-electron-wasm-helper";

const WASM_HELPER_CODE: &str = r#"
import { join } from 'path'
import { readFile } from 'fs/promises'

export default async function loadWasm(file, importObject = {}) {
  const wasmBuffer = await readFile(join(__dirname, file))
  const result = await WebAssembly.instantiate(wasmBuffer, importObject)
  return result.instance
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Asset { asar_unpack: bool },
    Native,
    Wasm,
}

/// What kind of asset `id` imports, if any.
fn classify(id: &str) -> Option<AssetKind> {
    let query = parse_request(id);
    if let Some(query) = &query {
        if query.contains_key("asset") {
            return Some(AssetKind::Asset {
                asar_unpack: query.contains_key("asarUnpack"),
            });
        }
    }
    if clean_url(id).ends_with(".node") {
        return Some(AssetKind::Native);
    }
    if id.ends_with(".wasm?loader") {
        return Some(AssetKind::Wasm);
    }
    None
}

fn module_code(kind: AssetKind, reference: &str) -> String {
    match kind {
        AssetKind::Asset { asar_unpack: true } => format!(
            "import {{ join }} from 'path'\nexport default join(__dirname, {reference}).replace('app.asar', 'app.asar.unpacked')"
        ),
        AssetKind::Asset { asar_unpack: false } => {
            format!("import {{ join }} from 'path'\nexport default join(__dirname, {reference})")
        }
        AssetKind::Native => format!("export default require({reference})"),
        AssetKind::Wasm => format!(
            "import loadWasm from {}\nexport default importObject => loadWasm({reference}, importObject)",
            js_string(WASM_HELPER_ID)
        ),
    }
}

#[derive(Debug, Default)]
struct AssetState {
    /// Marker key to emitted file name.
    emitted: FxHashMap<String, String>,
    /// Source file to marker key, so every file is emitted once.
    by_file: FxHashMap<PathBuf, String>,
    /// Marker key to absolute path of a public-dir file.
    public: FxHashMap<String, PathBuf>,
}

/// Asset, native addon and wasm loader imports.
#[derive(Debug, Default)]
pub struct AssetPlugin {
    state: Arc<Mutex<AssetState>>,
}

impl AssetPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn rewrite(&self, chunk: &ChunkFile, ctx: &RenderContext<'_>) -> Option<String> {
        let state = self.state.lock();

        let emitted = replace_markers(&chunk.code, ASSET_MARKER, |key| {
            let file = state.emitted.get(key)?;
            Some(js_string(&to_relative_path(file, &chunk.file_name)))
        });
        let code = emitted.as_deref().unwrap_or(&chunk.code);

        let chunk_path = ctx.build.out_dir.join(&chunk.file_name);
        let public = replace_markers(code, PUBLIC_ASSET_MARKER, |key| {
            let file = state.public.get(key)?;
            Some(js_string(&to_relative_path(
                &file.to_string_lossy(),
                &chunk_path.to_string_lossy(),
            )))
        });

        public.or(emitted)
    }
}

#[async_trait]
impl TargetPlugin for AssetPlugin {
    fn name(&self) -> &'static str {
        "fob-electron:asset"
    }

    fn engine_plugin(&self, ctx: &BuildContext) -> Option<SharedPluginable> {
        *self.state.lock() = AssetState::default();
        Some(Arc::new(AssetLoader {
            state: Arc::clone(&self.state),
            root: ctx.root.clone(),
            public_dir: ctx.public_dir.clone(),
        }))
    }

    fn render_chunk(&self, chunk: &mut ChunkFile, ctx: &RenderContext<'_>) -> Result<()> {
        if let Some(code) = self.rewrite(chunk, ctx) {
            chunk.code = code;
        }
        Ok(())
    }
}

/// Module-level half of [`AssetPlugin`].
#[derive(Debug)]
struct AssetLoader {
    state: Arc<Mutex<AssetState>>,
    root: PathBuf,
    public_dir: Option<PathBuf>,
}

impl AssetLoader {
    fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<String> {
        if specifier == WASM_HELPER_ID {
            return Some(specifier.to_string());
        }
        classify(specifier)?;

        let path = clean_url(specifier);
        let query = &specifier[path.len()..];

        // `/icon.png?asset` refers to the public directory unless such an absolute file exists.
        if let (Some(public), Some(stripped)) = (&self.public_dir, path.strip_prefix('/')) {
            let candidate = public.join(stripped);
            if !Path::new(path).exists() && candidate.exists() {
                return Some(format!("{}{query}", candidate.to_string_lossy()));
            }
        }

        let resolved = resolve_from_importer(path, importer, &self.root)?;
        Some(format!("{}{query}", resolved.to_string_lossy()))
    }

    fn reference(&self, ctx: &PluginContext, file: &Path) -> anyhow::Result<String> {
        if let Some(public) = &self.public_dir {
            if file.starts_with(public) {
                let key = get_hash(&file.to_string_lossy());
                self.state
                    .lock()
                    .public
                    .entry(key.clone())
                    .or_insert_with(|| file.to_path_buf());
                return Ok(format!("{PUBLIC_ASSET_MARKER}{key}__"));
            }
        }

        if let Some(key) = self.state.lock().by_file.get(file) {
            return Ok(format!("{ASSET_MARKER}{key}__"));
        }

        let source = std::fs::read(file)
            .map_err(|e| anyhow::anyhow!("Failed to read asset {}: {}", file.display(), e))?;
        let reference_id = ctx.emit_file(
            EmittedAsset {
                name: file.file_name().and_then(|n| n.to_str()).map(str::to_string),
                original_file_name: Some(file.to_string_lossy().into_owned()),
                file_name: None,
                source: source.into(),
            },
            None,
            None,
        )?;
        let file_name = ctx.get_file_name(&reference_id)?;

        let key = get_hash(&file.to_string_lossy());
        let mut state = self.state.lock();
        state.emitted.insert(key.clone(), file_name.to_string());
        state.by_file.insert(file.to_path_buf(), key.clone());
        Ok(format!("{ASSET_MARKER}{key}__"))
    }

    fn load_sync(&self, ctx: &PluginContext, id: &str) -> HookLoadReturn {
        if id == WASM_HELPER_ID {
            return Ok(Some(HookLoadOutput {
                code: WASM_HELPER_CODE.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }));
        }
        if id.starts_with('\0') {
            return Ok(None);
        }
        let Some(kind) = classify(id) else {
            return Ok(None);
        };

        let reference = self.reference(ctx, Path::new(clean_url(id)))?;
        Ok(Some(HookLoadOutput {
            code: module_code(kind, &reference).into(),
            module_type: Some(ModuleType::Js),
            ..Default::default()
        }))
    }
}

impl Plugin for AssetLoader {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("fob-electron:asset")
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let resolved = self.resolve(args.specifier, args.importer);

        async move {
            Ok(resolved.map(|id| HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(false)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        // Emission happens synchronously so the file name is known before the hook returns.
        let result = self.load_sync(ctx, args.id);
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::test_support::context;
    use crate::target::TargetKind;
    use fob_electron_config::TargetConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn classifies_asset_imports() {
        assert_eq!(
            classify("./icon.png?asset"),
            Some(AssetKind::Asset { asar_unpack: false })
        );
        assert_eq!(
            classify("./icon.png?asset&asarUnpack"),
            Some(AssetKind::Asset { asar_unpack: true })
        );
        assert_eq!(classify("/app/build/addon.node"), Some(AssetKind::Native));
        assert_eq!(classify("./lib.wasm?loader"), Some(AssetKind::Wasm));
        assert_eq!(classify("./lib.wasm"), None);
        assert_eq!(classify("./index.ts"), None);
    }

    #[test]
    fn generated_modules() {
        assert_eq!(
            module_code(AssetKind::Asset { asar_unpack: true }, "REF"),
            "import { join } from 'path'\nexport default join(__dirname, REF).replace('app.asar', 'app.asar.unpacked')"
        );
        assert_eq!(module_code(AssetKind::Native, "REF"), "export default require(REF)");
        assert!(module_code(AssetKind::Wasm, "REF").contains("loadWasm(REF, importObject)"));
    }

    #[test]
    fn resolves_relative_and_public_specifiers() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("resources");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("icon.png"), [0u8]).unwrap();

        let loader = AssetLoader {
            state: Arc::default(),
            root: dir.path().to_path_buf(),
            public_dir: Some(public.clone()),
        };
        let importer = dir.path().join("src/main/index.ts");

        assert_eq!(
            loader.resolve("/icon.png?asset", Some(&importer.to_string_lossy())),
            Some(format!("{}?asset", public.join("icon.png").display()))
        );
        assert_eq!(
            loader.resolve("./tray.png?asset&asarUnpack", Some(&importer.to_string_lossy())),
            Some(format!(
                "{}?asset&asarUnpack",
                dir.path().join("src/main/tray.png").display()
            ))
        );
        assert_eq!(loader.resolve("./index.ts", None), None);
        assert_eq!(loader.resolve(WASM_HELPER_ID, None).as_deref(), Some(WASM_HELPER_ID));
    }

    #[test]
    fn render_chunk_replaces_both_marker_kinds() {
        let dir = TempDir::new().unwrap();
        let preset = context(TargetKind::Main, dir.path(), Some(31), false);
        let build = BuildContext::new(&TargetConfig::default(), &preset);

        let plugin = AssetPlugin::new();
        let public_file = dir.path().join("resources/icon.png");
        let public_key = get_hash(&public_file.to_string_lossy());
        {
            let mut state = plugin.state.lock();
            state.emitted.insert("abcd1234".into(), "chunks/tray-x1.png".into());
            state.public.insert(public_key.clone(), public_file);
        }

        let mut chunk = ChunkFile {
            file_name: "index.js".into(),
            code: format!(
                "const a = join(__dirname, {ASSET_MARKER}abcd1234__);\nconst b = join(__dirname, {PUBLIC_ASSET_MARKER}{public_key}__);"
            ),
            ..Default::default()
        };
        let entries = FxHashMap::default();
        plugin
            .render_chunk(&mut chunk, &RenderContext::new(&build, &entries))
            .unwrap();

        assert_eq!(
            chunk.code,
            "const a = join(__dirname, \"./chunks/tray-x1.png\");\nconst b = join(__dirname, \"../../resources/icon.png\");"
        );
    }
}
