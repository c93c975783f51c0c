//! Imports that stand for another bundle entry.
//!
//! `./task.ts?nodeWorker` and `./helper.ts?modulePath` both emit the target
//! module as its own chunk and leave a marker behind, which is swapped for
//! the chunk's path relative to the importing chunk once file names are
//! known.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rolldown_common::{EmittedChunk, ModuleType, ResolvedExternal};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use rustc_hash::FxHashMap;

use super::RenderContext;
use super::util::{
    clean_url, get_hash, js_string, parse_request, probe_module, replace_markers,
    resolve_from_importer, to_relative_path,
};
use crate::engine::ChunkFile;

/// One flavor of chunk import.
#[derive(Debug, Clone, Copy)]
pub(super) struct ChunkImport {
    pub name: &'static str,
    /// Query flag that selects the import, without `?`.
    pub query: &'static str,
    pub marker: &'static str,
    /// Module source given the marker expression.
    pub code: fn(&str) -> String,
}

/// Modules emitted as chunks during the current build, keyed by marker key.
#[derive(Debug)]
pub(super) struct ChunkImports {
    kind: ChunkImport,
    modules: Mutex<FxHashMap<String, PathBuf>>,
}

impl ChunkImports {
    pub fn new(kind: ChunkImport) -> Self {
        Self {
            kind,
            modules: Mutex::default(),
        }
    }

    pub fn reset(&self) {
        self.modules.lock().clear();
    }

    /// Record `id` if it carries our query, returning the module path and its marker.
    fn request(&self, id: &str) -> Option<(PathBuf, String)> {
        if !parse_request(id)?.contains_key(self.kind.query) {
            return None;
        }
        let path = PathBuf::from(clean_url(id));
        let key = get_hash(&path.to_string_lossy());
        self.modules.lock().insert(key.clone(), path.clone());
        Some((path, format!("{}{key}__", self.kind.marker)))
    }

    pub fn rewrite(&self, chunk: &ChunkFile, ctx: &RenderContext<'_>) -> Option<String> {
        let modules = self.modules.lock();
        replace_markers(&chunk.code, self.kind.marker, |key| {
            let module = modules.get(key)?;
            let file = ctx.chunk_for_module(module)?;
            Some(js_string(&to_relative_path(file, &chunk.file_name)))
        })
    }

    pub fn loader(self: &Arc<Self>, root: &Path) -> ChunkImportLoader {
        ChunkImportLoader {
            imports: Arc::clone(self),
            root: root.to_path_buf(),
        }
    }
}

#[derive(Debug)]
pub(super) struct ChunkImportLoader {
    imports: Arc<ChunkImports>,
    root: PathBuf,
}

impl ChunkImportLoader {
    fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<String> {
        let query = self.imports.kind.query;
        if !parse_request(specifier)?.contains_key(query) {
            return None;
        }
        let resolved = resolve_from_importer(clean_url(specifier), importer, &self.root)?;
        Some(format!("{}?{query}", probe_module(resolved).to_string_lossy()))
    }
}

impl Plugin for ChunkImportLoader {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.imports.kind.name)
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
        let request = self.imports.request(args.id);
        let code = self.imports.kind.code;
        let ctx = ctx.clone();

        async move {
            let Some((path, reference)) = request else {
                return Ok(None);
            };

            ctx.emit_chunk(EmittedChunk {
                id: path.to_string_lossy().into_owned(),
                ..Default::default()
            })
            .await?;

            Ok(Some(HookLoadOutput {
                code: code(&reference).into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}
