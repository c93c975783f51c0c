use std::sync::Arc;

use async_trait::async_trait;
use rolldown_plugin::__inner::SharedPluginable;

use super::chunk_ref::{ChunkImport, ChunkImports};
use super::{BuildContext, RenderContext, TargetPlugin};
use crate::engine::ChunkFile;
use crate::error::Result;

const MODULE_PATH: ChunkImport = ChunkImport {
    name: "fob-electron:module-path",
    query: "modulePath",
    marker: "__FOB_MODULE_PATH__",
    code: module_path_module,
};

fn module_path_module(reference: &str) -> String {
    format!("import {{ join }} from 'path'\nexport default join(__dirname, {reference})")
}

/// `import helperPath from './helper?modulePath'` builds `helper` as its own
/// chunk and exports the absolute path of the result, e.g. for
/// `utilityProcess.fork`.
#[derive(Debug)]
pub struct ModulePathPlugin {
    imports: Arc<ChunkImports>,
}

impl ModulePathPlugin {
    pub fn new() -> Self {
        Self {
            imports: Arc::new(ChunkImports::new(MODULE_PATH)),
        }
    }
}

impl Default for ModulePathPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetPlugin for ModulePathPlugin {
    fn name(&self) -> &'static str {
        MODULE_PATH.name
    }

    fn engine_plugin(&self, ctx: &BuildContext) -> Option<SharedPluginable> {
        self.imports.reset();
        Some(Arc::new(self.imports.loader(&ctx.root)))
    }

    fn render_chunk(&self, chunk: &mut ChunkFile, ctx: &RenderContext<'_>) -> Result<()> {
        if let Some(code) = self.imports.rewrite(chunk, ctx) {
            chunk.code = code;
        }
        Ok(())
    }
}
