use std::sync::Arc;

use async_trait::async_trait;
use rolldown_plugin::__inner::SharedPluginable;

use super::chunk_ref::{ChunkImport, ChunkImports};
use super::{BuildContext, RenderContext, TargetPlugin};
use crate::engine::ChunkFile;
use crate::error::Result;

const NODE_WORKER: ChunkImport = ChunkImport {
    name: "fob-electron:worker",
    query: "nodeWorker",
    marker: "__FOB_NODE_WORKER__",
    code: worker_module,
};

fn worker_module(reference: &str) -> String {
    format!(
        "import {{ Worker }} from 'node:worker_threads';\nexport default function (options) {{ return new Worker(new URL({reference}, import.meta.url), options); }}"
    )
}

/// `import createWorker from './task?nodeWorker'` builds `task` as its own
/// chunk and exports a `worker_threads` factory for it.
#[derive(Debug)]
pub struct WorkerPlugin {
    imports: Arc<ChunkImports>,
}

impl WorkerPlugin {
    pub fn new() -> Self {
        Self {
            imports: Arc::new(ChunkImports::new(NODE_WORKER)),
        }
    }
}

impl Default for WorkerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetPlugin for WorkerPlugin {
    fn name(&self) -> &'static str {
        NODE_WORKER.name
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
