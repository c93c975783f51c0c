//! The rolldown-backed [`Engine`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, InputItem};
use rolldown_plugin::__inner::SharedPluginable;
use rustc_hash::FxHashSet;
use tokio::sync::{mpsc, oneshot};

use super::html::HtmlEntry;
use super::output::{AssetFile, BuildReport, OutputFile, WrittenBundle, entry_index};
use super::server::{RendererServer, ServerState};
use super::watcher::{DEFAULT_DEBOUNCE, FileWatcher, next_batch};
use super::writer::{empty_dir, write_output};
use super::{DevServer, Engine, ResolvedTarget, WatchEvent, WatchHandle};
use super::{bundler_options, input_items};
use crate::error::{Error, Result};
use crate::plugins::{BuildContext, ExternalPlugin, RenderContext};
use crate::presets::resolve_against;

/// Bundles targets in-process with rolldown.
#[derive(Debug, Clone)]
pub struct RolldownEngine {
    debounce: Duration,
}

impl Default for RolldownEngine {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// A bundle held in memory.
#[derive(Debug, Default)]
struct Generated {
    files: Vec<OutputFile>,
    watch_files: Vec<PathBuf>,
}

impl RolldownEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quiet period before a watch-mode rebuild starts.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    async fn generate(&self, target: &ResolvedTarget, ctx: &BuildContext) -> Result<Generated> {
        let root = target.target_root();
        let pages = html_entries(target, &root)?;

        let mut options = bundler_options(&target.config, ctx, &root);
        let mut inputs = input_items(&target.config, &root);
        for page in &pages {
            for script in &page.scripts {
                let import = script.path.to_string_lossy().into_owned();
                if !inputs.iter().any(|item| item.import == import) {
                    inputs.push(InputItem { name: None, import });
                }
            }
        }
        if inputs.is_empty() {
            return Err(Error::invalid(
                target.kind,
                format!("no entry found for the {}.", target.kind.config_label()),
            ));
        }
        options.input = Some(inputs);

        for plugin in target.plugins.iter() {
            plugin.options(&mut options, ctx);
        }

        let mut engine_plugins: Vec<SharedPluginable> = Vec::new();
        let externals = target
            .config
            .build()
            .and_then(|build| build.rollup_options.as_ref())
            .and_then(|rollup| rollup.external.as_ref())
            .map(|external| external.as_slice().to_vec())
            .unwrap_or_default();
        let external = ExternalPlugin::new(target.kind, &externals)?;
        if !external.is_empty() {
            engine_plugins.push(Arc::new(external));
        }
        engine_plugins.extend(target.plugins.engine_plugins(ctx));

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(engine_plugins)
            .build()
            .map_err(|e| Error::from_rolldown_batch(&e))?;

        let bundle = bundler
            .generate()
            .await
            .map_err(|e| Error::from_rolldown_batch(&e))?;
        if !bundle.warnings.is_empty() {
            tracing::debug!(target = %target.kind, count = bundle.warnings.len(), "bundler warnings");
        }

        let mut files: Vec<OutputFile> = bundle.assets.iter().map(OutputFile::from_rolldown).collect();
        let watch_files = module_files(&files);

        let entries = entry_index(&files);
        let render = RenderContext::new(ctx, &entries);
        for file in &mut files {
            if let OutputFile::Chunk(chunk) = file {
                for plugin in target.plugins.iter() {
                    plugin.render_chunk(chunk, &render)?;
                }
            }
        }

        let base = target.config.base.as_deref().unwrap_or("/");
        for page in &pages {
            let html = page.render(base, |script| render.chunk_for_module(script).map(str::to_string));
            files.push(OutputFile::Asset(AssetFile::new(page.file_name.clone(), html)));
        }

        for plugin in target.plugins.iter() {
            plugin.generate_bundle(&mut files, ctx)?;
        }

        Ok(Generated { files, watch_files })
    }

    async fn write(&self, target: &ResolvedTarget, ctx: &BuildContext, files: Vec<OutputFile>) -> Result<Vec<String>> {
        let root = target.target_root();
        let build = target.config.build().cloned().unwrap_or_default();

        let empty = build
            .empty_out_dir
            .unwrap_or_else(|| ctx.out_dir.starts_with(&root) && ctx.out_dir != root);
        if empty {
            empty_dir(&ctx.out_dir)?;
        } else if ctx.out_dir.exists() {
            tracing::debug!(out_dir = %ctx.out_dir.display(), "keeping existing output directory");
        }

        if build.copy_public_dir.unwrap_or(true) {
            if let Some(public_dir) = public_dir(ctx, &root) {
                copy_dir(&public_dir, &ctx.out_dir)?;
            }
        }

        write_output(&files, &ctx.out_dir)?;
        let names = files.iter().map(|file| file.file_name().to_string()).collect();

        let written = WrittenBundle {
            out_dir: ctx.out_dir.clone(),
            files,
        };
        for plugin in target.plugins.iter() {
            plugin.write_bundle(&written, ctx).await?;
        }
        Ok(names)
    }
}

#[async_trait]
impl Engine for RolldownEngine {
    async fn build(&self, target: &ResolvedTarget) -> Result<BuildReport> {
        let ctx = target.build_context();
        let start = Instant::now();

        let result = match self.generate(target, &ctx).await {
            Ok(generated) => self
                .write(target, &ctx, generated.files)
                .await
                .map(|files| (files, generated.watch_files)),
            Err(e) => Err(e),
        };

        for plugin in target.plugins.iter() {
            plugin.close_bundle(&ctx);
        }

        let (files, watch_files) = result?;
        tracing::info!(
            "{} built {} files in {}ms",
            target.kind,
            files.len(),
            start.elapsed().as_millis()
        );
        Ok(BuildReport {
            out_dir: ctx.out_dir,
            files,
            watch_files,
        })
    }

    async fn watch(&self, target: &ResolvedTarget) -> Result<WatchHandle> {
        let ctx = target.build_context();
        let ignored = vec![ctx.out_dir.clone(), ctx.root.join("out")];
        let (watcher, mut changes) = FileWatcher::new(target.target_root(), ignored, self.debounce)?;

        let (events_tx, events_rx) = mpsc::channel(16);
        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let engine = self.clone();
        let target = target.clone();

        tokio::spawn(async move {
            let _watcher = watcher;
            let mut watched = FxHashSet::default();

            let first = engine.build(&target).await;
            if !send_outcome(&events_tx, first, &mut watched).await {
                return;
            }

            loop {
                tokio::select! {
                    _ = &mut close_rx => break,
                    batch = next_batch(&mut changes, engine.debounce) => {
                        let Some(batch) = batch else { break };
                        // A failed build has no module list, so anything may fix it.
                        let relevant = watched.is_empty()
                            || batch.iter().any(|change| watched.contains(change.path()));
                        if !relevant {
                            continue;
                        }
                        tracing::debug!(target = %target.kind, changes = batch.len(), "rebuilding");
                        let outcome = engine.build(&target).await;
                        if !send_outcome(&events_tx, outcome, &mut watched).await {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(target = %target.kind, "watcher closed");
        });

        Ok(WatchHandle::new(events_rx, close_tx))
    }

    async fn serve(&self, target: &ResolvedTarget) -> Result<Box<dyn DevServer>> {
        let ctx = target.build_context();
        let root = target.target_root();
        let state = Arc::new(ServerState::new(public_dir(&ctx, &root)));

        match self.generate(target, &ctx).await {
            Ok(generated) => state.set_files(&generated.files),
            Err(e) => {
                tracing::error!("{e}");
                state.set_error(e.to_string());
            }
        }

        let server = RendererServer::start(target.config.server.as_ref(), Arc::clone(&state)).await?;

        let (watcher, mut changes) = FileWatcher::new(root, vec![ctx.out_dir.clone()], self.debounce)?;
        let engine = self.clone();
        let target = target.clone();
        let rebuild = tokio::spawn(async move {
            let _watcher = watcher;
            while next_batch(&mut changes, engine.debounce).await.is_some() {
                match engine.generate(&target, &ctx).await {
                    Ok(generated) => {
                        state.set_files(&generated.files);
                        tracing::info!("page reload");
                    }
                    Err(e) => {
                        tracing::error!("{e}");
                        state.set_error(e.to_string());
                    }
                }
                state.broadcast_reload().await;
            }
        });

        Ok(Box::new(server.with_rebuild_task(rebuild)))
    }
}

/// Forward a build outcome; `false` once nobody is listening.
async fn send_outcome(
    events: &mpsc::Sender<WatchEvent>,
    outcome: Result<BuildReport>,
    watched: &mut FxHashSet<PathBuf>,
) -> bool {
    let event = match outcome {
        Ok(report) => {
            *watched = report.watch_files.into_iter().collect();
            WatchEvent::BundleEnd
        }
        Err(e) => WatchEvent::Error(e.to_string()),
    };
    events.send(event).await.is_ok()
}

/// HTML pages listed as inputs, loaded from disk.
fn html_entries(target: &ResolvedTarget, root: &Path) -> Result<Vec<HtmlEntry>> {
    let Some(build) = target.config.build() else {
        return Ok(Vec::new());
    };
    let Some(input) = build.input().or_else(|| build.lib_entry()) else {
        return Ok(Vec::new());
    };

    input
        .entries()
        .into_iter()
        .filter(|(_, path)| path.ends_with(".html"))
        .map(|(_, path)| {
            let path = resolve_against(root, Path::new(&path));
            HtmlEntry::load(&path, root).map_err(|e| Error::io_at(&path, e))
        })
        .collect()
}

/// Absolute source files that went into the bundle.
fn module_files(files: &[OutputFile]) -> Vec<PathBuf> {
    let mut seen = FxHashSet::default();
    files
        .iter()
        .filter_map(OutputFile::as_chunk)
        .flat_map(|chunk| chunk.module_ids.iter())
        .filter(|id| !id.starts_with('\0') && Path::new(id.as_str()).is_absolute())
        .filter(|id| seen.insert(id.as_str()))
        .map(PathBuf::from)
        .collect()
}

fn public_dir(ctx: &BuildContext, root: &Path) -> Option<PathBuf> {
    let dir = ctx
        .public_dir
        .clone()
        .unwrap_or_else(|| root.join("public"));
    dir.is_dir().then_some(dir)
}

/// Copy the contents of `from` into `to`.
fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| from.to_path_buf());
            Error::io_at(path, std::io::Error::other(e.to_string()))
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| Error::io_at(&dest, e))?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
            }
            std::fs::copy(entry.path(), &dest).map_err(|e| Error::io_at(&dest, e))?;
        }
    }
    Ok(())
}
