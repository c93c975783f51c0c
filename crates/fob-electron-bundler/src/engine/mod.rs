//! The bundler engine contract and its rolldown implementation.
//!
//! The coordinator only talks to [`Engine`]: a one-shot `build`, a
//! long-running `watch` that reports every finished bundle, and `serve` for
//! the renderer dev server.

mod bundler;
pub mod html;
mod options;
mod output;
mod server;
mod watcher;
mod writer;

use async_trait::async_trait;
use fob_electron_config::TargetConfig;
use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::plugins::{BuildContext, PluginSet};
use crate::presets::PresetContext;
use crate::target::TargetKind;

pub use bundler::RolldownEngine;
pub use options::{bundler_options, input_items};
pub use output::{AssetFile, BuildReport, ChunkFile, OutputFile, WrittenBundle, entry_index};
pub use server::{RendererServer, resolve_hostname};
pub use watcher::{FileChange, FileWatcher};
pub use writer::{empty_dir, write_output};

/// A fully resolved sub-build: its config, its ordered plugins and the
/// facts they were resolved against.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub config: TargetConfig,
    pub plugins: PluginSet,
    pub context: PresetContext,
}

impl ResolvedTarget {
    pub fn build_context(&self) -> BuildContext {
        BuildContext::new(&self.config, &self.context)
    }

    /// The target's own root (`root` option), defaulting to the project root.
    pub fn target_root(&self) -> std::path::PathBuf {
        match &self.config.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => path_clean::clean(self.context.root.join(root)),
            None => self.context.root.clone(),
        }
    }
}

/// Something that happened in a watch-mode build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A bundle was written. The first one is the initial build.
    BundleEnd,
    /// A rebuild failed; watching continues.
    Error(String),
}

/// An open watch-mode build.
///
/// Dropping the handle stops the watcher as well.
#[derive(Debug)]
pub struct WatchHandle {
    events: mpsc::Receiver<WatchEvent>,
    close: Option<oneshot::Sender<()>>,
}

impl WatchHandle {
    pub fn new(events: mpsc::Receiver<WatchEvent>, close: oneshot::Sender<()>) -> Self {
        Self {
            events,
            close: Some(close),
        }
    }

    /// Next event, or `None` once the watcher has stopped.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// A running renderer dev server.
#[async_trait]
pub trait DevServer: Send + Sync {
    /// Base URL, e.g. `http://localhost:5173/`.
    fn url(&self) -> &str;

    /// Ask every connected page to reload.
    async fn full_reload(&self);

    async fn close(self: Box<Self>);
}

/// The bundler the coordinator drives.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Build once and write the output.
    async fn build(&self, target: &ResolvedTarget) -> Result<BuildReport>;

    /// Build, then rebuild on every change under the target root.
    async fn watch(&self, target: &ResolvedTarget) -> Result<WatchHandle>;

    /// Serve the target from memory with live reload.
    async fn serve(&self, target: &ResolvedTarget) -> Result<Box<dyn DevServer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closing_a_handle_signals_the_watcher() {
        let (tx, rx) = mpsc::channel(4);
        let (close_tx, close_rx) = oneshot::channel();
        let mut handle = WatchHandle::new(rx, close_tx);

        tx.send(WatchEvent::BundleEnd).await.unwrap();
        assert_eq!(handle.next_event().await, Some(WatchEvent::BundleEnd));

        drop(handle);
        assert!(close_rx.await.is_ok());
    }
}
