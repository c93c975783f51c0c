//! Fixtures and test doubles for the workflow tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fob_electron_bundler::{
    BuildReport, DevServer, Engine, Error, ResolvedConfig, ResolvedTarget, TargetKind, WatchEvent,
    WatchHandle, resolve_config,
};
use fob_electron_cli::{AppLauncher, AppProcess, Result as CliResult};
use fob_electron_config::{
    ConfigCommand, InlineConfig, Phase, ProcessContext, RuntimeOverrides,
};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

/// A three-target Electron project with a JSON config.
pub fn electron_project(config: Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "package.json", r#"{ "name": "demo", "main": "out/main/index.js" }"#);
    write(
        root,
        "src/main/index.ts",
        "import { app } from \"electron\";\napp.whenReady().then(() => console.log(\"ready\"));\n",
    );
    write(
        root,
        "src/preload/index.ts",
        "import { contextBridge } from \"electron\";\ncontextBridge.exposeInMainWorld(\"api\", {});\n",
    );
    write(
        root,
        "src/renderer/index.html",
        "<!doctype html>\n<html>\n  <body>\n    <script type=\"module\" src=\"./main.ts\"></script>\n  </body>\n</html>\n",
    );
    write(root, "src/renderer/main.ts", "document.title = \"renderer\";\n");
    write(root, "electron.fob.config.json", &config.to_string());
    dir
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub fn process(root: &Path, phase: Phase) -> ProcessContext {
    let command = match phase {
        Phase::Development => ConfigCommand::Serve,
        Phase::Production => ConfigCommand::Build,
    };
    ProcessContext::new(root, phase, command).with_runtime(RuntimeOverrides {
        major_version: Some("31".into()),
        exec_path: None,
    })
}

pub async fn resolve(root: &Path, phase: Phase) -> ResolvedConfig {
    resolve_config(&InlineConfig::default(), &process(root, phase))
        .await
        .unwrap()
}

/// Records every call and fails where told to.
#[derive(Default)]
pub struct MockEngine {
    /// `(target, watch enabled)` for every build or watch call.
    pub calls: Mutex<Vec<(TargetKind, bool)>>,
    pub fail_on: Option<TargetKind>,
    pub serve_fails: bool,
    pub reloads: Arc<AtomicUsize>,
    pub watchers: Mutex<HashMap<TargetKind, mpsc::Receiver<WatchEvent>>>,
}

impl MockEngine {
    pub fn failing_on(kind: TargetKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Default::default()
        }
    }

    /// Events sent here are what `watch` reports for `kind`.
    pub fn watch_events(&self, kind: TargetKind) -> mpsc::Sender<WatchEvent> {
        let (tx, rx) = mpsc::channel(16);
        self.watchers.lock().insert(kind, rx);
        tx
    }

    pub fn called(&self) -> Vec<TargetKind> {
        self.calls.lock().iter().map(|(kind, _)| *kind).collect()
    }

    fn record(&self, target: &ResolvedTarget) -> fob_electron_bundler::Result<()> {
        self.calls
            .lock()
            .push((target.kind, target.config.is_watch()));
        if self.fail_on == Some(target.kind) {
            return Err(Error::InvalidConfig {
                target: target.kind,
                message: format!("{} failed", target.kind),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn build(&self, target: &ResolvedTarget) -> fob_electron_bundler::Result<BuildReport> {
        self.record(target)?;
        Ok(BuildReport {
            out_dir: PathBuf::from("out").join(target.kind.slot()),
            files: vec!["index.js".to_string()],
            watch_files: Vec::new(),
        })
    }

    async fn watch(&self, target: &ResolvedTarget) -> fob_electron_bundler::Result<WatchHandle> {
        self.record(target)?;
        let events = self
            .watchers
            .lock()
            .remove(&target.kind)
            .unwrap_or_else(|| mpsc::channel(1).1);
        let (close, _closed) = oneshot::channel();
        Ok(WatchHandle::new(events, close))
    }

    async fn serve(
        &self,
        target: &ResolvedTarget,
    ) -> fob_electron_bundler::Result<Box<dyn DevServer>> {
        self.calls.lock().push((target.kind, false));
        if self.serve_fails {
            return Err(Error::Server("Port 5173 is already in use".to_string()));
        }
        Ok(Box::new(MockServer {
            reloads: self.reloads.clone(),
        }))
    }
}

pub struct MockServer {
    reloads: Arc<AtomicUsize>,
}

#[async_trait]
impl DevServer for MockServer {
    fn url(&self) -> &str {
        "http://localhost:5173/"
    }

    async fn full_reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    async fn close(self: Box<Self>) {}
}

/// Records launches; apps run until killed unless an exit code is set.
#[derive(Default)]
pub struct MockLauncher {
    pub launches: Mutex<Vec<ProcessContext>>,
    pub kills: Arc<AtomicUsize>,
    pub exit_code: Option<i32>,
}

impl MockLauncher {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().len()
    }
}

#[async_trait]
impl AppLauncher for MockLauncher {
    async fn launch(&self, process: &ProcessContext) -> CliResult<Box<dyn AppProcess>> {
        self.launches.lock().push(process.clone());
        Ok(Box::new(MockApp {
            exit_code: self.exit_code,
            kills: self.kills.clone(),
        }))
    }
}

pub struct MockApp {
    exit_code: Option<i32>,
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl AppProcess for MockApp {
    async fn wait(&mut self) -> CliResult<i32> {
        match self.exit_code {
            Some(code) => Ok(code),
            None => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> CliResult<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
