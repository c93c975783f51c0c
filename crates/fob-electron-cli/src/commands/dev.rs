//! `fob-electron dev`.
//!
//! 1. Build main and preload, or open them in watch mode with `-w`
//! 2. Start the renderer dev server and publish its URL to the app
//! 3. Launch the app
//! 4. React to rebuilds until Ctrl+C or until the app exits
//!
//! A watched target reports its first bundle as the initial build. Every
//! later bundle is a rebuild: main restarts the app, preload reloads the
//! renderer. Build failures are printed and the session keeps going; only
//! a renderer server that cannot start ends it.

use std::future::Future;
use std::sync::Arc;

use fob_electron_bundler::{
    DevServer, Engine, ResolvedConfig, ResolvedTarget, RolldownEngine, TargetKind, WatchEvent,
    WatchHandle, resolve_config,
};
use fob_electron_config::{ConfigCommand, LaunchOptions, Phase, ProcessContext};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Exit, target_label};
use crate::cli::DevArgs;
use crate::config;
use crate::error::{Result, ResultExt};
use crate::launcher::{AppLauncher, AppProcess, ElectronLauncher};
use crate::ui;

/// What a rebuild asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Main was rebuilt.
    RestartApp,
    /// Preload was rebuilt.
    ReloadRenderer,
}

impl Reaction {
    fn for_target(kind: TargetKind) -> Option<Self> {
        match kind {
            TargetKind::Main => Some(Reaction::RestartApp),
            TargetKind::Preload => Some(Reaction::ReloadRenderer),
            TargetKind::Renderer => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DevOptions {
    /// Skip main and preload.
    pub renderer_only: bool,
    pub clear_screen: Option<bool>,
}

/// Execute the dev command.
pub async fn execute(args: DevArgs) -> Result<Exit> {
    let step = "start dev server and electron app";
    let inline = config::inline_config(&args.shared, args.watch)?;
    let launch = LaunchOptions {
        entry: args.shared.entry.clone(),
        args: args.electron_args.clone(),
        remote_debugging_port: args.remote_debugging_port.clone(),
        inspect: args.inspect.clone(),
        inspect_brk: args.inspect_brk.clone(),
        no_sandbox: args.no_sandbox,
        renderer_url: None,
    };
    let process = config::process_context(
        &args.shared,
        Phase::Development,
        ConfigCommand::Serve,
        launch,
    )?;

    let resolved = resolve_config(&inline, &process).await.during(step)?;
    if resolved.is_empty() {
        ui::warning("no electron.fob.config file found, nothing to start");
        return Ok(Exit::Done);
    }

    let options = DevOptions {
        renderer_only: args.renderer_only,
        clear_screen: inline.clear_screen,
    };
    let session = start(
        Arc::new(RolldownEngine::new()),
        Arc::new(ElectronLauncher),
        &resolved,
        process,
        options,
    )
    .await
    .during(step)?;

    session
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .during(step)
}

/// Bring up every target and launch the app.
pub async fn start(
    engine: Arc<dyn Engine>,
    launcher: Arc<dyn AppLauncher>,
    resolved: &ResolvedConfig,
    mut process: ProcessContext,
    options: DevOptions,
) -> Result<DevSession> {
    let (reactions_tx, reactions) = mpsc::unbounded_channel();
    let mut watchers = Vec::new();

    if options.renderer_only {
        ui::warning("you have skipped the main process and preload scripts building");
    } else {
        for kind in [TargetKind::Main, TargetKind::Preload] {
            let Some(target) = resolved.target(kind) else {
                continue;
            };
            if kind == TargetKind::Preload {
                ui::separator();
            }
            if let Some(task) = start_target(engine.as_ref(), target, reactions_tx.clone()).await {
                watchers.push(task);
            }
        }
    }

    let server = match resolved.target(TargetKind::Renderer) {
        Some(target) => {
            ui::separator();
            let server = match engine.serve(target).await {
                Ok(server) => server,
                Err(err) => {
                    abort_all(&watchers);
                    return Err(err.into());
                }
            };
            process.launch.renderer_url = Some(server.url().trim_end_matches('/').to_string());
            if !options.renderer_only {
                ui::clear_screen(options.clear_screen);
            }
            ui::success("dev server running for the electron renderer process at:");
            ui::print_urls(server.url());
            Some(server)
        }
        None => None,
    };

    let app = match launcher.launch(&process).await {
        Ok(app) => app,
        Err(err) => {
            abort_all(&watchers);
            if let Some(server) = server {
                server.close().await;
            }
            return Err(err);
        }
    };
    ui::success("start electron app...");

    Ok(DevSession {
        process,
        launcher,
        reactions,
        watchers,
        server,
        app: Some(app),
    })
}

/// Build one of main or preload. Watched targets get a task that turns
/// rebuilds into [`Reaction`]s.
async fn start_target(
    engine: &dyn Engine,
    target: &ResolvedTarget,
    reactions: mpsc::UnboundedSender<Reaction>,
) -> Option<JoinHandle<()>> {
    let kind = target.kind;
    let label = target_label(kind);

    if !target.config.is_watch() {
        match engine.build(target).await {
            Ok(_) => ui::success(&format!("build the electron {label} successfully")),
            Err(err) => ui::error(&err.to_string()),
        }
        return None;
    }

    let mut handle = match engine.watch(target).await {
        Ok(handle) => handle,
        Err(err) => {
            ui::error(&err.to_string());
            return None;
        }
    };

    match handle.next_event().await {
        Some(WatchEvent::BundleEnd) => ui::success(&format!("build the electron {label} successfully")),
        Some(WatchEvent::Error(message)) => ui::error(&message),
        None => return None,
    }

    let reaction = Reaction::for_target(kind)?;
    Some(tokio::spawn(forward_rebuilds(handle, kind, reaction, reactions)))
}

async fn forward_rebuilds(
    mut handle: WatchHandle,
    kind: TargetKind,
    reaction: Reaction,
    reactions: mpsc::UnboundedSender<Reaction>,
) {
    let label = target_label(kind);
    while let Some(event) = handle.next_event().await {
        match event {
            WatchEvent::BundleEnd => {
                ui::success(&format!("rebuild the electron {label} successfully"));
                if reactions.send(reaction).is_err() {
                    break;
                }
            }
            WatchEvent::Error(message) => ui::error(&message),
        }
    }
    tracing::debug!(kind = %kind, "watcher stopped");
}

/// A running dev session.
pub struct DevSession {
    process: ProcessContext,
    launcher: Arc<dyn AppLauncher>,
    reactions: mpsc::UnboundedReceiver<Reaction>,
    watchers: Vec<JoinHandle<()>>,
    server: Option<Box<dyn DevServer>>,
    app: Option<Box<dyn AppProcess>>,
}

impl std::fmt::Debug for DevSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevSession")
            .field("root", &self.process.root)
            .field("watchers", &self.watchers.len())
            .field("server", &self.server.as_ref().map(|s| s.url().to_string()))
            .field("app_running", &self.app.is_some())
            .finish()
    }
}

impl DevSession {
    /// The context the app was launched with.
    pub fn process(&self) -> &ProcessContext {
        &self.process
    }

    /// Next rebuild reaction, or `None` once every watcher has stopped.
    pub async fn next_reaction(&mut self) -> Option<Reaction> {
        self.reactions.recv().await
    }

    /// Apply a reaction.
    pub async fn react(&mut self, reaction: Reaction) -> Result<()> {
        match reaction {
            Reaction::RestartApp => {
                if let Some(mut app) = self.app.take() {
                    ui::info("waiting for electron to exit...");
                    app.kill().await?;
                    self.app = Some(self.launcher.launch(&self.process).await?);
                    ui::success("restart electron app...");
                }
            }
            Reaction::ReloadRenderer => {
                if let Some(server) = &self.server {
                    ui::info("trigger renderer reload");
                    server.full_reload().await;
                }
            }
        }
        Ok(())
    }

    /// React to rebuilds until `shutdown` resolves or the app exits, then
    /// close everything.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<Exit> {
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(Exit::Done),
                Some(reaction) = self.reactions.recv() => {
                    if let Err(err) = self.react(reaction).await {
                        break Err(err);
                    }
                }
                code = wait_for_app(&mut self.app) => {
                    self.app = None;
                    break Ok(Exit::App(code));
                }
            }
        };

        self.close().await;
        outcome
    }

    /// Stop watchers, the renderer server and the app.
    pub async fn close(mut self) {
        abort_all(&self.watchers);
        self.watchers.clear();
        if let Some(server) = self.server.take() {
            server.close().await;
        }
        if let Some(mut app) = self.app.take() {
            if let Err(err) = app.kill().await {
                tracing::debug!(error = %err, "failed to stop electron");
            }
        }
    }
}

fn abort_all(watchers: &[JoinHandle<()>]) {
    for watcher in watchers {
        watcher.abort();
    }
}

async fn wait_for_app(app: &mut Option<Box<dyn AppProcess>>) -> i32 {
    match app {
        Some(app) => app.wait().await.unwrap_or(1),
        None => std::future::pending().await,
    }
}
