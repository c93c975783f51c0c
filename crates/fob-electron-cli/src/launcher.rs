//! Starting and stopping the Electron app.
//!
//! The coordinator only sees [`AppLauncher`] and [`AppProcess`], so tests can
//! drive `dev` and `preview` without a real Electron install.

use std::process::Stdio;

use async_trait::async_trait;
use fob_electron_config::ProcessContext;
use fob_electron_config::package::ensure_entry_file;
use tokio::process::{Child, Command};

use crate::error::{CliError, Result};

/// A running app.
#[async_trait]
pub trait AppProcess: Send {
    /// Wait for the app to exit and return its exit code.
    async fn wait(&mut self) -> Result<i32>;

    /// Terminate the app and wait until it is gone.
    async fn kill(&mut self) -> Result<()>;
}

/// Spawns the app for a workflow.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn launch(&self, process: &ProcessContext) -> Result<Box<dyn AppProcess>>;
}

/// Launches the installed Electron binary.
///
/// Checks the app entry, locates the executable, and spawns it in the
/// project root with inherited stdio. The child gets the workflow phase,
/// the renderer URL and the Electron major version as environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElectronLauncher;

#[async_trait]
impl AppLauncher for ElectronLauncher {
    async fn launch(&self, process: &ProcessContext) -> Result<Box<dyn AppProcess>> {
        ensure_entry_file(&process.root, process.launch.entry.as_deref())?;

        let probe = process.runtime_probe();
        let executable = probe.executable()?;
        let facts = probe.facts().ok();

        let argv = process.launch.command_line(process.phase);
        let env = process.launch.child_env(process.phase, facts.as_ref());
        tracing::debug!(executable = %executable.display(), ?argv, "spawning electron");

        let child = Command::new(&executable)
            .args(&argv)
            .envs(env)
            .current_dir(&process.root)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CliError::Launch(format!("{}: {e}", executable.display())))?;

        Ok(Box::new(ElectronProcess { child }))
    }
}

#[derive(Debug)]
struct ElectronProcess {
    child: Child,
}

#[async_trait]
impl AppProcess for ElectronProcess {
    async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await?;
        // Killed by a signal counts as a failure.
        Ok(status.code().unwrap_or(1))
    }

    async fn kill(&mut self) -> Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child.kill().await?;
        Ok(())
    }
}
