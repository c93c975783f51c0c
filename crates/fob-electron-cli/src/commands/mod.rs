//! The three workflows.
//!
//! - [`build`] - production build of main, preload and renderer, in order
//! - [`dev`] - builds main and preload, serves the renderer, runs the app
//! - [`preview`] - production build, then runs the app
//!
//! Each module has an `execute` entry point for the binary and smaller
//! functions that take an [`Engine`](fob_electron_bundler::Engine) and an
//! [`AppLauncher`](crate::launcher::AppLauncher) so they can be driven from
//! tests.

pub mod build;
pub mod dev;
pub mod preview;

use fob_electron_bundler::TargetKind;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use preview::execute as preview_execute;

/// How a workflow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Finished on its own or stopped with Ctrl+C.
    Done,
    /// The Electron app exited with this code.
    App(i32),
}

/// What the status lines call each target.
pub(crate) fn target_label(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Main => "main process",
        TargetKind::Preload => "preload files",
        TargetKind::Renderer => "renderer",
    }
}
