//! The three build targets of an Electron app.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which artifact a sub-build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Privileged host process.
    Main,
    /// Bridge script injected into renderer windows.
    Preload,
    /// Sandboxed UI bundle.
    Renderer,
}

impl TargetKind {
    pub const ALL: [TargetKind; 3] = [TargetKind::Main, TargetKind::Preload, TargetKind::Renderer];

    /// Key of this target in the user config.
    pub fn slot(&self) -> &'static str {
        match self {
            TargetKind::Main => "main",
            TargetKind::Preload => "preload",
            TargetKind::Renderer => "renderer",
        }
    }

    /// Prefix used in validation messages, e.g. `fob-electron main config`.
    pub fn config_label(&self) -> String {
        format!("fob-electron {} config", self.slot())
    }

    /// Default `.env` prefixes.
    pub fn env_prefixes(&self) -> Vec<String> {
        let own = match self {
            TargetKind::Main => "MAIN_VITE_",
            TargetKind::Preload => "PRELOAD_VITE_",
            TargetKind::Renderer => "RENDERER_VITE_",
        };
        vec![own.to_string(), "VITE_".to_string()]
    }

    /// Host and bridge run inside Node.js.
    pub fn is_node(&self) -> bool {
        !matches!(self, TargetKind::Renderer)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot())
    }
}
