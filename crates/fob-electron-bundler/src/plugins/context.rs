use std::path::{Path, PathBuf};

use fob_electron_config::{ModuleFormat, Phase, TargetConfig};
use rustc_hash::FxHashMap;

use crate::presets::{PresetContext, resolve_against};
use crate::target::TargetKind;

/// Default `build.chunkSizeWarningLimit`, in kB.
pub const DEFAULT_CHUNK_SIZE_WARNING_LIMIT: u32 = 500;

/// Facts about a resolved target that build-time hooks need.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub kind: TargetKind,
    /// Project root.
    pub root: PathBuf,
    /// Absolute output directory.
    pub out_dir: PathBuf,
    /// Absolute public directory, if configured.
    pub public_dir: Option<PathBuf>,
    pub format: ModuleFormat,
    pub sourcemap: bool,
    pub minify: bool,
    pub chunk_size_warning_limit: u32,
    pub preset: PresetContext,
}

impl BuildContext {
    pub fn new(config: &TargetConfig, preset: &PresetContext) -> Self {
        let build = config.build.clone().unwrap_or_default();
        let kind = preset.kind;
        let root = preset.root.clone();

        let out_dir = build
            .out_dir
            .as_deref()
            .map(|dir| resolve_against(&root, dir))
            .unwrap_or_else(|| root.join("out").join(kind.slot()));

        let format = if kind.is_node() {
            build
                .resolved_outputs()
                .first()
                .and_then(|output| output.format)
                .unwrap_or_else(|| preset.node_format())
        } else {
            ModuleFormat::Es
        };

        Self {
            kind,
            out_dir,
            public_dir: config
                .public_dir
                .as_deref()
                .map(|dir| resolve_against(&root, dir)),
            format,
            sourcemap: build.sourcemap.as_ref().is_some_and(|s| s.is_enabled()),
            minify: build.minify.as_ref().is_some_and(|m| m.is_enabled()),
            chunk_size_warning_limit: build
                .chunk_size_warning_limit
                .unwrap_or(DEFAULT_CHUNK_SIZE_WARNING_LIMIT),
            root,
            preset: preset.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.preset.phase
    }

    pub fn is_production(&self) -> bool {
        self.preset.is_production()
    }

    pub fn is_es(&self) -> bool {
        self.format == ModuleFormat::Es
    }

    /// `outDir` relative to the project root with a trailing slash, for reports.
    pub fn display_out_dir(&self) -> String {
        let relative = self.out_dir.strip_prefix(&self.root).unwrap_or(&self.out_dir);
        let mut display = relative.to_string_lossy().replace('\\', "/");
        if !display.is_empty() && !display.ends_with('/') {
            display.push('/');
        }
        display
    }
}

/// Context of a `render_chunk` call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub build: &'a BuildContext,
    /// Facade module id of every emitted entry chunk, mapped to its file name.
    pub entries: &'a FxHashMap<String, String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(build: &'a BuildContext, entries: &'a FxHashMap<String, String>) -> Self {
        Self { build, entries }
    }

    /// Output file name of the chunk built from `module`, if any.
    pub fn chunk_for_module(&self, module: &Path) -> Option<&'a str> {
        let key = module.to_string_lossy();
        self.entries.get(key.as_ref()).map(String::as_str)
    }
}
