//! `TargetConfig` to rolldown options.

use std::path::Path;

use fob_electron_config::{ModuleFormat, TargetConfig, Toggle};
use rolldown::{
    BundlerOptions, InputItem, OutputFormat, Platform, RawMinifyOptions, ResolveOptions,
    SourceMapType,
};
use rolldown_common::{AssetFilenamesOutputOption, ChunkFilenamesOutputOption};

use crate::plugins::BuildContext;
use crate::presets::{posix_join, resolve_against};
use crate::target::TargetKind;

/// Script entries of a target, resolved against `root`.
///
/// `rollupOptions.input` wins over `lib.entry`. HTML inputs are left out;
/// the engine expands them into their module scripts.
pub fn input_items(config: &TargetConfig, root: &Path) -> Vec<InputItem> {
    let Some(build) = config.build() else {
        return Vec::new();
    };
    let Some(input) = build.input().or_else(|| build.lib_entry()) else {
        return Vec::new();
    };

    input
        .entries()
        .into_iter()
        .filter(|(_, path)| !path.ends_with(".html"))
        .map(|(name, path)| InputItem {
            name: Some(name),
            import: resolve_against(root, Path::new(&path))
                .to_string_lossy()
                .into_owned(),
        })
        .collect()
}

/// Options for one sub-build. Input items and plugins are supplied by the caller.
pub fn bundler_options(config: &TargetConfig, ctx: &BuildContext, root: &Path) -> BundlerOptions {
    let build = config.build.clone().unwrap_or_default();
    let output = build.resolved_outputs().into_iter().next().unwrap_or_default();

    let format = match ctx.format {
        ModuleFormat::Es => OutputFormat::Esm,
        ModuleFormat::Iife => OutputFormat::Iife,
        ModuleFormat::Umd => OutputFormat::Umd,
        _ => OutputFormat::Cjs,
    };

    let ext = script_extension(ctx);
    let assets_dir = build
        .assets_dir
        .clone()
        .unwrap_or_else(|| default_assets_dir(ctx.kind).to_string());

    let entry_names = output.entry_file_names.clone().unwrap_or_else(|| {
        match build.lib.as_ref().and_then(|lib| lib.file_name.as_deref()) {
            Some(file_name) => format!("{file_name}.{ext}"),
            None if ctx.kind.is_node() => format!("[name].{ext}"),
            None => posix_join(&assets_dir, &format!("[name]-[hash].{ext}")),
        }
    });
    let chunk_names = output
        .chunk_file_names
        .clone()
        .unwrap_or_else(|| posix_join(&assets_dir, &format!("[name]-[hash].{ext}")));
    let asset_names = output
        .asset_file_names
        .clone()
        .unwrap_or_else(|| posix_join(&assets_dir, "[name]-[hash][extname]"));

    let mut options = BundlerOptions {
        cwd: Some(root.to_path_buf()),
        dir: Some(ctx.out_dir.to_string_lossy().into_owned()),
        format: Some(format),
        platform: Some(if ctx.kind.is_node() {
            Platform::Node
        } else {
            Platform::Browser
        }),
        sourcemap: build.sourcemap.as_ref().and_then(sourcemap_type),
        entry_filenames: Some(ChunkFilenamesOutputOption::String(entry_names)),
        chunk_filenames: Some(ChunkFilenamesOutputOption::String(chunk_names)),
        asset_filenames: Some(AssetFilenamesOutputOption::String(asset_names)),
        ..Default::default()
    };

    if ctx.minify {
        options.minify = Some(RawMinifyOptions::from(true));
    }

    if let Some(define) = config.define.as_ref().filter(|d| !d.is_empty()) {
        options.define = Some(
            define
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );
    }

    options.resolve = Some(configure_resolution(config, ctx.kind, root));
    options
}

fn default_assets_dir(kind: TargetKind) -> &'static str {
    if kind.is_node() { "chunks" } else { "assets" }
}

/// Extension of emitted scripts, following the package `type`.
fn script_extension(ctx: &BuildContext) -> &'static str {
    let module_package = ctx
        .preset
        .package
        .as_ref()
        .is_some_and(|package| package.is_module());
    match (ctx.is_es(), module_package) {
        (true, false) if ctx.kind.is_node() => "mjs",
        (false, true) => "cjs",
        _ => "js",
    }
}

fn sourcemap_type(toggle: &Toggle) -> Option<SourceMapType> {
    match toggle {
        Toggle::Enabled(true) => Some(SourceMapType::File),
        Toggle::Named(name) if name == "inline" => Some(SourceMapType::Inline),
        Toggle::Named(name) if name == "hidden" => Some(SourceMapType::Hidden),
        Toggle::Named(name) if toggle.is_enabled() && name != "false" => Some(SourceMapType::File),
        _ => None,
    }
}

fn configure_resolution(config: &TargetConfig, kind: TargetKind, root: &Path) -> ResolveOptions {
    let user = config.resolve.clone().unwrap_or_default();

    let mut modules = Vec::new();
    let mut current = Some(root);
    while let Some(dir) = current {
        modules.push(dir.join("node_modules").to_string_lossy().into_owned());
        current = dir.parent();
    }
    modules.push("node_modules".to_string());

    let conditions = user.conditions.unwrap_or_else(|| {
        if kind.is_node() {
            vec!["node".to_string()]
        } else {
            vec!["browser".to_string(), "module".to_string()]
        }
    });

    let browser_field = user.browser_field.unwrap_or(!kind.is_node());
    let main_fields = user.main_fields.unwrap_or_else(|| {
        let mut fields = Vec::new();
        if browser_field {
            fields.push("browser".to_string());
        }
        fields.extend(["module".to_string(), "main".to_string()]);
        fields
    });

    let alias = user.alias.filter(|a| !a.is_empty()).map(|aliases| {
        aliases
            .into_iter()
            .map(|(from, to)| {
                let target = if to.starts_with('.') || Path::new(&to).is_absolute() {
                    resolve_against(root, Path::new(&to))
                        .to_string_lossy()
                        .into_owned()
                } else {
                    to
                };
                (from, vec![Some(target)])
            })
            .collect()
    });

    let extensions = user.extensions.unwrap_or_else(|| {
        [".mjs", ".js", ".mts", ".ts", ".jsx", ".tsx", ".json"]
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    });

    ResolveOptions {
        alias,
        main_fields: Some(main_fields),
        condition_names: Some(conditions),
        extensions: Some(extensions),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}
