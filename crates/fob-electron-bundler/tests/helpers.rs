//! Shared fixtures for fob-electron-bundler integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use fob_electron_bundler::{ResolvedConfig, resolve_config};
use fob_electron_config::{
    ConfigCommand, InlineConfig, Phase, ProcessContext, RuntimeOverrides,
};
use serde_json::Value;
use tempfile::TempDir;

/// A minimal three-target Electron project with a JSON config.
pub fn electron_project(config: Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "package.json", r#"{ "name": "demo", "main": "out/main/index.js" }"#);
    write(
        root,
        "src/main/index.ts",
        "import { app } from \"electron\";\nimport { greeting } from \"./greeting\";\napp.whenReady().then(() => console.log(greeting));\n",
    );
    write(root, "src/main/greeting.ts", "export const greeting: string = \"hello\";\n");
    write(
        root,
        "src/preload/index.ts",
        "import { contextBridge } from \"electron\";\ncontextBridge.exposeInMainWorld(\"api\", {});\n",
    );
    write(
        root,
        "src/renderer/index.html",
        "<!doctype html>\n<html>\n  <body>\n    <div id=\"app\"></div>\n    <script type=\"module\" src=\"./main.ts\"></script>\n  </body>\n</html>\n",
    );
    write(
        root,
        "src/renderer/main.ts",
        "document.getElementById(\"app\")!.textContent = \"renderer\";\n",
    );
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
