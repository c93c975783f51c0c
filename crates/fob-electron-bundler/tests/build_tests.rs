//! End-to-end builds of a small Electron project through the rolldown engine.

mod helpers;

use std::fs;
use std::time::Duration;

use fob_electron_bundler::{Engine, RolldownEngine, TargetKind, WatchEvent};
use fob_electron_config::Phase;
use helpers::{electron_project, resolve, write};
use serde_json::json;

#[tokio::test]
async fn main_target_builds_to_commonjs() {
    let project = electron_project(json!({ "main": {}, "preload": {}, "renderer": {} }));
    let resolved = resolve(project.path(), Phase::Production).await;
    let main = resolved.target(TargetKind::Main).unwrap();

    let report = RolldownEngine::new().build(main).await.unwrap();
    assert_eq!(report.out_dir, project.path().join("out/main"));
    assert!(report.files.contains(&"index.js".to_string()));

    let code = fs::read_to_string(project.path().join("out/main/index.js")).unwrap();
    assert!(code.contains("require(\"electron\")"));
    assert!(code.contains("hello"));
    assert!(
        report
            .watch_files
            .contains(&project.path().join("src/main/greeting.ts"))
    );
}

#[tokio::test]
async fn renderer_page_points_at_built_chunks() {
    let project = electron_project(json!({ "renderer": {} }));
    let resolved = resolve(project.path(), Phase::Production).await;
    let renderer = resolved.target(TargetKind::Renderer).unwrap();

    let report = RolldownEngine::new().build(renderer).await.unwrap();
    assert!(report.files.contains(&"index.html".to_string()));

    let html = fs::read_to_string(project.path().join("out/renderer/index.html")).unwrap();
    assert!(html.contains("src=\"./assets/main-"), "{html}");
    assert!(!html.contains("./main.ts"));

    let chunk = report
        .files
        .iter()
        .find(|name| name.starts_with("assets/main-") && name.ends_with(".js"))
        .unwrap();
    assert!(project.path().join("out/renderer").join(chunk).is_file());
}

#[tokio::test]
async fn stale_output_is_cleared_before_writing() {
    let project = electron_project(json!({ "main": {} }));
    write(project.path(), "out/main/stale.js", "old");

    let resolved = resolve(project.path(), Phase::Production).await;
    RolldownEngine::new()
        .build(resolved.target(TargetKind::Main).unwrap())
        .await
        .unwrap();

    assert!(!project.path().join("out/main/stale.js").exists());
    assert!(project.path().join("out/main/index.js").is_file());
}

#[tokio::test]
async fn module_packages_emit_esm_preload() {
    let project = electron_project(json!({ "preload": {} }));
    write(
        project.path(),
        "package.json",
        r#"{ "name": "demo", "type": "module", "main": "out/main/index.js" }"#,
    );

    let resolved = resolve(project.path(), Phase::Production).await;
    let report = RolldownEngine::new()
        .build(resolved.target(TargetKind::Preload).unwrap())
        .await
        .unwrap();
    assert!(report.files.contains(&"index.mjs".to_string()), "{:?}", report.files);
}

#[tokio::test]
async fn watch_reports_initial_build_and_rebuilds() {
    let project = electron_project(json!({ "main": { "build": { "watch": {} } } }));
    let resolved = resolve(project.path(), Phase::Development).await;
    let main = resolved.target(TargetKind::Main).unwrap();

    let engine = RolldownEngine::new().with_debounce(Duration::from_millis(50));
    let mut handle = engine.watch(main).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(20), handle.next_event())
        .await
        .unwrap();
    assert_eq!(first, Some(WatchEvent::BundleEnd));

    write(
        project.path(),
        "src/main/greeting.ts",
        "export const greeting: string = \"changed\";\n",
    );
    let second = tokio::time::timeout(Duration::from_secs(20), handle.next_event())
        .await
        .unwrap();
    assert_eq!(second, Some(WatchEvent::BundleEnd));

    let code = fs::read_to_string(project.path().join("out/main/index.js")).unwrap();
    assert!(code.contains("changed"));
    handle.close();
}
