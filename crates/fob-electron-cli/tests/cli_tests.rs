//! Runs the `fob-electron` binary against temporary projects.

mod common;

use std::path::Path;

use assert_cmd::Command;
use common::{electron_project, write};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn fob_electron(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fob-electron"));
    cmd.current_dir(root)
        .env("ELECTRON_MAJOR_VER", "31")
        .env("NO_COLOR", "1")
        .env_remove("ELECTRON_CLI_ARGS")
        .env_remove("ELECTRON_ENTRY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    fob_electron(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("preview"));
}

#[test]
fn build_writes_every_target() {
    let project = electron_project(json!({ "main": {}, "preload": {}, "renderer": {} }));
    fob_electron(project.path()).arg("build").assert().success();

    assert!(project.path().join("out/main/index.js").is_file());
    assert!(project.path().join("out/preload/index.js").is_file());
    assert!(project.path().join("out/renderer/index.html").is_file());
}

#[test]
fn build_honours_out_dir_flag() {
    let project = electron_project(json!({ "main": {} }));
    fob_electron(project.path())
        .args(["build", "--outDir", "dist"])
        .assert()
        .success();

    assert!(project.path().join("dist/main/index.js").is_file());
}

#[test]
fn build_without_main_entry_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{ "main": "out/main/index.js" }"#);
    write(dir.path(), "electron.fob.config.json", r#"{ "main": {} }"#);

    fob_electron(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error during build"))
        .stderr(predicate::str::contains("An entry point is required"));
}

#[test]
fn reserved_config_name_is_rejected() {
    let project = electron_project(json!({ "main": {} }));
    write(project.path(), "fob.config.json", "{}");

    fob_electron(project.path())
        .args(["build", "-c", "fob.config.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be named fob.config.json"));
}

#[test]
fn missing_config_only_warns() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", r#"{ "main": "out/main/index.js" }"#);

    fob_electron(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to build"));
}

#[test]
fn invalid_debugging_port_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    fob_electron(dir.path())
        .args(["dev", "--remoteDebuggingPort", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("remoteDebuggingPort"));
}

#[test]
fn build_rejects_dev_only_flags() {
    let dir = TempDir::new().unwrap();
    fob_electron(dir.path())
        .args(["build", "--watch"])
        .assert()
        .failure();
}
