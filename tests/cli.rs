// Copyright © 2024 Shire. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn create_site() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "shire.config.json",
        r#"{ "title": "CLI Site", "templates": [{ "id": "template", "folder": "layout" }] }"#,
    );
    write(
        dir.path(),
        "layout/index.html",
        "<html><body><h1>{{ page.title }}</h1>{{{ page.content }}}</body></html>",
    );
    write(dir.path(), "index.md", "---\ntitle: Welcome\n---\nHi");
    write(dir.path(), "about.md", "---\ntitle: About\ndraft: true\n---\nUs");
    dir
}

fn shire() -> Command {
    let mut cmd = Command::cargo_bin("shire").unwrap();
    let _ = cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_build_succeeds_and_writes_output() {
    let dir = create_site();

    let _ = shire()
        .arg("build")
        .arg("--base")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 1 of 2 pages"));

    let html =
        fs::read_to_string(dir.path().join("site/index.html")).unwrap();
    assert!(html.contains("<h1>Welcome</h1>"));
    assert!(!dir.path().join("site/about.html").exists());
}

#[test]
fn test_drafts_flag_and_overrides() {
    let dir = create_site();

    let _ = shire()
        .args(["build", "--drafts", "--jobs", "2", "--set", "output.folder=public"])
        .arg("--base")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 of 2 pages"));

    assert!(dir.path().join("public/about.html").is_file());
}

#[test]
fn test_environment_override() {
    let dir = create_site();

    let _ = shire()
        .env("SHIRE_OUTPUT__JSON", "true")
        .arg("build")
        .arg("--base")
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("site/index.json").is_file());
}

#[test]
fn test_page_failures_do_not_fail_the_build() {
    let dir = create_site();
    write(
        dir.path(),
        "broken.md",
        "---\ntitle: Broken\ntemplateId: nowhere\n---\nx",
    );

    let _ = shire()
        .arg("build")
        .arg("--base")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("[bind]"));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();

    let _ = shire()
        .arg("build")
        .arg("--base")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_timed_out_build_fails() {
    let dir = create_site();

    let _ = shire()
        .args(["build", "--timeout", "0"])
        .arg("--base")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("timed out"))
        .stderr(predicate::str::contains("stopped before finishing"));

    assert!(!dir.path().join("site/index.html").exists());
}

#[test]
fn test_unknown_override_key_fails() {
    let dir = create_site();

    let _ = shire()
        .args(["build", "--set", "output.colour=blue"])
        .arg("--base")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_help_lists_build_options() {
    let _ = shire()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--set"));
}

#[test]
fn test_no_subcommand_shows_help() {
    let _ = shire()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
