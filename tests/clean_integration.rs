//! Integration tests for the clean and deps commands.
//!
//! These run the binary against real `cargo metadata`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cargo_sweeper(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cargo-sweeper").unwrap();
    // Keep any per-user config out of the tests.
    cmd.env("XDG_CONFIG_HOME", home);
    cmd
}

fn write_package(dir: &Path, name: &str, deps: &str) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(
        dir.join("Cargo.toml"),
        format!(
            "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n{}",
            name, deps
        ),
    )
    .unwrap();
    fs::write(dir.join("src/main.rs"), "fn main() {}\n").unwrap();
}

fn write_artifacts(dir: &Path, bytes: usize) {
    let debug = dir.join("target/debug");
    fs::create_dir_all(&debug).unwrap();
    fs::write(debug.join("output.bin"), "x".repeat(bytes)).unwrap();
}

/// Two standalone packages and a two-member workspace.
fn create_test_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let app = root.join("app");
    write_package(&app, "app", "");
    write_artifacts(&app, 20_000);

    let tool = root.join("tools/cli-tool");
    write_package(&tool, "cli-tool", "");
    write_artifacts(&tool, 30_000);

    let ws = root.join("ws");
    fs::create_dir_all(&ws).unwrap();
    fs::write(
        ws.join("Cargo.toml"),
        "[workspace]\nmembers = [\"crates/*\"]\nresolver = \"2\"\n",
    )
    .unwrap();
    write_package(&ws.join("crates/core"), "ws-core", "");
    write_package(&ws.join("crates/web"), "ws-web", "");
    write_artifacts(&ws, 100_000);

    // Not a project
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("docs/readme.md"), "# Documentation").unwrap();

    tmp
}

fn json_summary(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn test_dry_run_json_reports_roots_without_cleaning() {
    let tmp = create_test_tree();

    let output = cargo_sweeper(tmp.path())
        .args(["clean", "--dry-run", "--json", "--no-native"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = json_summary(&output.stdout);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["succeeded"], 3);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["total_freed"], 150_000);

    let kinds: Vec<&str> = summary["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["standalone", "standalone", "workspace"]);

    assert!(tmp.path().join("app/target").exists());
    assert!(tmp.path().join("ws/target").exists());
}

#[test]
fn test_clean_removes_artifacts() {
    let tmp = create_test_tree();

    cargo_sweeper(tmp.path())
        .args(["clean", "--no-native", "--no-progress"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned: 3 projects"));

    // Artifacts should be gone
    assert!(!tmp.path().join("app/target").exists());
    assert!(!tmp.path().join("tools/cli-tool/target").exists());
    assert!(!tmp.path().join("ws/target").exists());

    // Source files should remain
    assert!(tmp.path().join("app/src/main.rs").exists());
    assert!(tmp.path().join("ws/crates/core/Cargo.toml").exists());
    assert!(tmp.path().join("docs/readme.md").exists());
}

#[test]
fn test_native_clean_with_fallback_succeeds() {
    let tmp = create_test_tree();

    cargo_sweeper(tmp.path())
        .args(["clean", "--no-progress"])
        .arg(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join("app/target").exists());
    assert!(!tmp.path().join("ws/target").exists());
}

#[test]
fn test_native_clean_stays_in_project_target() {
    let tmp = create_test_tree();
    let shared = TempDir::new().unwrap();
    fs::write(shared.path().join("keep.bin"), "shared").unwrap();

    cargo_sweeper(tmp.path())
        .env("CARGO_TARGET_DIR", shared.path())
        .args(["clean", "--no-progress"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned: 3 projects"));

    assert!(shared.path().join("keep.bin").exists());
    assert!(!tmp.path().join("app/target").exists());
    assert!(!tmp.path().join("tools/cli-tool/target").exists());
    assert!(!tmp.path().join("ws/target").exists());
}

#[test]
fn test_second_run_frees_nothing() {
    let tmp = create_test_tree();

    cargo_sweeper(tmp.path())
        .args(["clean", "--no-native", "--json"])
        .arg(tmp.path())
        .assert()
        .success();

    let output = cargo_sweeper(tmp.path())
        .args(["clean", "--no-native", "--json"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = json_summary(&output.stdout);
    assert_eq!(summary["total_freed"], 0);
    assert_eq!(summary["succeeded"], 3);
}

#[test]
fn test_failing_root_sets_exit_code() {
    let tmp = create_test_tree();
    let broken = tmp.path().join("tools/cli-tool/target");
    fs::remove_dir_all(&broken).unwrap();
    fs::write(&broken, "not a directory").unwrap();

    cargo_sweeper(tmp.path())
        .args(["clean", "--no-native", "--no-progress"])
        .arg(tmp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failed:  1 project"))
        .stderr(predicate::str::contains("Error cleaning"));

    // The other roots were still cleaned
    assert!(!tmp.path().join("app/target").exists());
    assert!(!tmp.path().join("ws/target").exists());
}

#[test]
fn test_exclude_patterns() {
    let tmp = create_test_tree();

    cargo_sweeper(tmp.path())
        .args(["clean", "--no-native", "--exclude", "tools"])
        .arg(tmp.path())
        .assert()
        .success();

    // Excluded project should remain
    assert!(tmp.path().join("tools/cli-tool/target").exists());

    // Other projects cleaned
    assert!(!tmp.path().join("app/target").exists());
}

#[test]
fn test_min_size_filter() {
    let tmp = create_test_tree();

    let output = cargo_sweeper(tmp.path())
        .args(["clean", "--dry-run", "--json", "--min-size", "50KB"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = json_summary(&output.stdout);
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["results"][0]["kind"], "workspace");
}

#[test]
fn test_dry_run_human_output() {
    let tmp = create_test_tree();

    cargo_sweeper(tmp.path())
        .args(["clean", "--dry-run"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN]"))
        .stdout(predicate::str::contains("KiB"));

    assert!(tmp.path().join("app/target").exists());
}

#[test]
fn test_empty_directory() {
    let tmp = TempDir::new().unwrap();

    cargo_sweeper(tmp.path())
        .arg("clean")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects"));
}

#[test]
fn test_check_deps_reports_unused() {
    let tmp = TempDir::new().unwrap();
    let app = tmp.path().join("app");
    write_package(&app, "app", "foo = \"1\"\nbar = \"1\"\n");
    fs::write(app.join("src/main.rs"), "use foo::Thing;\nfn main() {}\n").unwrap();
    write_artifacts(&app, 1_000);
    let manifest_before = fs::read_to_string(app.join("Cargo.toml")).unwrap();

    let output = cargo_sweeper(tmp.path())
        .args(["clean", "--dry-run", "--json", "--remove-deps"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = json_summary(&output.stdout);
    let deps = &summary["dependency_reports"][0]["dependencies"];
    assert_eq!(deps[0]["name"], "foo");
    assert_eq!(deps[0]["used"], true);
    assert_eq!(deps[1]["name"], "bar");
    assert_eq!(deps[1]["used"], false);
    assert_eq!(deps[1]["removal"]["status"], "would-remove");

    // Dry run never edits the manifest
    let manifest_after = fs::read_to_string(app.join("Cargo.toml")).unwrap();
    assert_eq!(manifest_before, manifest_after);
}

#[test]
fn test_deps_command_scans_workspace_members() {
    let tmp = create_test_tree();
    write_package(
        &tmp.path().join("ws/crates/web"),
        "ws-web",
        "idle = \"1\"\n",
    );

    let output = cargo_sweeper(tmp.path())
        .args(["deps", "--json"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary = json_summary(&output.stdout);
    let reports = summary["dependency_reports"].as_array().unwrap();
    let web = reports
        .iter()
        .find(|r| r["manifest"].as_str().unwrap().ends_with("crates/web/Cargo.toml"))
        .unwrap();
    assert_eq!(web["dependencies"][0]["name"], "idle");
    assert_eq!(web["dependencies"][0]["used"], false);

    // Nothing was cleaned
    assert!(tmp.path().join("ws/target").exists());
    assert!(summary["results"].as_array().unwrap().is_empty());
}
