mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

use common::Project;

fn smx(project: &Project) -> Command {
    let mut cmd = Command::cargo_bin("smx").unwrap();
    cmd.current_dir(project.path())
        .env("SMX_ROOT", project.path())
        .env("SMX_CONFIG", project.write("config.toml", ""))
        .env("SMX_PLUGIN_REGISTRY", project.path().join("no-plugins.json"))
        .env("SMX_CACHE_DIR", project.path().join("cache"))
        .env_remove("RUST_LOG")
        .args(["--matrix", "matrix.yaml", "--skills-dir", "skills"]);
    cmd
}

fn robot_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("smx")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("smx")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn validate_accepts_consistent_selection() {
    let project = Project::new();
    smx(&project)
        .args(["validate", "react", "zustand", "tailwind"])
        .assert()
        .success()
        .stdout(predicate::str::contains("yes"));
}

#[test]
fn validate_conflict_exits_nonzero_with_single_json_document() {
    let project = Project::new();
    let output = smx(&project)
        .args(["--robot", "validate", "react", "vue"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json = robot_json(&output);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["valid"], false);
    assert_eq!(json["data"]["errors"][0]["type"], "conflict");
}

#[test]
fn options_marks_conflicts_disabled() {
    let project = Project::new();
    let output = smx(&project)
        .args(["--robot", "options", "web-framework", "--select", "react"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = robot_json(&output);
    let options = json["data"]["options"].as_array().unwrap();
    let vue = options
        .iter()
        .find(|o| o["id"] == "web-framework-vue")
        .unwrap();
    assert_eq!(vue["disabled"], true);
    assert_eq!(json["data"]["allDisabled"], false);
}

#[test]
fn unknown_subcategory_is_a_robot_error() {
    let project = Project::new();
    let output = smx(&project)
        .args(["--robot", "options", "backend-orm"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json = robot_json(&output);
    assert_eq!(json["status"]["error"]["code"], "unknown_category");
}

#[test]
fn dependents_cascade() {
    let project = Project::new();
    let output = smx(&project)
        .args([
            "--robot",
            "dependents",
            "tailwind",
            "--select",
            "tailwind,tailwind-forms",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = robot_json(&output);
    assert_eq!(json["data"]["skill"], "web-styling-tailwind");
    assert_eq!(json["data"]["dependents"][0], "web-styling-tailwind-forms");
}

#[test]
fn doctor_reports_ghost_requirement() {
    let project = Project::new();
    project.write(
        "skills/pinia/metadata.yaml",
        "category: web-client-state\ncliName: pinia\nrequires: [vue, nuxt]\n",
    );
    smx(&project)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("nuxt"));
}

#[test]
fn doctor_passes_clean_matrix() {
    let project = Project::new();
    smx(&project).arg("doctor").assert().success();
}

#[test]
fn sources_without_extra_catalogs_stay_offline() {
    let project = Project::new();
    let output = smx(&project)
        .args(["--robot", "sources", "react"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = robot_json(&output);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["activeSource"]["name"], "public");
}

#[test]
fn missing_matrix_file_fails() {
    let project = Project::new();
    smx(&project)
        .args(["--matrix", "absent.yaml", "matrix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
