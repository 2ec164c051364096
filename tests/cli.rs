//! Binary-level behaviour: exit codes, stderr reporting and offline commands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn exemplar(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("exemplar").unwrap();
    cmd.current_dir(cwd.path());
    cmd
}

#[test]
fn help_lists_every_phase_command() {
    let cwd = TempDir::new().unwrap();
    exemplar(&cwd)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("discover")
                .and(predicate::str::contains("extract"))
                .and(predicate::str::contains("distill"))
                .and(predicate::str::contains("generate"))
                .and(predicate::str::contains("quality"))
                .and(predicate::str::contains("refine")),
        );
}

#[test]
fn discover_runs_offline_and_writes_its_document() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("math.test.ts"), "it('adds', () => {})").unwrap();
    let out = repo.path().join("out");

    exemplar(&repo)
        .args(["discover", "--repo", "."])
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Discovery: 1 test files"));

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("01-discovery.json")).unwrap()).unwrap();
    assert_eq!(document["files"][0]["path"], "math.test.ts");
    assert_eq!(document["files"][0]["status"], "created");
}

#[test]
fn missing_upstream_document_fails_with_its_name() {
    let cwd = TempDir::new().unwrap();

    exemplar(&cwd)
        .args(["distill", "--output", "out"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("distillation phase failed")
                .and(predicate::str::contains("02-extraction")),
        );
    assert!(!cwd.path().join("out/03-distillation.json").exists());
}

#[test]
fn unknown_provider_is_rejected() {
    let cwd = TempDir::new().unwrap();

    exemplar(&cwd)
        .args(["--provider", "carrier-pigeon", "distill", "--output", "out"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("carrier-pigeon"));
}

#[test]
fn invalid_config_file_fails_before_any_phase_runs() {
    let cwd = TempDir::new().unwrap();
    let config = cwd.path().join("broken.toml");
    fs::write(&config, "[defaults\nmodel = ").unwrap();

    exemplar(&cwd)
        .arg("--config")
        .arg(&config)
        .args(["discover", "--output", "out"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration failed"));
    assert!(!cwd.path().join("out/01-discovery.json").exists());
}
