#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the scope-audit binary.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_scope_audit(args: &[&str]) -> Output {
    scope_audit_command(args)
        .output()
        .expect("Failed to execute scope-audit")
}

fn scope_audit_command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scope-audit"));
    cmd.args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn sample_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/scope-audit.yaml")
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("scope-audit.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_help_command() {
    let output = run_scope_audit(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("indexes"));
    assert!(stdout.contains("--config"));
}

#[test]
fn test_run_builtin_roles_json() {
    let output = run_scope_audit(&["run", "--json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let suite: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(suite["overall_passed"], true);
    assert_eq!(suite["total_tests"], 144);
    assert_eq!(suite["test_name"], "comprehensive_scope_test");
}

#[test]
fn test_run_markdown_with_sample_config() {
    let config = sample_config();
    let output = run_scope_audit(&["-c", config.to_str().unwrap(), "run"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASSED"));
    assert!(stdout.contains("| action_plans | employee |"));
}

#[test]
fn test_print_config_applies_env_override() {
    let output = scope_audit_command(&["--print-config"])
        .env("SCOPE_AUDIT__REPORT__MAX_LISTED", "3")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Effective configuration:"));
    assert!(stdout.contains("max_listed: 3"));
    assert!(stdout.contains("max_concurrency: 8"));
}

#[test]
fn test_indexes_sample_layout_passes_strict() {
    let config = sample_config();
    let output = run_scope_audit(&["-c", config.to_str().unwrap(), "indexes", "--strict"]);
    assert!(
        output.status.success(),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn test_indexes_missing_layout_reports_recommendations() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "indexes:\n  action_plans: [[company_id], [assigned_to], [created_by]]\n",
    );
    let path = path.to_str().unwrap();

    let lenient = run_scope_audit(&["-c", path, "indexes"]);
    assert!(lenient.status.success(), "advisories alone do not fail");
    let stdout = String::from_utf8_lossy(&lenient.stdout);
    assert!(stdout.contains("db.action_plans.createIndex({ department_id: 1 })"));

    let strict = run_scope_audit(&["-c", path, "indexes", "--strict", "--json"]);
    assert!(!strict.status.success());
    let report: serde_json::Value = serde_json::from_slice(&strict.stdout).unwrap();
    assert_eq!(report["passed"], false);
}

#[test]
fn test_invalid_role_table_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "roles:\n  roles:\n    super_admin:\n      scope: tenant\n",
    );
    let output = run_scope_audit(&["-c", path.to_str().unwrap(), "run"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "harness:\n  workers: 4\n");
    let output = run_scope_audit(&["-c", path.to_str().unwrap(), "run"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_scope_audit(&["-c", "/nonexistent/scope-audit.yaml", "run"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
