//! Integration tests for the casetrack CLI
//!
//! These tests exercise the full CLI workflow using a temporary database.
//! They verify that commands work end-to-end without mocking.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run casetrack CLI with a specific database path
fn run_casetrack(args: &[&str], db_path: &PathBuf) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .args(args)
        .env("CASETRACK_DB_PATH", db_path)
        .output()
        .expect("Failed to execute casetrack")
}

/// Helper to get stdout as string
fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Helper to get stderr as string
fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// =============================================================================
// Basic Command Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .arg("--help")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("casetrack"));
    assert!(out.contains("Case lifecycle"));
}

#[test]
fn test_version_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .arg("--version")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("casetrack"));
}

// =============================================================================
// Shell Completion Tests
// =============================================================================

#[test]
fn test_completion_zsh() {
    let output = Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .args(["completion", "zsh"])
        .output()
        .expect("Failed to execute");

    assert!(
        output.status.success(),
        "completion zsh failed: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(
        out.contains("#compdef casetrack"),
        "zsh completion should contain #compdef"
    );
}

#[test]
fn test_completion_bash() {
    let output = Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .args(["completion", "bash"])
        .output()
        .expect("Failed to execute");

    assert!(
        output.status.success(),
        "completion bash failed: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(
        out.contains("_casetrack"),
        "bash completion should contain _casetrack function"
    );
}

#[test]
fn test_completion_fish() {
    let output = Command::new(env!("CARGO_BIN_EXE_casetrack"))
        .args(["completion", "fish"])
        .output()
        .expect("Failed to execute");

    assert!(
        output.status.success(),
        "completion fish failed: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(
        out.contains("complete -c casetrack"),
        "fish completion should contain complete command"
    );
}

// =============================================================================
// Directory and Registration Tests
// =============================================================================

#[test]
fn test_create_and_list_organizations() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let output = run_casetrack(
        &["station", "create", "Central PS", "-d", "North", "-s", "KA"],
        &db_path,
    );
    assert!(
        output.status.success(),
        "station create failed: {}",
        stderr(&output)
    );
    assert!(stdout(&output).contains("Created"));

    let output = run_casetrack(
        &["court", "create", "Sessions Court", "-d", "North", "-s", "KA"],
        &db_path,
    );
    assert!(
        output.status.success(),
        "court create failed: {}",
        stderr(&output)
    );

    let output = run_casetrack(&["station", "list"], &db_path);
    assert!(stdout(&output).contains("Central PS"));

    let output = run_casetrack(&["court", "list"], &db_path);
    assert!(stdout(&output).contains("Sessions Court"));
}

#[test]
fn test_fir_registration_creates_case() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    run_casetrack(
        &["station", "create", "Central PS", "-d", "North", "-s", "KA"],
        &db_path,
    );
    let output = run_casetrack(
        &[
            "user", "create", "1", "Asha", "-e", "asha@ps.gov", "-r", "POLICE",
        ],
        &db_path,
    );
    assert!(
        output.status.success(),
        "user create failed: {}",
        stderr(&output)
    );

    let output = run_casetrack(
        &[
            "fir",
            "register",
            "FIR-001",
            "-i",
            "2026-08-01",
            "-s",
            "IPC 379",
            "--as",
            "1",
        ],
        &db_path,
    );
    assert!(
        output.status.success(),
        "fir register failed: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("Registered"));
    assert!(out.contains("CASE-"));
}

#[test]
fn test_assignment_requires_sho() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    run_casetrack(
        &["station", "create", "Central PS", "-d", "North", "-s", "KA"],
        &db_path,
    );
    run_casetrack(
        &[
            "user", "create", "1", "Asha", "-e", "asha@ps.gov", "-r", "POLICE",
        ],
        &db_path,
    );
    run_casetrack(
        &[
            "fir",
            "register",
            "FIR-001",
            "-i",
            "2026-08-01",
            "-s",
            "IPC 379",
            "--as",
            "1",
        ],
        &db_path,
    );

    // A plain officer cannot assign
    let output = run_casetrack(&["case", "assign", "1", "1", "--as", "1"], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("SHO"));
}

#[test]
fn test_audit_trail_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    run_casetrack(
        &["station", "create", "Central PS", "-d", "North", "-s", "KA"],
        &db_path,
    );
    run_casetrack(
        &[
            "user", "create", "1", "Asha", "-e", "asha@ps.gov", "-r", "POLICE",
        ],
        &db_path,
    );
    run_casetrack(
        &[
            "fir",
            "register",
            "FIR-001",
            "-i",
            "2026-08-01",
            "-s",
            "IPC 379",
            "--as",
            "1",
        ],
        &db_path,
    );

    let output = run_casetrack(&["audit"], &db_path);
    assert!(output.status.success(), "audit failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("FIR_REGISTERED"));
    assert!(out.contains("CASE_CREATED"));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_unknown_user_fails_gracefully() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let output = run_casetrack(
        &[
            "fir",
            "register",
            "FIR-001",
            "-i",
            "2026-08-01",
            "-s",
            "IPC 379",
            "--as",
            "999",
        ],
        &db_path,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found") || stderr(&output).contains("Error"));
}

#[test]
fn test_invalid_role_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    run_casetrack(
        &["station", "create", "Central PS", "-d", "North", "-s", "KA"],
        &db_path,
    );
    let output = run_casetrack(
        &[
            "user",
            "create",
            "1",
            "Asha",
            "-e",
            "asha@ps.gov",
            "-r",
            "MAGISTRATE",
        ],
        &db_path,
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown role"));
}
