//! CLI integration tests

use std::process::{Command, Output};

fn dgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dgen"))
        .args(args)
        .env_remove("DGEN_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = dgen(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("DevOps Generator"), "Should show app name");
    assert!(stdout.contains("generate"), "Should show generate command");
    assert!(stdout.contains("validate"), "Should show validate command");
    assert!(stdout.contains("templates"), "Should show templates command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = dgen(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("dgen"), "Should show binary name");
}

/// Test generate subcommand help
#[test]
fn test_generate_help() {
    let output = dgen(&["generate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Generate help should succeed");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("--output"), "Should show output option");
    assert!(stdout.contains("--stdout"), "Should show stdout option");
    for kind in ["manifest", "dockerfile", "helm", "cicd"] {
        assert!(stdout.contains(kind), "Should list {} kind", kind);
    }
}

/// Test templates subcommand help
#[test]
fn test_templates_help() {
    let output = dgen(&["templates", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Templates help should succeed");
    assert!(stdout.contains("--name"), "Should show name option");
}

/// Test global options
#[test]
fn test_global_options() {
    let output = dgen(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("DGEN_API_URL"), "Should show env var");
}

/// Test invalid kind error handling
#[test]
fn test_invalid_kind() {
    let output = dgen(&["generate", "terraform", "-i", "request.json"]);

    assert!(!output.status.success(), "Invalid kind should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value"), "Should reject the kind");
}

/// Test missing required argument error handling
#[test]
fn test_missing_input() {
    let output = dgen(&["validate", "helm"]);

    assert!(!output.status.success(), "Missing input should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--input"), "Should name the missing option");
}

/// Test that --stdout and --output cannot be combined
#[test]
fn test_stdout_conflicts_with_output() {
    let output = dgen(&["generate", "cicd", "-i", "req.json", "-o", "out", "--stdout"]);

    assert!(!output.status.success(), "Conflicting flags should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"), "Should report the conflict");
}
