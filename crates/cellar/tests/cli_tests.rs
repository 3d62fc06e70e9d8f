//! Integration tests for the cellar binary
//!
//! These run the built executable and only cover paths that fail or finish
//! before any AWS call is made.

use std::process::{Command, Output};
use tempfile::TempDir;

// ─── Helpers ───────────────────────────────────────────────────────────────

fn cellar(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cellar"))
        .args(args)
        .env_remove("CELLAR_REGION")
        .env_remove("CELLAR_KEY_ID")
        .env_remove("CELLAR_S3_PATH")
        .env_remove("CELLAR_S3_ENDPOINT")
        .output()
        .expect("failed to run cellar")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[test]
fn test_version_json() {
    let output = cellar(&["version", "--json"]);
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_missing_region_is_reported() {
    let output = cellar(&["ls"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("CELLAR_REGION"));
}

#[test]
fn test_bad_s3_path_is_reported() {
    let output = cellar(&[
        "--region",
        "us-east-1",
        "--key-id",
        "alias/cellar",
        "--s3-path",
        "https://bucket/secrets",
        "rm",
        "db/password",
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("scheme must be s3"));
}

#[test]
fn test_unknown_config_field_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("cellar.yaml");
    std::fs::write(&config, "bucket: not-a-field\n").unwrap();

    let output = cellar(&["--config", config.to_str().unwrap(), "ls"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load config"));
}

#[test]
fn test_malformed_context_is_rejected() {
    let output = cellar(&["pack", "*.txt", "-", "--context", "novalue"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("novalue"));
}

#[test]
fn test_unpack_needs_only_region() {
    let dir = TempDir::new().unwrap();
    let blob = dir.path().join("blob.bin");
    std::fs::write(&blob, [0x00, 0x01]).unwrap();
    let out = dir.path().join("out.tar");

    let output = cellar(&[
        "--region",
        "us-east-1",
        "unpack",
        blob.to_str().unwrap(),
        out.to_str().unwrap(),
        "--context",
        "A=B",
    ]);

    // Fails on the truncated blob, not on missing store settings
    let stderr = stderr(&output);
    assert!(!output.status.success());
    assert!(stderr.contains("Failed to unpack"));
    assert!(stderr.contains("too short"));
    assert!(!stderr.contains("CELLAR_KEY_ID"));
    assert!(!stderr.contains("CELLAR_S3_PATH"));
    assert!(!out.exists());
}
