//! Smoke tests for the mockshot CLI
//!
//! These tests run the real binary end to end.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the mockshot binary
fn mockshot() -> Command {
    let mut cmd = Command::cargo_bin("mockshot").expect("mockshot binary should exist");
    cmd.env_remove("MOCKSHOT_CONFIG").env_remove("RUST_LOG");
    cmd
}

const SCENE: &str = "\
width: 120
height: 80
background: [255, 255, 255, 255]
elements:
  - { x: 8, y: 8, width: 104, height: 24, color: [29, 161, 242, 255], radius: 6 }
  - { x: 8, y: 40, width: 64, height: 24, color: [230, 230, 235, 255], radius: 6 }
";

fn scene_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("chat.yaml"), SCENE).unwrap();
    dir
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    mockshot()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    mockshot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture"))
        .stdout(predicate::str::contains("animate"))
        .stdout(predicate::str::contains("estimate"));
}

#[test]
fn test_no_args_fails() {
    mockshot().assert().failure();
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn test_capture_scene_to_png() {
    let dir = scene_dir();
    let output = dir.path().join("chat.png");

    mockshot()
        .args(["-q", "capture"])
        .arg(dir.path().join("chat.yaml"))
        .arg("-o")
        .arg(&output)
        .args(["--scale", "1", "--padding", "10", "--radius", "8", "--shadow"])
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn test_capture_missing_scene_fails() {
    let dir = TempDir::new().unwrap();
    mockshot()
        .arg("capture")
        .arg(dir.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_composite_rejects_gif_output() {
    let dir = scene_dir();
    mockshot()
        .arg("composite")
        .arg(dir.path().join("chat.yaml"))
        .arg("-o")
        .arg(dir.path().join("out.gif"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("animate"));
}

#[test]
fn test_capture_then_animate() {
    let dir = scene_dir();
    let frame = dir.path().join("frame.png");
    mockshot()
        .args(["-q", "capture"])
        .arg(dir.path().join("chat.yaml"))
        .arg("-o")
        .arg(&frame)
        .args(["--scale", "1"])
        .assert()
        .success();

    let output = dir.path().join("chat.gif");
    mockshot()
        .args(["-q", "animate"])
        .arg(&frame)
        .arg(&frame)
        .arg("-o")
        .arg(&output)
        .args(["--delay", "200"])
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[test]
fn test_estimate_json() {
    mockshot()
        .args([
            "estimate", "--width", "100", "--height", "100", "--quality", "100", "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bytes\": 1000"));
}

#[test]
fn test_config_uses_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mockshot.yaml");
    fs::write(&path, "capture_timeout_ms: 4321\n").unwrap();

    mockshot()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture_timeout_ms: 4321"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mockshot.json");
    fs::write(&path, r#"{"size_divisor": -1}"#).unwrap();

    mockshot()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_capture_oversized_scale_fails() {
    let dir = scene_dir();
    let output = dir.path().join("huge.png");
    mockshot()
        .arg("capture")
        .arg(dir.path().join("chat.yaml"))
        .arg("-o")
        .arg(&output)
        .args(["--scale", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit"));
    assert!(!output.exists());
}

#[test]
fn test_animate_oversized_width_fails() {
    let dir = scene_dir();
    let frame = dir.path().join("frame.png");
    mockshot()
        .args(["-q", "capture"])
        .arg(dir.path().join("chat.yaml"))
        .arg("-o")
        .arg(&frame)
        .args(["--scale", "1"])
        .assert()
        .success();

    mockshot()
        .arg("animate")
        .arg(&frame)
        .arg("-o")
        .arg(dir.path().join("huge.gif"))
        .args(["--width", "4000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid export dimensions"));
}
