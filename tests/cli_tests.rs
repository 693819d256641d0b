//! End-to-end tests for the anchor binary against a temp workspace

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn anchor(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_anchor"))
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("run anchor binary")
}

fn json_out(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("json on stdout")
}

#[test]
fn dump_config_prints_toml() {
    let dir = tempfile::tempdir().unwrap();
    let output = anchor(dir.path(), &["--dump-config"]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("[drift]"));
    assert!(text.contains("[diagnostics]"));
}

#[test]
fn missing_command_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!anchor(dir.path(), &[]).status.success());
}

#[test]
fn sessions_persist_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let first = json_out(&anchor(dir.path(), &["--session", "s1", "send", "hello"]));
    assert_eq!(first["tick"], 1);
    assert_eq!(first["status"], "stable");

    let second = json_out(&anchor(dir.path(), &["--session", "s1", "tick", "--deltas", r#"{"Choice": 0.1}"#]));
    assert_eq!(second["tick"], 2);
    assert!(dir.path().join("sessions").join("s1.json").exists());

    let state = json_out(&anchor(dir.path(), &["--session", "s1", "state"]));
    assert_eq!(state["tick"], 2);
}

#[test]
fn seeded_session_from_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let seeds = dir.path().join("seeds");
    std::fs::create_dir_all(&seeds).unwrap();
    std::fs::write(seeds.join("seed_registry.json"), r#"{"nova": "Nova_v1"}"#).unwrap();
    std::fs::write(seeds.join("Nova_v1.json"), r#"{"last_known_vector": {"Stability": 0.9}, "persona_style": "Nova"}"#).unwrap();

    let state = json_out(&anchor(dir.path(), &["--session", "nova", "state"]));
    assert_eq!(state["persona_style"], "Nova");
    assert_eq!(state["anchor_vector"]["Stability"], 0.9);
}

#[test]
fn invalid_deltas_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = anchor(dir.path(), &["tick", "--deltas", "not json"]);
    assert!(!output.status.success());
}

#[test]
fn export_then_reset() {
    let dir = tempfile::tempdir().unwrap();
    json_out(&anchor(dir.path(), &["--session", "e", "send", "diagnose"]));
    let record = json_out(&anchor(dir.path(), &["--session", "e", "export"]));
    assert_eq!(record["ticks"], 1);
    assert!(record["core"].is_object());

    let reset = json_out(&anchor(dir.path(), &["--session", "e", "reset"]));
    assert_eq!(reset["removed"], true);
    assert!(!anchor(dir.path(), &["--session", "e", "export"]).status.success());
}
