#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI integration tests
//!
//! Drive the built `strata` binary against memento files in a temporary
//! directory.
//!
//! ## Scenarios Covered
//!
//! - check prints a summary, the canonical form, or JSON
//! - diff then patch turns the old snapshot into the new one
//! - invert and `patch --reverse` undo a diff
//! - identity mismatch and malformed input exit with a coded error
//! - `--log-format json` wraps the command in start/end events
//! - debug details name the class and node count of the parsed memento

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use strata_core::{Memento, MementoDiff};
use strata_core_types::schema::{FIELD_CLASS_NAME, FIELD_NODE_COUNT};
use tempfile::TempDir;

const OLD: &str = r#"<?xml version="1.0"?>
<object uuid="{67e55044-10b1-426f-9247-bb680e5fe0c8}" class="Wing" name="left">
  <property name="span" type="double">12.5</property>
  <property name="profile" type="enum" options="naca;clark">naca</property>
  <objectlist>
    <object uuid="{0b1f6c4e-2f52-4c0e-9a36-1d6f3c1f9a01}" class="Flap" name="flap"/>
    <object uuid="{0b1f6c4e-2f52-4c0e-9a36-1d6f3c1f9a02}" class="Slat" name="slat"/>
  </objectlist>
</object>
"#;

const NEW: &str = r#"<object uuid="{67e55044-10b1-426f-9247-bb680e5fe0c8}" class="Wing" name="left">
  <property name="span" type="double">13</property>
  <property name="profile" type="enum" options="naca;clark">clark</property>
  <objectlist>
    <object uuid="{0b1f6c4e-2f52-4c0e-9a36-1d6f3c1f9a02}" class="Slat" name="slat"/>
    <object uuid="{0b1f6c4e-2f52-4c0e-9a36-1d6f3c1f9a01}" class="Flap" name="inner flap"/>
    <object uuid="{0b1f6c4e-2f52-4c0e-9a36-1d6f3c1f9a03}" class="Aileron" name="aileron"/>
  </objectlist>
</object>
"#;

const OTHER: &str = r#"<object uuid="{11111111-2222-4333-8444-555555555555}" class="Wing" name="right"/>"#;

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn strata(args: &[&Path]) -> Output {
    strata_with(args, &[])
}

fn strata_with(paths: &[&Path], extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .env_remove("RUST_LOG")
        .args(extra)
        .args(paths)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_check_prints_summary() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);

    let out = stdout(&strata_with(&[&old], &["check"]));

    assert!(out.contains("class: Wing"));
    assert!(out.contains("uuid: {67e55044-10b1-426f-9247-bb680e5fe0c8}"));
    assert!(out.contains("nodes: 3"));
    let hash = Memento::parse(OLD).unwrap().full_hash();
    assert!(out.contains(&hash));
}

#[test]
fn test_check_canonical_and_json() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);

    let canonical = stdout(&strata_with(&[&old], &["check", "--canonical"]));
    let json = stdout(&strata_with(&[&old], &["check", "--json"]));

    assert!(!canonical.starts_with("<?xml"));
    assert_eq!(Memento::parse(&canonical).unwrap(), Memento::parse(OLD).unwrap());
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["class_name"], "Wing");
    assert_eq!(value["children"].as_array().unwrap().len(), 2);
}

#[test]
fn test_diff_then_patch_reaches_new_snapshot() {
    // GIVEN two snapshots of the same wing
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let new = write(&dir, "new.xml", NEW);
    let diff_path = dir.path().join("change.diff");

    // WHEN the diff is written to a file and applied to the old snapshot
    let diff_out = strata_with(
        &[&old, &new],
        &["diff", "--output", diff_path.to_str().unwrap()],
    );
    stdout(&diff_out);
    let patched = stdout(&strata_with(&[&old, &diff_path], &["patch"]));

    // THEN the patched snapshot equals the new one and the old file is untouched
    let diff_text = fs::read_to_string(&diff_path).unwrap();
    assert!(diff_text.contains("<changeValue"));
    assert!(diff_text.contains("<insertChild"));
    assert!(diff_text.contains("<rename"));
    assert_eq!(Memento::parse(&patched).unwrap(), Memento::parse(NEW).unwrap());
    assert_eq!(fs::read_to_string(&old).unwrap(), OLD);
}

#[test]
fn test_invert_and_reverse_patch_undo_the_diff() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let new = write(&dir, "new.xml", NEW);
    let diff_text = stdout(&strata_with(&[&old, &new], &["diff"]));
    let diff_path = write(&dir, "change.diff", &diff_text);

    let inverted = stdout(&strata_with(&[&diff_path], &["invert"]));
    let inverted_path = write(&dir, "undo.diff", &inverted);
    let undone = stdout(&strata_with(&[&new, &inverted_path], &["patch"]));
    let reversed = stdout(&strata_with(&[&new, &diff_path], &["patch", "--reverse"]));

    let expected = Memento::parse(OLD).unwrap();
    assert_eq!(Memento::parse(&undone).unwrap(), expected);
    assert_eq!(Memento::parse(&reversed).unwrap(), expected);
    assert_eq!(
        MementoDiff::parse(&inverted).unwrap(),
        MementoDiff::parse(&diff_text).unwrap().inverted()
    );
}

#[test]
fn test_diff_json_lists_edits() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let new = write(&dir, "new.xml", NEW);

    let json = stdout(&strata_with(&[&old, &new], &["diff", "--json"]));

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let edits = value["edits"].as_array().unwrap();
    assert!(edits.iter().any(|e| e["op"] == "change_value"));
    assert!(edits.iter().any(|e| e["op"] == "insert_child"));
}

#[test]
fn test_diff_of_identical_files_is_empty() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let same = write(&dir, "same.xml", OLD);

    let out = stdout(&strata_with(&[&old, &same], &["diff"]));

    assert_eq!(out, "<diff/>\n");
}

#[test]
fn test_identity_mismatch_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let other = write(&dir, "other.xml", OTHER);

    let output = strata_with(&[&old, &other], &["diff"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: [ERR_IDENTITY_MISMATCH] in operation 'diff'"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_malformed_and_missing_input() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "broken.xml", "<object uuid=\"{nope}\" class=\"Wing\"/>");
    let missing = dir.path().join("missing.xml");

    let parse = strata_with(&[&broken], &["check"]);
    let io = strata(&[Path::new("check"), &missing]);

    assert!(!parse.status.success());
    assert!(String::from_utf8_lossy(&parse.stderr).contains("ERR_PARSE"));
    assert!(!io.status.success());
    assert!(String::from_utf8_lossy(&io.stderr).contains("ERR_IO"));
}

#[test]
fn test_patch_failure_writes_nothing() {
    // GIVEN a diff that does not belong to the memento
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);
    let new = write(&dir, "new.xml", NEW);
    let other = write(&dir, "other.xml", OTHER);
    let diff_text = stdout(&strata_with(&[&old, &new], &["diff"]));
    let diff_path = write(&dir, "change.diff", &diff_text);
    let target = dir.path().join("patched.xml");

    // WHEN it is applied
    let output = strata_with(
        &[&other, &diff_path],
        &["patch", "-o", target.to_str().unwrap()],
    );

    // THEN the command fails and no output file appears
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_TARGET_NOT_FOUND"));
    assert!(!target.exists());
}

#[test]
fn test_json_logging_wraps_command() {
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);

    let output = strata_with(&[&old], &["--log-format", "json", "check"]);

    stdout(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let events: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .filter(|event: &serde_json::Value| event["fields"]["op"] == "check")
        .collect();
    let kinds: Vec<&str> = events
        .iter()
        .filter_map(|event| event["fields"]["event"].as_str())
        .collect();
    assert_eq!(kinds, vec!["start", "end"]);
    assert!(events[1]["fields"]["duration_ms"].is_number());
}

#[test]
fn test_debug_details_name_class_and_node_count() {
    // GIVEN json logging with debug details enabled
    let dir = TempDir::new().unwrap();
    let old = write(&dir, "old.xml", OLD);

    // WHEN the memento is checked
    let output = Command::new(env!("CARGO_BIN_EXE_strata"))
        .env("RUST_LOG", "strata=debug")
        .args(["--log-format", "json", "check"])
        .arg(&old)
        .output()
        .expect("Failed to execute CLI");

    // THEN one event carries the class name and node count
    stdout(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detailed = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|event| event["fields"][FIELD_CLASS_NAME] == "Wing")
        .filter(|event| event["fields"][FIELD_NODE_COUNT] == 3)
        .count();
    assert_eq!(detailed, 1);
}
