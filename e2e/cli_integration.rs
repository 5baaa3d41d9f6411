// e2e/cli_integration.rs — black-box tests of the `lztrie` binary.
//
// Drives the tool through std::process::Command: argument handling, exit
// codes, and the build-save-reload-verify pipeline.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Locate the `lztrie` binary produced by Cargo.
fn lztrie_bin() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_lztrie") {
        return PathBuf::from(path);
    }
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("lztrie");
    path
}

/// Write a word list into a temp dir and return both.
fn word_list(words: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.txt");
    fs::write(&path, words.join("\n")).unwrap();
    (dir, path)
}

const WORDS: [&str; 8] = [
    "wysoki",
    "wysokiego",
    "wysokiemu",
    "niewysoki",
    "niewysokiego",
    "niewysokiemu",
    "wysoka",
    "wysocy",
];

// ── 1. Basic build pipeline ───────────────────────────────────────────────────

#[test]
fn builds_and_persists_a_dictionary() {
    let (dir, input) = word_list(&WORDS);
    let status = Command::new(lztrie_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .expect("failed to run lztrie");
    assert!(status.success(), "build should exit 0");

    let output = dir.path().join("words.txt.llt");
    assert!(output.exists(), "the .llt file must be written");
    assert!(fs::metadata(&output).unwrap().len() > 0);
}

#[test]
fn with_data_and_parallel_build_verifies() {
    let (dir, input) = word_list(&WORDS);
    let status = Command::new(lztrie_bin())
        .args([input.to_str().unwrap(), "-withData", "-parallel"])
        .current_dir(dir.path())
        .status()
        .expect("failed to run lztrie");
    assert!(status.success(), "verified build should exit 0");
}

#[test]
fn reverse_and_split_word_build_verifies() {
    let (dir, input) = word_list(&["abcx", "xyzx", "qx", "bzx", "two words"]);
    let status = Command::new(lztrie_bin())
        .args([input.to_str().unwrap(), "-reverse", "-splitWord"])
        .current_dir(dir.path())
        .status()
        .expect("failed to run lztrie");
    assert!(status.success());
}

// ── 2. Failure exit codes ─────────────────────────────────────────────────────

#[test]
fn missing_input_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(lztrie_bin())
        .arg(dir.path().join("no-such-file.txt"))
        .output()
        .expect("failed to run lztrie");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read"), "stderr: {stderr}");
}

#[test]
fn unknown_flag_fails_with_usage() {
    let output = Command::new(lztrie_bin())
        .args(["words.txt", "-bogus"])
        .output()
        .expect("failed to run lztrie");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad usage"), "stderr: {stderr}");
}

#[test]
fn empty_word_list_fails() {
    let (dir, input) = word_list(&[]);
    let status = Command::new(lztrie_bin())
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .expect("failed to run lztrie");
    assert!(!status.success());
}

// ── 3. Help and version ───────────────────────────────────────────────────────

#[test]
fn help_prints_usage() {
    let output = Command::new(lztrie_bin())
        .arg("--help")
        .output()
        .expect("failed to run lztrie");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("usage: lztrie"), "stdout: {stdout}");
}

#[test]
fn version_prints_the_crate_version() {
    let output = Command::new(lztrie_bin())
        .arg("--version")
        .output()
        .expect("failed to run lztrie");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "stdout: {stdout}");
}
