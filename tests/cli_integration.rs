//! Integration tests for the `gather` CLI.
//!
//! Each test creates a temp vault, runs `gather` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;

/// Get the path to the built `gather` binary.
fn gather_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("gather");
    path
}

/// Create a small initialized vault in the given directory.
fn create_test_vault(root: &Path) {
    fs::create_dir_all(root.join(".gather")).unwrap();
    fs::write(
        root.join(".gather/config.toml"),
        "output_file_path = \"Tasks.md\"\nexclude_folders = []\n",
    )
    .unwrap();
    fs::write(root.join("Notes.md"), "# Notes\n- [ ] Fix bug\n- [ ] Write docs\n").unwrap();
    fs::write(root.join("Home.md"), "- [ ] Buy milk\n- [x] Pay rent\n").unwrap();
}

/// Run `gather` with the given args in the given directory, returning (stdout, stderr, success).
fn run_gather(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(gather_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("EDITOR")
        .env_remove("GATHER_LOG")
        .output()
        .expect("failed to run gather");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `gather` expecting success, return stdout.
fn run_gather_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_gather(dir, args);
    if !success {
        panic!(
            "gather {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

const INITIAL: &str = "\
## Today

## Tomorrow

## This Week

## Backlog (3)
- [ ] Buy milk [[Home]]
- [ ] Fix bug [[Notes]]
- [ ] Write docs [[Notes]]
";

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_gather_ok(tmp.path(), &["init", "--exclude", "templates", "--flat"]);
    assert!(out.contains("Initialized gather vault"));
    assert!(out.contains("excluded: templates/"));

    let config = read(tmp.path(), ".gather/config.toml");
    assert!(config.contains("exclude_folders = [\"templates\"]"));
    assert!(config.contains("enable_time_groups = false"));
}

#[test]
fn test_init_twice_needs_force() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_gather_ok(tmp.path(), &["init"]);
    let (_, stderr, success) = run_gather(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("already initialized"));
    run_gather_ok(tmp.path(), &["init", "--force", "--output", "Todo.md"]);
    assert!(read(tmp.path(), ".gather/config.toml").contains("output_file_path = \"Todo.md\""));
}

#[test]
fn test_outside_vault_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_gather(tmp.path(), &["refresh"]);
    assert!(!success);
    assert!(stderr.contains("error: not a gather vault"));
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

#[test]
fn test_refresh_writes_aggregate() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_gather_ok(tmp.path(), &["refresh"]);
    assert_eq!(out.trim(), "Tasks.md: updated");
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);

    let out = run_gather_ok(tmp.path(), &["refresh"]);
    assert_eq!(out.trim(), "Tasks.md: up to date");
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);
}

#[test]
fn test_refresh_from_subdirectory_and_with_vault_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    fs::create_dir_all(tmp.path().join("Projects")).unwrap();
    run_gather_ok(&tmp.path().join("Projects"), &["refresh"]);
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);

    let other = tempfile::TempDir::new().unwrap();
    let vault = tmp.path().to_str().unwrap();
    let out = run_gather_ok(other.path(), &["-C", vault, "refresh"]);
    assert_eq!(out.trim(), "Tasks.md: up to date");
}

#[test]
fn test_sync_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    run_gather_ok(tmp.path(), &["refresh"]);

    // Check off in the aggregate
    let edited = read(tmp.path(), "Tasks.md").replace("- [ ] Fix bug", "- [x] Fix bug");
    fs::write(tmp.path().join("Tasks.md"), edited).unwrap();
    let out = run_gather_ok(tmp.path(), &["sync"]);
    assert_eq!(out.trim(), "Tasks.md: 1 checked, 1 source updated");

    assert_eq!(read(tmp.path(), "Notes.md"), "# Notes\n- [x] Fix bug\n- [ ] Write docs\n");
    assert_eq!(
        read(tmp.path(), "Tasks.md"),
        "\
## Today

## Tomorrow

## This Week

## Backlog (2)
- [ ] Buy milk [[Home]]
- [ ] Write docs [[Notes]]

---

## Completed
- [x] Fix bug [[Notes]]
"
    );

    // Uncheck it again
    let edited = read(tmp.path(), "Tasks.md").replace("- [x] Fix bug", "- [ ] Fix bug");
    fs::write(tmp.path().join("Tasks.md"), edited).unwrap();
    run_gather_ok(tmp.path(), &["sync"]);

    assert_eq!(read(tmp.path(), "Notes.md"), "# Notes\n- [ ] Fix bug\n- [ ] Write docs\n");
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);
}

#[test]
fn test_sync_json_report() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    run_gather_ok(tmp.path(), &["refresh"]);
    let edited = read(tmp.path(), "Tasks.md").replace("- [ ] Buy milk", "- [x] Buy milk");
    fs::write(tmp.path().join("Tasks.md"), edited).unwrap();

    let out = run_gather_ok(tmp.path(), &["sync", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["written"], true);
    assert_eq!(json["reconcile"]["newly_checked"][0], "Buy milk [[Home]]");
    assert_eq!(json["reconcile"]["synced"][0], "Home.md");
}

#[test]
fn test_move_to_today() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    run_gather_ok(tmp.path(), &["refresh"]);

    // Line 9 is "- [ ] Fix bug [[Notes]]"
    run_gather_ok(tmp.path(), &["move", "today", "--line", "9"]);
    assert!(
        read(tmp.path(), "Tasks.md").starts_with("## Today (1)\n- [ ] Fix bug [[Notes]]\n\n## Tomorrow\n")
    );
    let state = read(tmp.path(), ".gather/state.json");
    assert!(state.contains("\"fix bug [[Notes]]\": \"today\""));
}

#[test]
fn test_move_rejects_header_line() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    run_gather_ok(tmp.path(), &["refresh"]);
    let (_, stderr, success) = run_gather(tmp.path(), &["move", "this-week", "--line", "1"]);
    assert!(!success);
    assert!(stderr.contains("line 1 is not an open task"));
}

#[test]
fn test_reorder_after() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    run_gather_ok(tmp.path(), &["refresh"]);

    // Drag "Buy milk" (line 8) below "Write docs" (line 10)
    run_gather_ok(tmp.path(), &["reorder", "--from", "8", "--to", "10", "--after"]);
    assert!(read(tmp.path(), "Tasks.md").ends_with(
        "## Backlog (3)\n- [ ] Fix bug [[Notes]]\n- [ ] Write docs [[Notes]]\n- [ ] Buy milk [[Home]]\n"
    ));
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_list_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_gather_ok(tmp.path(), &["list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["key"], "buy milk [[Home]]");
    assert_eq!(items[0]["source"], "Home");
    assert_eq!(items[0]["category"], "backlog");
}

#[test]
fn test_list_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    let out = run_gather_ok(tmp.path(), &["list"]);
    assert!(out.starts_with("Backlog:\n  Buy milk  [[Home]]\n"));
}

#[test]
fn test_open_prints_path_without_editor() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    let out = run_gather_ok(tmp.path(), &["open"]);
    assert!(out.trim().ends_with("Tasks.md"));
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);
}

// ---------------------------------------------------------------------------
// Exclusions
// ---------------------------------------------------------------------------

#[test]
fn test_exclude_add_and_remove() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());
    fs::create_dir_all(tmp.path().join("templates")).unwrap();
    fs::write(tmp.path().join("templates/Daily.md"), "- [ ] Template task\n").unwrap();

    run_gather_ok(tmp.path(), &["refresh"]);
    assert!(read(tmp.path(), "Tasks.md").contains("Template task [[Daily]]"));

    let out = run_gather_ok(tmp.path(), &["exclude", "add", "templates/"]);
    assert_eq!(out.trim(), "excluded templates");
    assert!(read(tmp.path(), ".gather/config.toml").contains("\"templates\""));
    assert_eq!(read(tmp.path(), "Tasks.md"), INITIAL);

    let out = run_gather_ok(tmp.path(), &["exclude", "add", "templates"]);
    assert_eq!(out.trim(), "templates already excluded");

    run_gather_ok(tmp.path(), &["exclude", "remove", "templates"]);
    assert!(read(tmp.path(), "Tasks.md").contains("Template task [[Daily]]"));
}
