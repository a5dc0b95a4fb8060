//! Integration tests for top-level CLI behavior.

use std::fs;
use std::path::Path;
use std::process::Command;

fn run_strata(dir: &Path, args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_strata");
    Command::new(bin)
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run strata binary")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A project with stored metadata present, enough for the read-only commands.
fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), ".strata/metadata.yaml", "modules: {}\n");
    write(dir.path(), ".gitignore", "target/\n");
    write(dir.path(), "README.md", "# demo\n");
    write(dir.path(), "src/a.rs", "fn a() {}\n");
    write(dir.path(), "src/b.rs", "fn b() {}\n");
    write(dir.path(), "target/out.o", "binary");
    dir
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_strata(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for command in ["init", "update", "remove", "select", "context"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn invalid_subcommand_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_strata(dir.path(), &["nonsense"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn select_honours_gitignore_and_system_exclusions() {
    let dir = project();
    let output = run_strata(dir.path(), &["select"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "README.md\nsrc/a.rs\nsrc/b.rs\n");
}

#[test]
fn select_narrows_to_target_directory() {
    let dir = project();
    let output = run_strata(dir.path(), &["select", "src/a.rs"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "src/a.rs\nsrc/b.rs\n");
}

#[test]
fn select_applies_command_line_patterns() {
    let dir = project();
    let output = run_strata(dir.path(), &["select", "--exclude", "b.rs"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "README.md\nsrc/a.rs\n");

    let output = run_strata(dir.path(), &["select", "--include", "*.md"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "README.md\n");
}

#[test]
fn select_rejects_malformed_pattern() {
    let dir = project();
    let output = run_strata(dir.path(), &["select", "--include", "[ab].rs"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("character class"));
}

#[test]
fn select_from_subdirectory_uses_enclosing_project() {
    let dir = project();
    let output = run_strata(&dir.path().join("src"), &["select"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "src/a.rs\nsrc/b.rs\n");
}

#[test]
fn commands_outside_a_project_fail() {
    let dir = tempfile::tempdir().unwrap();
    for command in ["update", "select", "context"] {
        let output = run_strata(dir.path(), &[command]);
        assert!(!output.status.success(), "{command} should fail");
        assert!(String::from_utf8_lossy(&output.stderr).contains("not within a project"));
    }
}

#[test]
fn remove_deletes_project_state_once() {
    let dir = project();

    let output = run_strata(dir.path(), &["remove"]);
    assert!(output.status.success());
    assert!(!dir.path().join(".strata").exists());

    let output = run_strata(dir.path(), &["remove"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("has no project configuration"));
}

#[test]
fn init_rejects_unknown_provider_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_strata(dir.path(), &["init", "--provider", "gemini"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid configuration"));
    assert!(!dir.path().join(".strata").exists());
}

#[test]
fn init_refuses_existing_project() {
    let dir = project();
    let output = run_strata(dir.path(), &["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
}

#[test]
fn invalid_log_level_is_reported() {
    let dir = project();
    let output = run_strata(dir.path(), &["--log-level", "strata=loud", "select"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid log level"));
}
