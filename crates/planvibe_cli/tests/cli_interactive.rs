use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn run_interactive(dir: &Path, input: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_planvibe"))
        .env("PLANVIBE_DATA_DIR", dir)
        .env("PLANVIBE_CONFIG_PATH", dir.join("config.json"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

#[test]
fn interactive_help_shows_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), "help\nexit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_invalid_command_prints_error_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), "nope\nadd \"after error\"\nexit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: after error"));
}

#[test]
fn interactive_session_shares_one_store() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(
        dir.path(),
        "add \"demo task\" --tag demo\nlist --tag demo\nboard\nquit\n",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: demo task"));
    assert!(stdout.contains("== To Do (1) =="));
    assert!(stdout.matches("demo task").count() >= 3);
}

#[test]
fn interactive_failed_edit_does_not_end_session() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), "edit missing --title x\nlist\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: not_found - Task not found"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No tasks"));
}

#[test]
fn interactive_rejects_config_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), "--config-override backend=remote list\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("only accepted on the command line"));
}

#[test]
fn interactive_unterminated_quote_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), "add \"oops\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - unterminated quote in command"));
}
