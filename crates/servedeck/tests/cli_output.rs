//! Integration tests for CLI output behavior
//!
//! Each test runs the binary with HOME pointed at a temp dir so the user's
//! own config and backend are never touched.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn run_servedeck(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_servedeck"))
        .args(args)
        .env("HOME", home)
        .current_dir(home)
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute 'servedeck {}': {}", args.join(" "), e))
}

fn write_user_config(home: &Path, contents: &str) {
    let dir = home.join(".servedeck");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

/// Answer `list_apis` with one stopped API and everything else with an error.
fn serve_backend(listener: UnixListener) {
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                break;
            };
            let mut line = String::new();
            if BufReader::new(&stream).read_line(&mut line).is_err() {
                continue;
            }
            let Ok(request) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            let id = request["id"].clone();
            let reply = match request["command"].as_str() {
                Some("list_apis") => json!({
                    "type": "result",
                    "id": id,
                    "data": [{"id": "llama", "name": "Llama", "status": "stopped", "port": 8080}]
                }),
                _ => json!({
                    "type": "error",
                    "id": id,
                    "code": "unknown_command",
                    "message": "unknown command"
                }),
            };
            let _ = writeln!(stream, "{}", reply);
        }
    });
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = run_servedeck(home.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["list", "status", "metrics", "alerts", "watch", "start", "stop", "delete"] {
        assert!(stdout.contains(command), "help should mention '{}'", command);
    }
}

#[test]
fn test_missing_backend_exits_nonzero() {
    let home = tempfile::tempdir().unwrap();
    let output = run_servedeck(home.path(), &["list"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Could not list APIs"),
        "stderr should explain the failure, got: {}",
        stderr
    );
    assert!(
        !stderr.contains(r#""event":"#),
        "Default quiet mode should not log JSON, got: {}",
        stderr
    );
}

#[test]
fn test_invalid_api_id_is_rejected_before_connecting() {
    let home = tempfile::tempdir().unwrap();
    let output = run_servedeck(home.path(), &["start", "../etc"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid API id"));
}

#[test]
fn test_list_json_against_backend() {
    let home = tempfile::tempdir().unwrap();
    let socket = home.path().join("backend.sock");
    serve_backend(UnixListener::bind(&socket).unwrap());
    write_user_config(
        home.path(),
        &format!("[backend]\nsocket_path = \"{}\"\n", socket.display()),
    );

    let output = run_servedeck(home.path(), &["list", "--json"]);

    assert!(
        output.status.success(),
        "list --json failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let apis: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(apis[0]["id"], "llama");
    assert_eq!(apis[0]["status"], "stopped");
}

#[test]
fn test_list_table_output_is_pipeable() {
    let home = tempfile::tempdir().unwrap();
    let socket = home.path().join("backend.sock");
    serve_backend(UnixListener::bind(&socket).unwrap());
    write_user_config(
        home.path(),
        &format!("[backend]\nsocket_path = \"{}\"\n", socket.display()),
    );

    let output = run_servedeck(home.path(), &["--no-color", "list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("llama"));
    for line in stdout.lines() {
        assert!(
            !line.trim_start().starts_with('{'),
            "table output should not contain JSON: {}",
            line
        );
    }
}
