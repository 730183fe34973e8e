#![cfg(unix)]

use std::{
    io::{BufRead, BufReader, Read},
    process::{Command, Output, Stdio},
    time::{Duration, Instant},
};

fn supervisor(args: &[&str]) -> Output {
    let root = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_dev_supervisor"))
        .arg("--root")
        .arg(root.path())
        .arg("--grace-secs")
        .arg("2")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn failing_task_takes_down_the_session() {
    let started = Instant::now();
    let output = supervisor(&[
        "--task",
        "echo-loop=sh -c 'while true; do echo tick; sleep 0.1; done'",
        "--task",
        "fail-fast=sh -c 'sleep 0.3; exit 1'",
    ]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1), "stdout:\n{}", out);
    assert!(out.contains("Starting development servers..."));
    assert!(out.contains("[echo-loop] tick"));
    assert!(out.contains("Shutdown initiated: fail-fast process failed with exit code 1"));
    assert!(out.contains("[echo-loop] Terminating..."));
    assert!(out.contains("All processes stopped."));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn single_clean_task_exits_zero() {
    let output = supervisor(&["--task", "once=echo hello"]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(0), "stdout:\n{}", out);
    assert!(out.contains("[once] hello"));
    assert!(!out.contains("Shutdown initiated"));
}

#[test]
fn missing_command_is_reported() {
    let output = supervisor(&[
        "--task",
        "sleeper=sleep 30",
        "--task",
        "ghost=no-such-command-for-devsup --flag",
    ]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1), "stdout:\n{}", out);
    assert!(out.contains("[ghost] ERROR: Command not found: no-such-command-for-devsup"));
    assert!(out.contains("Shutdown initiated: ghost command not found"));
}

#[test]
fn prefixes_are_plain_when_not_a_terminal() {
    let output = supervisor(&["--task", "web=printf 'a\\nb\\n'", "--color", "web=red"]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(0));
    assert!(!out.contains('\u{1b}'));
    assert!(out.lines().any(|l| l == "[web] a"));
    assert!(out.lines().any(|l| l == "[web] b"));
}

#[test]
fn invalid_configuration_exits_before_launching() {
    let output = supervisor(&["--task", "a=true", "--task", "a=false"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("task 'a' is defined more than once"));
    assert!(!stdout(&output).contains("Starting"));
}

#[test]
fn sibling_is_terminated_when_a_command_goes_missing() {
    let output = supervisor(&[
        "--task",
        "sleeper=sh -c 'echo up; sleep 30'",
        "--task",
        "ghost=sh -c 'sleep 0.5; exec no-such-command-for-devsup'",
    ]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1), "stdout:\n{}", out);
    assert!(out.contains("[sleeper] up"));
    assert!(out.contains("Shutdown initiated: ghost process failed with exit code 127"));
    assert!(out.contains("[sleeper] Terminating..."));
    assert!(!out.contains("[sleeper] Force killing..."));
}

#[test]
fn oversized_grace_period_is_a_configuration_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_dev_supervisor"))
        .args(["--grace-secs", "1e30", "--task", "a=true"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("grace period must be between 0 and 3600 seconds"));
    assert!(!stdout(&output).contains("Starting"));
}

#[test]
fn sigint_shuts_everything_down_and_exits_one() {
    let root = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_dev_supervisor"))
        .arg("--root")
        .arg(root.path())
        .args(["--grace-secs", "2", "--task", "sleeper=sh -c 'echo ready; sleep 30'"])
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let mut reader = BufReader::new(child.stdout.take().unwrap());
    let mut seen = String::new();
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap() > 0 {
        seen.push_str(&line);
        if line.trim_end() == "[sleeper] ready" {
            break;
        }
        line.clear();
    }
    assert!(seen.contains("[sleeper] ready"), "stdout:\n{}", seen);

    let started = Instant::now();
    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(kill.success());

    reader.read_to_string(&mut seen).unwrap();
    let status = child.wait().unwrap();

    assert_eq!(status.code(), Some(1), "stdout:\n{}", seen);
    assert!(seen.contains("Shutdown initiated: User interrupt (Ctrl+C)"));
    assert!(seen.contains("[sleeper] Terminating..."));
    assert!(seen.contains("All processes stopped."));
    assert!(started.elapsed() < Duration::from_secs(10));
}
