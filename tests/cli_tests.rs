//! End-to-end runs of the linecase binary
//!
//! Each run gets its own HOME so a user's config or log never leaks in.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const TRANSCRIPT: &str = "Terminating...\nClosing files... Done.\nFreeing memory... Done.\nTerminated\n";

fn linecase(home: &Path, args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_linecase"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // closing stdin delivers end-of-input
    let mut pipe = child.stdin.take().unwrap();
    if let Err(e) = pipe.write_all(stdin) {
        // a child that failed at startup never reads
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
    }
    drop(pipe);
    child.wait_with_output().unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn missing_target_reports_and_still_cleans_up() {
    let home = TempDir::new().unwrap();
    let target = home.path().join("absent.txt");

    let output = linecase(home.path(), &[target.to_str().unwrap()], b"");
    let stderr = text(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("file does not exist"), "stderr: {}", stderr);
    assert!(stderr.contains("Possible fixes"), "stderr: {}", stderr);
    assert_eq!(text(&output.stdout), TRANSCRIPT);
    assert!(!target.exists());
}

#[test]
fn wrong_argument_count_fails_with_transcript() {
    let home = TempDir::new().unwrap();

    let output = linecase(home.path(), &[], b"");
    let stderr = text(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("requires exactly 1 argument (0 provided)"), "stderr: {}", stderr);
    assert_eq!(text(&output.stdout), TRANSCRIPT);
}

#[test]
fn session_runs_until_end_of_input() {
    let home = TempDir::new().unwrap();
    let target = home.path().join("out.txt");
    fs::write(&target, "kept\n").unwrap();

    let output = linecase(
        home.path(),
        &[target.to_str().unwrap()],
        b"toupper 3 foo bar baz\nbogus 1 x\n\ntolower 1 A\xffB\n",
    );

    assert_eq!(output.status.code(), Some(0));
    let mut expected = b"FOO BAR BAZ\nNot Supported\na\xffb\n".to_vec();
    expected.extend_from_slice(TRANSCRIPT.as_bytes());
    assert_eq!(output.stdout, expected);
    assert_eq!(fs::read(&target).unwrap(), b"kept\nFOO BAR BAZ\na\xffb\n");
}

#[test]
fn unavailable_debug_log_warns_and_carries_on() {
    let home = TempDir::new().unwrap();
    // a regular file where the log directory should be
    fs::write(home.path().join(".linecase"), "").unwrap();
    let target = home.path().join("out.txt");
    fs::write(&target, "").unwrap();

    let output = linecase(
        home.path(),
        &["--debug", target.to_str().unwrap()],
        b"toupper 1 ok\n",
    );
    let stderr = text(&output.stderr);

    assert_eq!(output.status.code(), Some(0));
    assert!(stderr.contains("warning:"), "stderr: {}", stderr);
    assert!(stderr.contains("debug logging disabled"), "stderr: {}", stderr);
    assert_eq!(fs::read_to_string(&target).unwrap(), "OK\n");
}
