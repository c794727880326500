/// Command-line tests: run scripts through the `smscr` binary and check what
/// it writes to stdout and stderr.
///
/// Each test writes its script to a temporary file so the binary reads it
/// exactly as a user's script would be read.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Path to the `smscr` binary built by this Cargo workspace.
fn binary() -> PathBuf {
    // CARGO_BIN_EXE_smscr is set by cargo test infrastructure.
    PathBuf::from(env!("CARGO_BIN_EXE_smscr"))
}

fn script_file(src: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp script");
    f.write_all(src.as_bytes()).expect("write temp script");
    f
}

fn run(args: &[&str], script: &Path) -> Output {
    Command::new(binary())
        .args(args)
        .arg(script)
        .env_remove("SMSCR_LOG")
        .output()
        .expect("failed to run smscr")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn body_only_output() {
    let f = script_file("{$FOR i 1 5 1$}{$= i $}{$END$}");
    let out = run(&["-b"], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "12345");
}

#[test]
fn default_output_has_http_header() {
    let f = script_file("{$= 2 3 + $}");
    let out = run(&[], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n5"
    );
}

#[test]
fn empty_body_still_gets_header() {
    let f = script_file("");
    let out = run(&[], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(stdout(&out).ends_with("\r\n\r\n"));
}

#[test]
fn mime_type_from_script() {
    let f = script_file(r#"{$= "text/plain" @setMimeType $}hi"#);
    let out = run(&[], f.path());
    assert!(stdout(&out).contains("Content-Type: text/plain; charset=UTF-8\r\n"));
    assert!(stdout(&out).ends_with("\r\n\r\nhi"));
}

#[test]
fn request_parameters() {
    let f = script_file(r#"{$= "a" 0 @paramGet "b" 0 @paramGet + $}"#);
    let out = run(&["-b", "-p", "a=4", "-pb=5"], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "9");
}

#[test]
fn persistent_parameter_flag() {
    let f = script_file(r#"{$= "bg" "FFFFFF" @pparamGet $}"#);
    let out = run(&["-b", "-P", "bg=7F7F7F"], f.path());
    assert_eq!(stdout(&out), "7F7F7F");
}

#[test]
fn parameter_file_with_overrides() {
    let mut params = NamedTempFile::new().unwrap();
    writeln!(params, "# defaults\na=1\nb=2\n[temporary]\nt=x\nbroken line").unwrap();
    let f = script_file(r#"{$= "a" "-" @paramGet "b" "-" @paramGet "t" "-" @tparamGet $}"#);
    let file_arg = params.path().to_string_lossy().into_owned();
    let out = run(&["-b", "-f", &file_arg, "-p", "b=9"], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "19x");
    // The bad line is reported but does not stop the run.
    assert!(stderr(&out).contains("line 6"), "{}", stderr(&out));
}

#[test]
fn tree_mode_prints_reconstruction() {
    let f = script_file("Hi {$  FOR i 1   3 $}{$=i$}{$END$}");
    let out = run(&["-t"], f.path());
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "Hi {$FOR i 1 3 $}{$= i $}{$END$}");
}

#[test]
fn syntax_error_exit_status() {
    let f = script_file("{$FOR i 1 5$}{$END$}{$END$}");
    let out = run(&["-b"], f.path());
    assert!(!out.status.success());
    assert!(stderr(&out).contains("syntax error"), "{}", stderr(&out));
}

#[test]
fn runtime_error_keeps_partial_output() {
    let f = script_file("before{$FOR i 0 2 1$}{$END$}{$= i $}");
    let out = run(&["-b"], f.path());
    assert!(!out.status.success());
    assert_eq!(stdout(&out), "before");
    assert!(stderr(&out).contains("runtime error"), "{}", stderr(&out));
}

#[test]
fn script_from_stdin() {
    let mut child = Command::new(binary())
        .args(["-b", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn smscr");
    child
        .stdin
        .take()
        .expect("stdin not open")
        .write_all(b"{$= 1 2.0 + $}")
        .expect("write to stdin");
    let out = child.wait_with_output().expect("wait failed");
    assert_eq!(stdout(&out), "3.0");
}

#[test]
fn missing_file() {
    let out = run(&["-b"], Path::new("/nonexistent/page.smscr"));
    assert!(!out.status.success());
    assert!(stderr(&out).contains("cannot read"), "{}", stderr(&out));
}

#[test]
fn usage_error() {
    let out = Command::new(binary()).arg("-z").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Usage:"));
}

#[test]
fn bundled_osnovni_script() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("lib/scripts/osnovni.smscr");
    let out = run(&["-b"], &path);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("This is sample text.\n"));
    assert!(text.contains("This is 10-th time this message is generated."));
    assert!(text.contains("sin(2^2) = 0.070"), "{text}");
}
