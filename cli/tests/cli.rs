use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn bbcode(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bbcode"))
        .args(args)
        .arg("--no-color")
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run bbcode")
}

fn bbcode_stdin(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_bbcode"))
        .args(args)
        .arg("--no-color")
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run bbcode");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn workspace(source: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("post.bb"), source).unwrap();
    dir
}

#[test]
fn renders_html() {
    let dir = workspace("hello [b]world[/b]");
    let output = bbcode(dir.path(), &["render", "post.bb"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "hello <strong>world</strong>\n");
}

#[test]
fn render_is_the_default_subcommand() {
    let dir = workspace("[i]x[/i]");
    let output = bbcode(dir.path(), &["post.bb", "--text"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "x\n");
}

#[test]
fn reads_stdin_with_or_without_subcommand() {
    let dir = TempDir::new().unwrap();
    let output = bbcode_stdin(dir.path(), &["-"], "[b]in[/b]");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "<strong>in</strong>\n");

    let output = bbcode_stdin(dir.path(), &["render", "-", "--text"], "[b]in[/b]");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "in\n");
}

#[test]
fn escapes_can_be_disabled() {
    let dir = workspace(r"\[b]x[/b]");
    let output = bbcode(dir.path(), &["render", "post.bb", "--text"]);
    assert_eq!(stdout(&output), "[b]x[/b]\n");

    let output = bbcode(dir.path(), &["render", "post.bb", "--text", "--no-escapes"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "\\x\n");
}

#[test]
fn discovers_config_file() {
    let dir = workspace("[b]x[/b] [shout]y[/shout]");
    std::fs::write(
        dir.path().join("bbcode.toml"),
        "[[tag]]\nname = \"shout\"\nhtml = \"<big>{param}</big>\"\n",
    )
    .unwrap();
    let output = bbcode(dir.path(), &["render", "post.bb"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "<strong>x</strong> <big>y</big>\n");
}

#[test]
fn explicit_config_must_exist() {
    let dir = workspace("x");
    let output = bbcode(dir.path(), &["render", "post.bb", "--config", "missing.toml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("configuration file not found"));
}

#[test]
fn check_reports_recoveries() {
    let dir = workspace("fine [/b]");
    let output = bbcode(dir.path(), &["render", "post.bb", "--check"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("closing tag without open element: b"), "{err}");
    assert!(err.contains("kept as literal text"), "{err}");

    let dir = workspace("fine [b]x[/b]");
    let output = bbcode(dir.path(), &["render", "post.bb", "--check"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("parsed cleanly"));
}

#[test]
fn find_and_tree() {
    let dir = workspace("a[b]1[/b][i][b]2[/b][/i]");
    let output = bbcode(dir.path(), &["render", "post.bb", "--find", "b", "--bbcode"]);
    assert_eq!(stdout(&output), "[b]1[/b]\n[b]2[/b]\n");

    let output = bbcode(dir.path(), &["render", "post.bb", "--find", "B", "--text"]);
    assert_eq!(stdout(&output), "1\n2\n");

    let output = bbcode(dir.path(), &["render", "post.bb", "--tree"]);
    assert_eq!(
        stdout(&output),
        "root\n  #1 text \"a\"\n  #2 [b]\n    #3 text \"1\"\n  #4 [i]\n    #5 [b]\n      #6 text \"2\"\n"
    );
}

#[test]
fn output_modes_conflict() {
    let dir = workspace("x");
    let output = bbcode(dir.path(), &["render", "post.bb", "--text", "--tree"]);
    assert!(!output.status.success());
}

#[test]
fn lists_tags() {
    let dir = TempDir::new().unwrap();
    let output = bbcode(dir.path(), &["tags"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert_eq!(out.lines().count(), 11);
    assert!(out.lines().any(|line| line.starts_with("code") && line.contains("raw")));
}

#[test]
fn runs_conformance_suite() {
    let suite = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/conformance");
    let output = bbcode(
        Path::new(env!("CARGO_MANIFEST_DIR")),
        &["test", suite.to_str().unwrap(), "-c", "parsing"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("test result: ok."));
}
