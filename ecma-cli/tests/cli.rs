use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::tempdir;

fn ecma_binary() -> &'static str {
    env!("CARGO_BIN_EXE_ecma")
}

fn run(args: &[&str]) -> Output {
    Command::new(ecma_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run ecma")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn normalize_prints_relevant_expression() {
    let output = run(&["normalize", "if (x.y) {}"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "x.y");

    let output = run(&["normalize", "if (x."]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn infer_prints_type_name() {
    let output = run(&["infer", "1 + ''"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "String");

    let output = run(&["infer", "foo"]);
    assert_eq!(stdout(&output), "(none)");
}

#[test]
fn infer_uses_extra_type_declarations() {
    let tmp = tempdir().expect("tempdir");
    let types = tmp.path().join("types.json");
    fs::write(&types, r#"[{"name": "Widget", "summary": "UI element"}]"#).expect("write types");

    let output = run(&[
        "infer",
        "new Widget(1)",
        "--types",
        types.to_str().expect("utf-8 path"),
        "--json",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["type"], "Widget");
    assert_eq!(value["summary"], "UI element");
    assert_eq!(value["expression"], "new Widget(1)");
}

#[test]
fn bad_types_file_is_reported() {
    let tmp = tempdir().expect("tempdir");
    let types = tmp.path().join("types.json");
    fs::write(&types, "not json").expect("write types");

    let output = run(&["infer", "1", "--types", types.to_str().expect("utf-8 path")]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("registry.load("), "stderr: {stderr}");
}

#[test]
fn signature_anchors_at_position() {
    let tmp = tempdir().expect("tempdir");
    let script = tmp.path().join("calls.js");
    fs::write(&script, "var n = 1;\nlist.splice(n, 2, item);\n").expect("write script");
    let path = script.to_str().expect("utf-8 path");

    let output = run(&["signature", path, "--line", "2", "--column", "16"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output), "splice(p,p,p)");

    let output = run(&["signature", path, "--line", "1", "--column", "5"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no enclosing call"), "stderr: {stderr}");
}

#[test]
fn signature_reads_stdin() {
    let mut child = Command::new(ecma_binary())
        .args(["signature", "--line", "1", "--column", "7"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ecma");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"alert(message)")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait for ecma");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "(p)");
}

#[test]
fn missing_input_file_is_reported() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("missing.js");
    let output = run(&["tokens", missing.to_str().expect("utf-8 path")]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cli.read("), "stderr: {stderr}");
}

#[test]
fn tree_reports_recovered_errors() {
    let tmp = tempdir().expect("tempdir");
    let script = tmp.path().join("broken.js");
    fs::write(&script, "a = ;\nb = 2;\n").expect("write script");
    let path = script.to_str().expect("utf-8 path");

    let output = run(&["tree", path, "--recover"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.starts_with("Script"), "stdout: {stdout}");
    assert!(stdout.contains("  Error"), "stdout: {stdout}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("-->"), "stderr: {stderr}");

    let output = run(&["tree", path]);
    assert!(!output.status.success());
}

#[test]
fn tokens_as_json() {
    let tmp = tempdir().expect("tempdir");
    let script = tmp.path().join("tokens.js");
    fs::write(&script, "x = /a/g;").expect("write script");

    let output = run(&["tokens", script.to_str().expect("utf-8 path"), "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let lexemes: Vec<&str> = value
        .as_array()
        .expect("array")
        .iter()
        .map(|token| token["lexeme"].as_str().expect("lexeme"))
        .collect();
    assert_eq!(lexemes, vec!["x", "=", "/a/g", ";"]);
}
