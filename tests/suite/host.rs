//! Host line protocol, in-process and through the built binary.

use std::io::Write;
use std::process::{Command, Stdio};

use pyright_bridge::{LintHandle, LintService};
use pyright_bridge_cli::host::serve;
use serde_json::Value;
use tempfile::tempdir;

use crate::common::{IDLE, report_per_file, session};

async fn exchange(handle: &LintHandle, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    serve(input.as_bytes(), &mut output, handle).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn lint_request_answered_with_host_records() {
    let dir = tempdir().unwrap();
    let handle = LintService::spawn(session(dir.path(), report_per_file("warning") + IDLE));
    let file = dir.path().join("app.py");
    let document = file.to_str().unwrap();

    let input = format!(
        "{}\n",
        serde_json::json!({ "document": document, "saved": true })
    );
    let replies = exchange(&handle, &input).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["document"], document);
    let diagnostics = replies[0]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0],
        serde_json::json!({
            "source": "pyright",
            "range": {
                "start": { "line": 3, "character": 4 },
                "end": { "line": 3, "character": 10 }
            },
            "message": "problem in file",
            "severity": 2,
            "code": "reportFake"
        })
    );
    assert!(handle.is_closed());
}

#[tokio::test]
async fn file_uri_documents_resolve_to_paths() {
    let dir = tempdir().unwrap();
    let handle = LintService::spawn(session(dir.path(), report_per_file("error") + IDLE));
    let uri = url::Url::from_file_path(dir.path().join("uri.py")).unwrap();

    let input = format!(
        "{}\n",
        serde_json::json!({ "document": uri.as_str(), "saved": true })
    );
    let replies = exchange(&handle, &input).await;

    assert_eq!(replies[0]["document"], uri.as_str());
    assert_eq!(replies[0]["diagnostics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_lines_do_not_stop_the_loop() {
    let dir = tempdir().unwrap();
    let handle = LintService::spawn(session(dir.path(), report_per_file("error") + IDLE));

    let input = "not json\n\
                 {\"document\": \"a.py\"}\n\
                 {\"method\": \"reload\"}\n\
                 \n\
                 {\"document\": \"a.py\", \"saved\": false}\n";
    let replies = exchange(&handle, input).await;

    assert_eq!(replies.len(), 4);
    assert!(replies[0]["error"].as_str().unwrap().starts_with("invalid JSON"));
    assert!(replies[1]["error"].as_str().unwrap().contains("saved"));
    assert!(replies[2]["error"].as_str().unwrap().contains("reload"));
    assert_eq!(replies[3]["diagnostics"], serde_json::json!([]));
}

#[tokio::test]
async fn shutdown_request_ends_session() {
    let dir = tempdir().unwrap();
    let handle = LintService::spawn(session(dir.path(), report_per_file("error") + IDLE));

    let input = "{\"method\": \"settings\"}\n\
                 {\"method\": \"shutdown\"}\n\
                 {\"document\": \"a.py\", \"saved\": true}\n";
    let replies = exchange(&handle, input).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["plugins"]["pyright_bridge"]["based"], true);
    assert!(handle.is_closed());
}

#[test]
fn binary_answers_settings_over_stdio() {
    let home = tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_pyright-bridge"))
        .arg(home.path())
        .env("HOME", home.path())
        .env("PYRIGHT_BRIDGE_CONFIG", home.path().join("missing.toml"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"{\"method\": \"settings\"}\n{\"method\": \"shutdown\"}\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let schema: Value = serde_json::from_str(lines[0]).unwrap();
    let plugin = &schema["plugins"]["pyright_bridge"];
    assert_eq!(plugin["enabled"], true);
    assert_eq!(plugin["update_timeout"], 3.0);
    assert_eq!(plugin["initial_timeout"], 15.0);

    assert!(home.path().join(".pyright-bridge/logs/pyright-bridge.log").exists());
}
