//! End-to-end lint cycles against stand-in analyzer processes.

use std::ffi::OsString;

use pyright_bridge::{DiagnosticSeverity, LintSession};
use tempfile::tempdir;

use crate::common::{IDLE, analyzer, report_per_file, session, settings};

#[tokio::test]
async fn save_reports_diagnostics_for_saved_file() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("error") + IDLE);
    let file = dir.path().join("main.py");

    let items = session.on_save(&file, true).await;
    assert_eq!(items.len(), 1);
    let diag = &items[0];
    assert_eq!(diag.source(), "pyright");
    assert_eq!(diag.severity(), DiagnosticSeverity::Error);
    assert_eq!(diag.message(), "problem in file");
    assert_eq!(diag.code(), "reportFake");
    assert_eq!(diag.range().start.line, 3);
    assert_eq!(diag.range().end.character, 10);

    session.shutdown().await;
}

#[tokio::test]
async fn unsaved_edit_spawns_nothing() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("error") + IDLE);

    assert!(session.on_save(&dir.path().join("main.py"), false).await.is_empty());
    assert_eq!(session.supervisor().spawn_count(), 0);
    assert!(!session.supervisor().is_running());
    assert!(session.store().is_empty());
}

#[tokio::test]
async fn first_save_waits_for_slow_initial_pass() {
    let dir = tempdir().unwrap();
    let script = format!("sleep 0.4\n{}{IDLE}", report_per_file("warning"));
    let mut session = LintSession::with_command(settings(2.0, 0.1), dir.path(), analyzer(script));
    let file = dir.path().join("slow.py");

    let items = session.on_save(&file, true).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].severity(), DiagnosticSeverity::Warning);

    session.shutdown().await;
}

#[tokio::test]
async fn later_clean_report_clears_file() {
    let dir = tempdir().unwrap();
    let clean = "printf '{\\n\"generalDiagnostics\": []\\n}\\n'\n";
    let script = format!("{}sleep 0.8\n{clean}{IDLE}", report_per_file("error"));
    let mut session = LintSession::with_command(settings(0.3, 1.5), dir.path(), analyzer(script));
    let file = dir.path().join("fixed.py");

    assert_eq!(session.on_save(&file, true).await.len(), 1);

    let items = session.on_save(&file, true).await;
    assert!(items.is_empty());
    assert!(session.store().contains(&file));
    assert_eq!(session.supervisor().spawn_count(), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn new_file_restarts_analyzer_with_cumulative_watch_set() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("error") + IDLE);
    let first = dir.path().join("a.py");
    let second = dir.path().join("b.py");

    session.on_save(&first, true).await;
    let first_pid = session.supervisor().pid();
    session.on_save(&second, true).await;

    assert_eq!(session.supervisor().spawn_count(), 2);
    assert_ne!(session.supervisor().pid(), first_pid);
    let invocation = session.supervisor().last_invocation();
    assert_eq!(
        &invocation[invocation.len() - 2..],
        [OsString::from(&first), OsString::from(&second)]
    );
    assert_eq!(session.store().get(&first).map(|items| items.len()), Some(1));
    assert_eq!(session.store().get(&second).map(|items| items.len()), Some(1));

    session.shutdown().await;
}

#[tokio::test]
async fn analyzer_exit_keeps_last_report_and_respawns() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("hint"));
    let file = dir.path().join("crash.py");

    let items = session.on_save(&file, true).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].severity(), DiagnosticSeverity::Hint);
    assert!(!session.supervisor().is_running());

    assert_eq!(session.on_save(&file, true).await.len(), 1);
    assert_eq!(session.supervisor().spawn_count(), 2);
}

#[tokio::test]
async fn frames_before_protocol_error_are_kept() {
    let dir = tempdir().unwrap();
    let script = format!("{}echo 'Watching for file changes...'\n{IDLE}", report_per_file("error"));
    let mut session = session(dir.path(), script);
    let file = dir.path().join("noisy.py");

    assert_eq!(session.on_save(&file, true).await.len(), 1);
    assert!(!session.supervisor().is_running());
}

#[tokio::test]
async fn non_report_frame_leaves_store_alone() {
    let dir = tempdir().unwrap();
    let status = "printf '{\\n\"version\": \"1.1.380\"\\n}\\n'\n";
    let script = format!("{}{status}{IDLE}", report_per_file("error"));
    let mut session = session(dir.path(), script);
    let file = dir.path().join("kept.py");

    assert_eq!(session.on_save(&file, true).await.len(), 1);
    assert!(session.supervisor().is_running());

    session.shutdown().await;
}

#[tokio::test]
async fn unmapped_severity_reported_as_information() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("critical") + IDLE);

    let items = session.on_save(&dir.path().join("odd.py"), true).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].severity(), DiagnosticSeverity::Information);

    session.shutdown().await;
}

#[tokio::test]
async fn snapshot_counts_every_cached_file() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path(), report_per_file("error") + IDLE);

    session.on_save(&dir.path().join("a.py"), true).await;
    session.on_save(&dir.path().join("b.py"), true).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.files().len(), 2);
    assert_eq!(snapshot.error_count(), 2);
    assert_eq!(snapshot.status_string(), "E:2 W:0");

    session.shutdown().await;
}
