//! Shared test utilities and fixtures
//!
//! Stand-in analyzers are `sh -c <script>` processes. The watch set arrives
//! as the script's positional arguments, exactly where the real analyzer
//! receives its files.

#![allow(dead_code)]

use std::path::Path;

use pyright_bridge::{AnalyzerCommand, LintSession, PyrightSettings};

/// Emit one report with a `severity` record per watched file.
pub fn report_per_file(severity: &str) -> String {
    format!(
        r##"printf '{{\n"generalDiagnostics": [\n'
sep=""
for f in "$@"; do
  printf '%s{{"file": "%s", "severity": "{severity}", "message": "problem in file", "rule": "reportFake", "range": {{"start": {{"line": 3, "character": 4}}, "end": {{"line": 3, "character": 10}}}}}}\n' "$sep" "$f"
  sep=","
done
printf '],\n"summary": {{"filesAnalyzed": %d, "errorCount": 0, "warningCount": 0, "informationCount": 0, "timeInSec": 0.01}}\n}}\n' "$#"
"##
    )
}

/// Keep the stand-in alive until terminated.
pub const IDLE: &str = "while :; do sleep 1; done\n";

/// A command running `script` under `sh`, with `analyzer` as `$0`.
pub fn analyzer(script: impl Into<String>) -> AnalyzerCommand {
    AnalyzerCommand::new("sh", ["-c".to_string(), script.into(), "analyzer".to_string()])
}

pub fn settings(initial_secs: f64, update_secs: f64) -> PyrightSettings {
    serde_json::from_value(serde_json::json!({
        "initial_timeout": initial_secs,
        "update_timeout": update_secs
    }))
    .unwrap()
}

/// Session over a stand-in analyzer with short deadlines.
pub fn session(root: &Path, script: impl Into<String>) -> LintSession {
    LintSession::with_command(settings(0.5, 0.2), root, analyzer(script))
}
