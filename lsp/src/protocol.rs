//! Serde types for the analyzer's JSON reports, and the translation of
//! native records into host diagnostics.

use std::path::PathBuf;

use serde::Deserialize;

use pyright_bridge_types::{DIAGNOSTIC_SOURCE, Diagnostic, DiagnosticSeverity, Range};

/// Severity assigned to records whose severity literal is not recognized.
const FALLBACK_SEVERITY: DiagnosticSeverity = DiagnosticSeverity::Information;

/// One parsed frame from the analyzer.
///
/// Records are kept as raw JSON so that one malformed record cannot reject
/// the whole report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerReport {
    general_diagnostics: Vec<serde_json::Value>,
    #[serde(default)]
    summary: Option<ReportSummary>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub files_analyzed: Option<u64>,
    pub error_count: Option<u64>,
    pub warning_count: Option<u64>,
    pub information_count: Option<u64>,
    pub time_in_sec: Option<f64>,
}

impl AnalyzerReport {
    /// Interpret a frame as a report.
    ///
    /// Fails when the frame has no `generalDiagnostics` array.
    pub fn from_value(frame: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(frame)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&ReportSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.general_diagnostics.len()
    }

    /// Native records in report order. Records of the wrong shape are
    /// logged and skipped.
    pub fn records(&self) -> impl Iterator<Item = NativeDiagnostic> + '_ {
        self.general_diagnostics
            .iter()
            .filter_map(|raw| match NativeDiagnostic::deserialize(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(record = %raw, "Dropping malformed analyzer record: {e}");
                    None
                }
            })
    }
}

/// A diagnostic as emitted by the analyzer, before normalization.
///
/// Every field is optional here; [`translate`] decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NativeDiagnostic {
    pub file: Option<PathBuf>,
    pub range: Option<Range>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub rule: Option<String>,
}

/// Map one native record to a host diagnostic.
///
/// Records missing any of range, message, severity or rule are dropped
/// (logged), never defaulted. An unrecognized severity literal falls back to
/// Information.
#[must_use]
pub fn translate(record: &NativeDiagnostic) -> Option<Diagnostic> {
    let (Some(range), Some(message), Some(severity), Some(rule)) = (
        record.range,
        record.message.as_deref(),
        record.severity.as_deref(),
        record.rule.as_deref(),
    ) else {
        tracing::debug!(?record, "Dropping analyzer record with missing fields");
        return None;
    };

    let severity = DiagnosticSeverity::from_pyright(severity).unwrap_or_else(|| {
        tracing::warn!(
            severity,
            fallback = FALLBACK_SEVERITY.label(),
            "Unmapped analyzer severity"
        );
        FALLBACK_SEVERITY
    });

    Some(Diagnostic::new(
        DIAGNOSTIC_SOURCE,
        range,
        message,
        severity,
        rule,
    ))
}
