//! Normalized diagnostics handed back to the language-server host.
//!
//! The bridge translates analyzer-native records into [`Diagnostic`] at the
//! parse boundary. Everything downstream (store, host protocol) only sees
//! these types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};

/// Source tag stamped on every emitted diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "pyright";

/// Severity level for a diagnostic, numbered as the host expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Convert from the analyzer's severity literal.
    ///
    /// Returns `None` for literals outside the known set.
    /// Callers (boundary code) decide the fallback policy.
    #[must_use]
    pub fn from_pyright(literal: &str) -> Option<Self> {
        match literal {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" | "information" => Some(Self::Information),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }

    /// Numeric code in the host's 1-4 range.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl Serialize for DiagnosticSeverity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Zero-indexed line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// A single normalized diagnostic.
///
/// Fields are private; the translator is the only producer in the bridge.
/// Serializes to the host record shape
/// `{source, range, message, severity, code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    source: String,
    range: Range,
    message: String,
    severity: DiagnosticSeverity,
    /// Analyzer rule name (e.g. "reportMissingImports").
    code: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        range: Range,
        message: impl Into<String>,
        severity: DiagnosticSeverity,
        code: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            range,
            message: message.into(),
            severity,
            code: code.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Format as `path:line:col: severity: [rule] message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            path.display(),
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.severity.label(),
            self.code,
            self.message,
        )
    }
}

/// Immutable snapshot of all cached diagnostics.
///
/// Counts are computed from `files`, never cached alongside it.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    /// Per-file diagnostics, sorted with error-containing files first.
    files: Vec<(PathBuf, Vec<Diagnostic>)>,
}

impl DiagnosticsSnapshot {
    /// Construct a snapshot from already-sorted per-file diagnostics.
    #[must_use]
    pub fn new(files: Vec<(PathBuf, Vec<Diagnostic>)>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[(PathBuf, Vec<Diagnostic>)] {
        &self.files
    }

    /// Whether any file has at least one diagnostic.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    fn count_by_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|d| d.severity() == severity)
            .count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Warning)
    }

    #[must_use]
    pub fn info_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Information)
    }

    #[must_use]
    pub fn hint_count(&self) -> usize {
        self.count_by_severity(DiagnosticSeverity::Hint)
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|(_, items)| items.len()).sum()
    }

    /// Format a compact status string like "E:3 W:5".
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("E:{} W:{}", self.error_count(), self.warning_count())
    }
}
