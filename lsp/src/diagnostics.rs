//! Diagnostics store: per-file diagnostics accumulated from analyzer reports.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use pyright_bridge_types::{Diagnostic, DiagnosticsSnapshot};

use crate::protocol::{AnalyzerReport, translate};

/// Mapping from file path to its current diagnostics.
///
/// A key exists once the analyzer has reported on the file, even if the
/// latest report left it clean. Keys are never removed.
#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    data: HashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the analyzer has reported on `path` at least once.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.data.contains_key(path)
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&[Diagnostic]> {
        self.data.get(path).map(Vec::as_slice)
    }

    /// Number of files with a cached entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Merge one report drained while linting `saved`.
    ///
    /// Every covered file (`saved` plus each file named by a record) is reset
    /// to an empty list first, then the report's diagnostics are distributed
    /// in report order. Files the report does not mention keep their entries.
    /// Returns the number of diagnostics stored.
    pub fn merge_report(&mut self, saved: &Path, report: &AnalyzerReport) -> usize {
        let mut covered: BTreeSet<PathBuf> = BTreeSet::from([saved.to_path_buf()]);
        let mut placed: Vec<(PathBuf, Diagnostic)> = Vec::with_capacity(report.record_count());

        for record in report.records() {
            let Some(file) = record.file.clone() else {
                tracing::warn!(?record, "Dropping analyzer record without a file");
                continue;
            };
            covered.insert(file.clone());
            if let Some(diagnostic) = translate(&record) {
                placed.push((file, diagnostic));
            }
        }

        for path in covered {
            self.data.insert(path, Vec::new());
        }

        let stored = placed.len();
        for (path, diagnostic) in placed {
            self.data.entry(path).or_default().push(diagnostic);
        }
        stored
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let mut files: Vec<(PathBuf, Vec<Diagnostic>)> = self
            .data
            .iter()
            .map(|(path, items)| (path.clone(), items.clone()))
            .collect();

        // Sort: files with errors first, then alphabetically
        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|d| d.severity().is_error());
            let b_has_errors = b.1.iter().any(|d| d.severity().is_error());
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot::new(files)
    }
}
