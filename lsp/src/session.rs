//! Lint session: the per-save pipeline over one supervisor and one store.
//!
//! A save runs: supervisor (make sure an analyzer covers the file) → reader
//! (drain reports until the analyzer goes quiet) → translator + store
//! (replace-then-populate) → answer from the store.
//!
//! The session owns every piece of mutable state. It is not `Sync`-shared;
//! hand it to a [`LintService`](crate::LintService) when requests come from
//! more than one task.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use pyright_bridge_types::{Diagnostic, DiagnosticsSnapshot, PyrightSettings};

use crate::codec::DrainError;
use crate::command::AnalyzerCommand;
use crate::diagnostics::DiagnosticsStore;
use crate::protocol::AnalyzerReport;
use crate::server::AnalyzerSupervisor;

/// Where the analyzer command line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandSource {
    /// Rebuilt from settings on every reconfigure.
    Settings,
    /// Fixed at construction; reconfigure only changes timeouts.
    Fixed,
}

pub struct LintSession {
    settings: PyrightSettings,
    workspace_root: PathBuf,
    command_source: CommandSource,
    supervisor: AnalyzerSupervisor,
    store: DiagnosticsStore,
}

impl LintSession {
    /// A session running the analyzer selected by `settings`.
    pub fn new(settings: PyrightSettings, workspace_root: impl Into<PathBuf>) -> Self {
        let command = AnalyzerCommand::from_settings(&settings);
        Self::build(settings, workspace_root.into(), command, CommandSource::Settings)
    }

    /// A session running a fixed command instead of the configured analyzer.
    pub fn with_command(
        settings: PyrightSettings,
        workspace_root: impl Into<PathBuf>,
        command: AnalyzerCommand,
    ) -> Self {
        Self::build(settings, workspace_root.into(), command, CommandSource::Fixed)
    }

    fn build(
        settings: PyrightSettings,
        workspace_root: PathBuf,
        command: AnalyzerCommand,
        command_source: CommandSource,
    ) -> Self {
        Self {
            supervisor: AnalyzerSupervisor::new(command, workspace_root.clone()),
            settings,
            workspace_root,
            command_source,
            store: DiagnosticsStore::new(),
        }
    }

    /// Lint `document` after an editor event.
    ///
    /// Only saves trigger analysis; for unsaved edits this returns an empty
    /// list without touching the analyzer or the cache. Errors never escape:
    /// the cycle logs them, retires the analyzer if it misbehaved, and
    /// answers from the cache.
    pub async fn on_save(&mut self, document: &Path, saved: bool) -> Vec<Diagnostic> {
        if !saved {
            tracing::trace!(path = %document.display(), "Ignoring unsaved edit");
            return Vec::new();
        }

        let path = self.resolve(document);
        let per_line = self.read_timeout_for(&path);
        tracing::debug!(path = %path.display(), ?per_line, "Lint cycle");

        let drained = match self.supervisor.ensure_running(&path, &self.store).await {
            Ok(process) => process.drain(per_line).await,
            Err(e) => {
                tracing::error!(path = %path.display(), "Failed to start analyzer: {e:#}");
                return self.cached(&path);
            }
        };

        match drained {
            Ok(frames) => self.merge_frames(&path, frames),
            Err(DrainError { frames, source }) => {
                self.merge_frames(&path, frames);
                if source.is_stream_closed() {
                    tracing::warn!("Analyzer exited unexpectedly; restarting on next save");
                } else {
                    tracing::error!("Analyzer protocol error: {source}");
                }
                self.supervisor.invalidate().await;
            }
        }

        self.cached(&path)
    }

    /// The per-line read deadline a save of `path` would use.
    #[must_use]
    pub fn read_timeout_for(&self, path: &Path) -> Duration {
        if self.store.contains(&self.resolve(path)) {
            self.settings.update_timeout()
        } else {
            self.settings.initial_timeout()
        }
    }

    fn resolve(&self, document: &Path) -> PathBuf {
        if document.is_absolute() {
            normalize_lexically(document)
        } else {
            normalize_lexically(&self.workspace_root.join(document))
        }
    }

    fn cached(&self, path: &Path) -> Vec<Diagnostic> {
        self.store.get(path).map(<[Diagnostic]>::to_vec).unwrap_or_default()
    }

    fn merge_frames(&mut self, saved: &Path, frames: Vec<serde_json::Value>) {
        for frame in frames {
            let report = match AnalyzerReport::from_value(frame) {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("Skipping analyzer frame that is not a report: {e}");
                    continue;
                }
            };

            if let Some(summary) = report.summary() {
                tracing::debug!(
                    files = ?summary.files_analyzed,
                    errors = ?summary.error_count,
                    warnings = ?summary.warning_count,
                    seconds = ?summary.time_in_sec,
                    "Analyzer pass finished"
                );
            }

            let stored = self.store.merge_report(saved, &report);
            tracing::debug!(stored, records = report.record_count(), "Merged report");
        }
    }

    /// Apply new settings. Timeouts take effect on the next save; a changed
    /// command line retires the running analyzer.
    pub async fn reconfigure(&mut self, settings: PyrightSettings) {
        if settings == self.settings {
            return;
        }
        if self.command_source == CommandSource::Settings {
            self.supervisor
                .reconfigure(AnalyzerCommand::from_settings(&settings))
                .await;
        }
        self.settings = settings;
    }

    pub async fn shutdown(&mut self) {
        self.supervisor.shutdown().await;
    }

    #[must_use]
    pub fn settings(&self) -> &PyrightSettings {
        &self.settings
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[must_use]
    pub fn supervisor(&self) -> &AnalyzerSupervisor {
        &self.supervisor
    }

    #[must_use]
    pub fn store(&self) -> &DiagnosticsStore {
        &self.store
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.store.snapshot()
    }
}

/// Collapse `.` and `..` without touching the filesystem, so store keys
/// match the normalized paths the analyzer reports.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
