//! Bridge between an editor host and a watch-mode pyright analyzer.
//!
//! The analyzer runs as a long-lived child process that re-checks its
//! watched files and prints brace-delimited JSON reports on stdout. Each
//! save drains those reports, folds them into a per-file cache, and answers
//! with the cached diagnostics for the saved file.

pub mod codec;
pub mod protocol;

pub(crate) mod diagnostics;
pub(crate) mod server;

mod command;
mod service;
mod session;

pub use command::AnalyzerCommand;
pub use diagnostics::DiagnosticsStore;
pub use server::{AnalyzerProcess, AnalyzerSupervisor};
pub use service::{LintHandle, LintRequest, LintService, ServiceClosed};
pub use session::LintSession;

pub use pyright_bridge_types::{
    Diagnostic, DiagnosticSeverity, DiagnosticsSnapshot, PyrightSettings,
};
