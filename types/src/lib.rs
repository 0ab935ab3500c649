//! Core domain types for pyright-bridge.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The bridge crate and the host binary both build on these.

mod diagnostic;
mod settings;

pub use diagnostic::{
    DIAGNOSTIC_SOURCE, Diagnostic, DiagnosticSeverity, DiagnosticsSnapshot, Position, Range,
};
pub use settings::{
    AnalyzerVariant, DEFAULT_INITIAL_TIMEOUT_SECS, DEFAULT_UPDATE_TIMEOUT_SECS, PLUGIN_NAME,
    PyrightSettings, SettingsError, settings_schema,
};
