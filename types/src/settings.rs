//! Resolved analyzer settings.
//!
//! Raw deserialization structs (with `bool` flags and float seconds) stay
//! private. The deserialization boundary resolves them into
//! [`PyrightSettings`], whose existence is the proof of its validity.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Plugin name under which the host stores these settings.
pub const PLUGIN_NAME: &str = "pyright_bridge";

pub const DEFAULT_UPDATE_TIMEOUT_SECS: f64 = 3.0;

pub const DEFAULT_INITIAL_TIMEOUT_SECS: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidTimeout { field: &'static str, value: f64 },
}

#[derive(Deserialize)]
#[serde(default)]
struct RawPyrightSettings {
    based: bool,
    level: Option<String>,
    pythonpath: Option<String>,
    ignoreexternal: bool,
    skipunannotated: bool,
    update_timeout: f64,
    initial_timeout: f64,
}

impl Default for RawPyrightSettings {
    fn default() -> Self {
        Self {
            based: true,
            level: None,
            pythonpath: None,
            ignoreexternal: false,
            skipunannotated: false,
            update_timeout: DEFAULT_UPDATE_TIMEOUT_SECS,
            initial_timeout: DEFAULT_INITIAL_TIMEOUT_SECS,
        }
    }
}

/// Which member of the pyright family to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyzerVariant {
    Basedpyright,
    Pyright,
}

impl AnalyzerVariant {
    fn from_based(based: bool) -> Self {
        if based { Self::Basedpyright } else { Self::Pyright }
    }

    #[must_use]
    pub fn executable(self) -> &'static str {
        match self {
            Self::Basedpyright => "basedpyright",
            Self::Pyright => "pyright",
        }
    }
}

/// Validated analyzer settings.
///
/// Invariant: both timeouts are positive and finite (enforced via
/// `#[serde(try_from)]` at the deserialization boundary).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPyrightSettings")]
pub struct PyrightSettings {
    variant: AnalyzerVariant,
    level: Option<String>,
    python_path: Option<PathBuf>,
    ignore_external: bool,
    skip_unannotated: bool,
    update_timeout: Duration,
    initial_timeout: Duration,
}

fn timeout_from_secs(field: &'static str, value: f64) -> Result<Duration, SettingsError> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(SettingsError::InvalidTimeout { field, value }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<RawPyrightSettings> for PyrightSettings {
    type Error = SettingsError;

    fn try_from(raw: RawPyrightSettings) -> Result<Self, Self::Error> {
        let update_timeout = timeout_from_secs("update_timeout", raw.update_timeout)?;
        let initial_timeout = timeout_from_secs("initial_timeout", raw.initial_timeout)?;
        Ok(Self {
            variant: AnalyzerVariant::from_based(raw.based),
            level: non_blank(raw.level),
            python_path: non_blank(raw.pythonpath).map(PathBuf::from),
            ignore_external: raw.ignoreexternal,
            skip_unannotated: raw.skipunannotated,
            update_timeout,
            initial_timeout,
        })
    }
}

impl Default for PyrightSettings {
    fn default() -> Self {
        let raw = RawPyrightSettings::default();
        Self {
            variant: AnalyzerVariant::from_based(raw.based),
            level: raw.level,
            python_path: raw.pythonpath.map(PathBuf::from),
            ignore_external: raw.ignoreexternal,
            skip_unannotated: raw.skipunannotated,
            update_timeout: Duration::from_secs_f64(raw.update_timeout),
            initial_timeout: Duration::from_secs_f64(raw.initial_timeout),
        }
    }
}

impl PyrightSettings {
    #[must_use]
    pub fn variant(&self) -> AnalyzerVariant {
        self.variant
    }

    /// Minimum diagnostic level passed as `--level`.
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    #[must_use]
    pub fn python_path(&self) -> Option<&Path> {
        self.python_path.as_deref()
    }

    #[must_use]
    pub fn ignore_external(&self) -> bool {
        self.ignore_external
    }

    #[must_use]
    pub fn skip_unannotated(&self) -> bool {
        self.skip_unannotated
    }

    /// Per-read timeout once a file already has cached results.
    #[must_use]
    pub fn update_timeout(&self) -> Duration {
        self.update_timeout
    }

    /// Per-read timeout the first time a file is analyzed.
    #[must_use]
    pub fn initial_timeout(&self) -> Duration {
        self.initial_timeout
    }
}

/// Settings schema with defaults, as answered to the host's settings
/// provider callback.
#[must_use]
pub fn settings_schema() -> serde_json::Value {
    serde_json::json!({
        "plugins": {
            PLUGIN_NAME: {
                "enabled": true,
                "based": true,
                "level": null,
                "pythonpath": null,
                "ignoreexternal": false,
                "skipunannotated": false,
                "update_timeout": DEFAULT_UPDATE_TIMEOUT_SECS,
                "initial_timeout": DEFAULT_INITIAL_TIMEOUT_SECS,
            }
        }
    })
}
