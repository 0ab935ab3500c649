use serde::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
};

use pyright_bridge::PyrightSettings;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "PYRIGHT_BRIDGE_CONFIG";

const DATA_DIR: &str = ".pyright-bridge";

/// Contents of `~/.pyright-bridge/config.toml`.
///
/// ```toml
/// [pyright]
/// based = true
/// level = "warning"
/// update_timeout = 3.0
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfig {
    pub pyright: Option<PyrightSettings>,
}

impl BridgeConfig {
    /// Load from the configured path. A missing or unreadable file yields
    /// defaults.
    #[must_use]
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    /// `~/.pyright-bridge`, home of the config file and the logs.
    #[must_use]
    pub fn data_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DATA_DIR))
    }

    #[must_use]
    pub fn settings(&self) -> PyrightSettings {
        self.pyright.clone().unwrap_or_default()
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    BridgeConfig::data_dir().map(|dir| dir.join("config.toml"))
}
