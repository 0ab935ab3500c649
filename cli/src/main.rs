//! pyright-bridge - serve analyzer diagnostics to an editor over stdio.
//!
//! ```text
//! pyright-bridge [WORKSPACE_ROOT]
//! ```
//!
//! Requests and responses are JSON lines on stdin/stdout (see
//! [`pyright_bridge_cli::host`]). Logs go to `~/.pyright-bridge/logs/`
//! because stdout belongs to the host.

use anyhow::{Context, Result};
use std::{
    env,
    fs::{self, File, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tokio::io::{BufReader, stdin, stdout};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pyright_bridge::{LintService, LintSession};
use pyright_bridge_cli::{BridgeConfig, host};

const LOG_FILE: &str = "pyright-bridge.log";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: drop logs rather than interleave them with protocol
    // output on stdout.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.pyright-bridge/logs/pyright-bridge.log
    if let Some(data_dir) = BridgeConfig::data_dir() {
        candidates.push(data_dir.join("logs").join(LOG_FILE));
    }

    // Fallback: ./.pyright-bridge/logs/pyright-bridge.log
    candidates.push(PathBuf::from(".pyright-bridge").join("logs").join(LOG_FILE));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let workspace_root = match env::args_os().nth(1) {
        Some(root) => PathBuf::from(root),
        None => env::current_dir().context("resolving workspace root")?,
    };

    let config = BridgeConfig::load();
    let settings = config.settings();
    tracing::info!(
        root = %workspace_root.display(),
        analyzer = settings.variant().executable(),
        "Starting pyright bridge"
    );

    let handle = LintService::spawn(LintSession::new(settings, workspace_root));
    host::serve(BufReader::new(stdin()), stdout(), &handle).await
}
