//! Host-side plumbing for the `pyright-bridge` binary: config loading and
//! the stdin/stdout line protocol.

pub mod config;
pub mod host;

pub use config::BridgeConfig;
