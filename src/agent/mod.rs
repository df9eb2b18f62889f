//! The long-running agent: configuration, telemetry and the HTTP API.

pub mod config;
pub mod sensors;
pub mod server;
pub mod snapshot;

use std::path::Path;

use crate::error::AgentError;

/// Loads the config at `path` (or the environment) and serves until stopped.
pub fn serve(config_path: &Path) -> Result<(), AgentError> {
    let config = config::load(config_path)?;
    server::serve(config)
}
