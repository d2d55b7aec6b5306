//! Provider configuration loading.
//!
//! Reads the JSON servers file (`{"mcpServers": {...}}`) and resolves
//! `${VAR}` / `${VAR:-default}` references in the parsed string fields, so
//! substituted values never pass through the JSON parser.

use std::path::Path;

use super::errors::McpError;
use super::types::{McpServersConfig, ServerConfig};
use crate::inference::config::interpolate_env_vars;

/// Load the servers configuration file.
///
/// A missing or malformed file is an error: there is nothing useful to do
/// without knowing which servers to start.
pub fn load_servers_config(path: &Path) -> Result<McpServersConfig, McpError> {
    let raw = std::fs::read_to_string(path).map_err(|e| McpError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    let mut config: McpServersConfig =
        serde_json::from_str(&raw).map_err(|e| McpError::ConfigError {
            reason: format!("failed to parse {}: {e}", path.display()),
        })?;
    config.servers.values_mut().for_each(resolve_env_refs);

    for (name, server) in &config.servers {
        if server.command.trim().is_empty() {
            return Err(McpError::ConfigError {
                reason: format!("server '{name}' has an empty command"),
            });
        }
    }

    tracing::info!(
        path = %path.display(),
        server_count = config.servers.len(),
        servers = ?config.servers.keys().collect::<Vec<_>>(),
        "loaded MCP server config"
    );

    Ok(config)
}

/// Interpolate environment references in every launch field.
fn resolve_env_refs(server: &mut ServerConfig) {
    server.command = interpolate_env_vars(&server.command);
    for arg in &mut server.args {
        *arg = interpolate_env_vars(arg);
    }
    for value in server.env.values_mut() {
        *value = interpolate_env_vars(value);
    }
    if let Some(cwd) = &mut server.cwd {
        *cwd = interpolate_env_vars(cwd);
    }
}
