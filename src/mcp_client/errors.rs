//! MCP Client error types.

use std::fmt;

use thiserror::Error;

/// The kind of capability a lookup was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// A server process failed to start.
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// JSON-RPC communication error (malformed message, I/O error).
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server error [{code}]: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// No connected server owns the requested tool, prompt or resource.
    #[error("{kind} not found: '{name}'")]
    CapabilityNotFound {
        kind: CapabilityKind,
        name: String,
    },

    /// The server executed the request but reported a failure
    /// (`isError: true` on a tool result).
    #[error("{kind} '{name}' failed: {reason}")]
    InvocationFailed {
        kind: CapabilityKind,
        name: String,
        reason: String,
    },

    /// A response payload did not have the expected shape.
    #[error("unexpected response to '{method}' from '{server}': {reason}")]
    InvalidResponse {
        server: String,
        method: String,
        reason: String,
    },

    /// Configuration error (missing servers, bad config file).
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl McpError {
    /// Whether this error means the provider could not be brought up at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, McpError::SpawnFailed { .. } | McpError::InitFailed { .. })
    }

    /// Whether a JSON-RPC error response means "method not found".
    pub fn is_method_not_found(&self) -> bool {
        matches!(
            self,
            McpError::ServerError { code, .. }
                if *code == super::types::error_codes::METHOD_NOT_FOUND
        )
    }
}
