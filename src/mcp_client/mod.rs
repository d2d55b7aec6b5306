//! MCP Client: JSON-RPC over stdio for MCP server sessions.
//!
//! This module handles:
//! - Spawning MCP server child processes and the initialize handshake
//! - JSON-RPC 2.0 communication over process stdio
//! - Tool, prompt and resource discovery across all servers
//! - Routing invocations to the session that owns each capability
//! - Orderly shutdown of every session
//!
//! The conversation engine and the command dispatcher reach servers only
//! through [`McpClient`].

pub mod client;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod lifecycle;
pub mod registry;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::McpClient;
pub use config::load_servers_config;
pub use errors::{CapabilityKind, McpError};
pub use registry::{CapabilityRegistry, NamespaceMode, SessionId};
pub use session::ProviderSession;
pub use types::{McpServersConfig, ServerConfig, ToolDescriptor};
