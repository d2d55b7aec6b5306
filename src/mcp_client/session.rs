//! Provider session abstraction.
//!
//! A session is one live connection to an MCP server. The registry and the
//! conversation engine only ever talk to servers through this trait, which
//! keeps them independent of the stdio transport.

use std::collections::HashMap;

use async_trait::async_trait;

use super::errors::McpError;
use super::types::{
    CallToolResult, GetPromptResult, PromptDescriptor, ReadResourceResult, ResourceDescriptor,
    ToolDescriptor,
};

/// One connected capability provider.
///
/// All operations are single-shot request/response exchanges.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// The configured server name (e.g. `"research"`).
    fn name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError>;

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, McpError>;

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError>;

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<GetPromptResult, McpError>;

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, McpError>;

    /// Release the connection and any process behind it.
    async fn shutdown(&mut self) -> Result<(), McpError>;
}
