//! Shared types for the MCP client.
//!
//! JSON-RPC 2.0 message types and MCP protocol structures.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// MCP protocol revision sent in the `initialize` handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message (success or error).
///
/// Servers may also send their own requests over the same stream. Those
/// carry a `method` and share the id space with ours, so `method` is kept
/// to tell them apart.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default)]
    pub method: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

// ─── Capability Descriptors ─────────────────────────────────────────────────

/// A tool as reported by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    /// The parameter schema, with a missing schema normalized to an empty object.
    pub fn parameters_schema(&self) -> serde_json::Value {
        if self.input_schema.is_null() {
            serde_json::json!({ "type": "object", "properties": {} })
        } else {
            self.input_schema.clone()
        }
    }
}

/// A named argument accepted by a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A prompt as reported by `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A readable resource as reported by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "mimeType")]
    pub mime_type: Option<String>,
}

/// Everything one session reported during discovery.
///
/// Gathered completely before it is committed to the registry.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub tools: Vec<ToolDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
}

impl DiscoveryResult {
    /// Total number of capabilities reported.
    pub fn len(&self) -> usize {
        self.tools.len() + self.prompts.len() + self.resources.len()
    }

    /// Whether the session reported nothing at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── List Responses ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default, alias = "nextCursor")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListPromptsResult {
    #[serde(default)]
    pub prompts: Vec<PromptDescriptor>,
    #[serde(default, alias = "nextCursor")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResourcesResult {
    #[serde(default)]
    pub resources: Vec<ResourceDescriptor>,
    #[serde(default, alias = "nextCursor")]
    pub next_cursor: Option<String>,
}

// ─── Invocation Results ─────────────────────────────────────────────────────

/// One content block in a tool result or prompt message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        data: String,
        #[serde(default, alias = "mimeType")]
        mime_type: Option<String>,
    },
    Resource {
        resource: ResourceContents,
    },
    #[serde(other)]
    Unsupported,
}

impl ContentItem {
    /// Plain-text rendering of this block.
    pub fn render(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { mime_type, .. } => {
                format!("[image: {}]", mime_type.as_deref().unwrap_or("unknown"))
            }
            Self::Resource { resource } => resource.render(),
            Self::Unsupported => "[unsupported content]".to_string(),
        }
    }
}

/// Join the text rendering of content blocks, one block per line.
pub fn render_content(items: &[ContentItem]) -> String {
    items
        .iter()
        .map(ContentItem::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default, alias = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Convenience constructor for a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn render(&self) -> String {
        render_content(&self.content)
    }
}

/// One message produced by `prompts/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMessage {
    #[serde(default)]
    pub role: String,
    pub content: PromptContent,
}

/// Prompt message content: a single block or a list of blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    Single(ContentItem),
    Many(Vec<ContentItem>),
}

impl PromptContent {
    fn render(&self) -> String {
        match self {
            Self::Single(item) => item.render(),
            Self::Many(items) => render_content(items),
        }
    }
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptResult {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

impl GetPromptResult {
    /// Convenience constructor for a single user text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            description: None,
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Single(ContentItem::Text { text: text.into() }),
            }],
        }
    }

    /// The prompt's messages flattened into a single query string.
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.render())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Contents of a resource, text or binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, alias = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub blob: Option<String>,
}

impl ResourceContents {
    pub fn render(&self) -> String {
        match (&self.text, &self.blob) {
            (Some(text), _) => text.clone(),
            (None, Some(_)) => format!(
                "[binary resource {} ({})]",
                self.uri,
                self.mime_type.as_deref().unwrap_or("application/octet-stream")
            ),
            (None, None) => String::new(),
        }
    }
}

/// Result of `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceResult {
    #[serde(default)]
    pub contents: Vec<ResourceContents>,
}

impl ReadResourceResult {
    /// Convenience constructor for a single text resource.
    pub fn text(uri: &str, text: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: Some(text.into()),
                blob: None,
            }],
        }
    }

    pub fn render(&self) -> String {
        self.contents
            .iter()
            .map(ResourceContents::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─── Server Configuration ───────────────────────────────────────────────────

/// Launch descriptor for one MCP server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Per-server working directory.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Top-level MCP servers configuration file.
///
/// Servers are kept in a sorted map so startup order is stable.
#[derive(Debug, Clone, Deserialize)]
pub struct McpServersConfig {
    #[serde(alias = "mcpServers")]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// MCP initialize response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(default, alias = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(default, alias = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Server info returned in the initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

// ─── Standard MCP Error Codes ────────────────────────────────────────────────

/// Well-known JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ─── Tests ───────────────────────────────────────────────────────────────────
