//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::mcp_client::{CapabilityKind, McpError};

/// Errors that end a conversation turn early.
///
/// None of these leave partial tool-call or tool-result messages behind;
/// the conversation stays well-formed and the next turn can proceed.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No connected server owns the referenced tool, prompt or resource.
    #[error("{kind} not found: '{name}'")]
    CapabilityNotFound { kind: CapabilityKind, name: String },

    /// The model's tool-call arguments were not a JSON object.
    #[error("malformed arguments for tool '{tool}': {reason}")]
    MalformedToolArguments { tool: String, reason: String },

    /// The owning server failed to execute the invocation.
    #[error("'{capability}' failed: {reason}")]
    ToolInvocationFailure { capability: String, reason: String },

    /// The chat model request failed.
    #[error("model error: {0}")]
    Model(#[from] InferenceError),

    /// A model call was attempted with no messages.
    #[error("conversation is empty")]
    EmptyConversation,
}

impl AgentError {
    /// Classify an MCP failure for the capability being invoked.
    pub fn from_mcp(capability: &str, err: McpError) -> Self {
        match err {
            McpError::CapabilityNotFound { kind, name } => {
                AgentError::CapabilityNotFound { kind, name }
            }
            McpError::InvocationFailed { reason, .. } => AgentError::ToolInvocationFailure {
                capability: capability.to_string(),
                reason,
            },
            other => AgentError::ToolInvocationFailure {
                capability: capability.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// A one-line suggestion shown under the error, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AgentError::Model(e) if e.is_auth_error() => Some(
                "the model endpoint rejected the API key; set DEEPSEEK_API_KEY or api_key in the model config",
            ),
            _ => None,
        }
    }
}
