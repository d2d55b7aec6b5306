//! Shared types for the agent core.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::inference::types::Role;

// ─── Conversation Messages ──────────────────────────────────────────────────

/// A single message stored in conversation history.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
    /// Message role: system, user, assistant, or tool.
    pub role: Role,
    /// Text content (user messages, assistant text, system prompt, tool result).
    pub content: Option<String>,
    /// The tool call made by the assistant in this message.
    pub tool_call: Option<ToolInvocationRequest>,
    /// For `tool` role: the ID of the tool call this result belongs to.
    pub tool_call_id: Option<String>,
}

impl ConversationMessage {
    pub(crate) fn new(role: Role, content: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            role,
            content,
            tool_call: None,
            tool_call_id: None,
        }
    }

    /// Whether this is an assistant message carrying a tool call.
    pub fn is_tool_call(&self) -> bool {
        self.role == Role::Assistant && self.tool_call.is_some()
    }
}

// ─── Tool Invocation ────────────────────────────────────────────────────────

/// A decoded tool call, ready to route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocationRequest {
    pub id: String,
    pub name: String,
    /// Always a JSON object.
    pub arguments: serde_json::Value,
}

// ─── Turn Outcome ───────────────────────────────────────────────────────────

/// What one conversation turn produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// The text to show the user.
    pub text: String,
    /// Tools invoked during the turn, in order.
    pub tool_calls: Vec<ToolInvocationRequest>,
    /// Number of model round-trips the turn used.
    pub model_calls: usize,
    /// Whether the turn stopped at the round-trip bound.
    pub hit_limit: bool,
}
