//! ConversationState: in-memory conversation history for one process run.
//!
//! Responsibilities:
//! - Append messages in the exact order of model requests and tool results
//! - Keep the optional system prompt first
//! - Build `Vec<ChatMessage>` for the inference client
//!
//! History is never persisted and never shrinks.

use crate::inference::types::{ChatMessage, FunctionCallResponse, Role, ToolCallResponse};

use super::types::{ConversationMessage, ToolInvocationRequest};

// ─── ConversationState ──────────────────────────────────────────────────────

/// Ordered message history.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<ConversationMessage>,
}

impl ConversationState {
    /// Create a conversation, optionally starting with a system prompt.
    pub fn new(system_prompt: Option<&str>) -> Self {
        let mut state = Self::default();
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            state
                .messages
                .push(ConversationMessage::new(Role::System, Some(prompt.to_string())));
        }
        state
    }

    // ─── Message Operations ─────────────────────────────────────────────

    /// Add a user message to the conversation.
    pub fn add_user_message(&mut self, content: &str) {
        self.messages
            .push(ConversationMessage::new(Role::User, Some(content.to_string())));
    }

    /// Add an assistant text message to the conversation.
    pub fn add_assistant_message(&mut self, content: &str) {
        self.messages
            .push(ConversationMessage::new(Role::Assistant, Some(content.to_string())));
    }

    /// Add a completed tool exchange: the assistant's call and its result.
    ///
    /// The two messages are always appended together so a tool result
    /// immediately follows the call it answers.
    pub fn add_tool_exchange(&mut self, call: &ToolInvocationRequest, result: &str) {
        let mut request = ConversationMessage::new(Role::Assistant, None);
        request.tool_call = Some(call.clone());
        self.messages.push(request);

        let mut response = ConversationMessage::new(Role::Tool, Some(result.to_string()));
        response.tool_call_id = Some(call.id.clone());
        self.messages.push(response);
    }

    // ─── Queries ────────────────────────────────────────────────────────

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// Build the `Vec<ChatMessage>` to send to the inference client.
    pub fn build_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(to_chat_message).collect()
    }
}

fn to_chat_message(msg: &ConversationMessage) -> ChatMessage {
    match (&msg.role, &msg.tool_call) {
        (Role::Assistant, Some(call)) => ChatMessage::assistant_tool_calls(vec![ToolCallResponse {
            id: call.id.clone(),
            r#type: "function".to_string(),
            function: FunctionCallResponse {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }]),
        (Role::Tool, _) => ChatMessage::tool_result(
            msg.tool_call_id.clone().unwrap_or_default(),
            msg.content.clone().unwrap_or_default(),
        ),
        (Role::System, _) => ChatMessage::system(msg.content.clone().unwrap_or_default()),
        (Role::User, _) => ChatMessage::user(msg.content.clone().unwrap_or_default()),
        (Role::Assistant, None) => {
            ChatMessage::assistant(msg.content.clone().unwrap_or_default())
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
