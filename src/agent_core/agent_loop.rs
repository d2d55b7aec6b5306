//! ConversationEngine: the bounded tool-calling loop.
//!
//! One turn:
//! 1. Append the user query
//! 2. Call the model with the full history and the tool catalog
//! 3. Text reply → append it and return
//! 4. Tool-call reply → route the first directive, append the call and its
//!    result, and call the model again
//!
//! A turn makes at most [`MAX_MODEL_CALLS`] model calls. If the last allowed
//! reply still asks for a tool, that tool is not run and the turn ends with
//! [`TOOL_LIMIT_SENTINEL`].

use crate::inference::types::{ModelReply, ToolDefinition};
use crate::inference::ChatModel;
use crate::mcp_client::{McpClient, ToolDescriptor};

use super::conversation::ConversationState;
use super::errors::AgentError;
use super::tool_router;
use super::types::TurnOutcome;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Model calls per turn, including the first one.
pub const MAX_MODEL_CALLS: usize = 5;

/// Assistant text recorded when a turn hits [`MAX_MODEL_CALLS`].
pub const TOOL_LIMIT_SENTINEL: &str = "max tool call limit reached";

// ─── ConversationEngine ─────────────────────────────────────────────────────

/// Drives turns against a chat model, routing tool calls through MCP.
pub struct ConversationEngine {
    model: Box<dyn ChatModel>,
    state: ConversationState,
}

impl ConversationEngine {
    pub fn new(model: Box<dyn ChatModel>, system_prompt: Option<&str>) -> Self {
        Self {
            model,
            state: ConversationState::new(system_prompt),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Process one user query to completion.
    ///
    /// On error the turn stops immediately. Only complete tool exchanges are
    /// ever appended, so the history stays valid for the next turn.
    pub async fn run_turn(
        &mut self,
        mcp_client: &McpClient,
        query: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let tools = tool_definitions(mcp_client.registry.tool_catalog());
        self.state.add_user_message(query);

        let mut outcome = TurnOutcome::default();

        for call_number in 1..=MAX_MODEL_CALLS {
            let messages = self.state.build_chat_messages();
            if messages.is_empty() {
                return Err(AgentError::EmptyConversation);
            }

            tracing::debug!(
                call_number,
                message_count = messages.len(),
                tool_count = tools.len(),
                "calling model"
            );
            let reply = self.model.complete(&messages, &tools).await?;
            outcome.model_calls = call_number;

            let directives = match reply {
                ModelReply::ToolCalls(directives) if !directives.is_empty() => directives,
                ModelReply::ToolCalls(_) => {
                    self.state.add_assistant_message("");
                    return Ok(outcome);
                }
                ModelReply::Text(text) => {
                    self.state.add_assistant_message(&text);
                    outcome.text = text;
                    return Ok(outcome);
                }
            };

            if call_number == MAX_MODEL_CALLS {
                tracing::warn!(
                    tool = %directives[0].name,
                    "model call limit reached, tool call not executed"
                );
                break;
            }

            if directives.len() > 1 {
                tracing::debug!(
                    ignored = directives.len() - 1,
                    "only the first tool call per reply is executed"
                );
            }

            let request = tool_router::decode_tool_call(&directives[0])?;
            let result = tool_router::dispatch_single(mcp_client, &request).await?;

            self.state.add_tool_exchange(&request, &result);
            outcome.tool_calls.push(request);
        }

        self.state.add_assistant_message(TOOL_LIMIT_SENTINEL);
        outcome.text = TOOL_LIMIT_SENTINEL.to_string();
        outcome.hit_limit = true;
        Ok(outcome)
    }
}

/// Render the registry's tool catalog in function-calling format.
pub fn tool_definitions(catalog: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    catalog
        .iter()
        .map(|tool| {
            ToolDefinition::function(&tool.name, &tool.description, tool.parameters_schema())
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
