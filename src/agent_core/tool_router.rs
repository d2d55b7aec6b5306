//! ToolRouter: turns model tool-call directives into MCP invocations.
//!
//! Handles:
//! - Decoding the model's raw argument text into a JSON object
//! - Execution via [`McpClient`] on the owning session
//! - Logging of every tool execution

use std::time::Instant;

use crate::inference::types::ToolCallDirective;
use crate::mcp_client::McpClient;

use super::errors::AgentError;
use super::types::ToolInvocationRequest;

/// Longest tool result preview written to the log.
const LOG_PREVIEW_CHARS: usize = 200;

/// Decode a directive's arguments.
///
/// An empty payload is `{}`. Anything that is not a JSON object is
/// [`AgentError::MalformedToolArguments`].
pub fn decode_tool_call(directive: &ToolCallDirective) -> Result<ToolInvocationRequest, AgentError> {
    let raw = directive.raw_arguments.trim();
    let arguments = if raw.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str::<serde_json::Value>(raw).map_err(|e| {
            AgentError::MalformedToolArguments {
                tool: directive.name.clone(),
                reason: e.to_string(),
            }
        })?
    };

    if !arguments.is_object() {
        return Err(AgentError::MalformedToolArguments {
            tool: directive.name.clone(),
            reason: format!("expected a JSON object, got {arguments}"),
        });
    }

    Ok(ToolInvocationRequest {
        id: directive.id.clone(),
        name: directive.name.clone(),
        arguments,
    })
}

/// Execute one decoded tool call and return its rendered result.
pub async fn dispatch_single(
    mcp_client: &McpClient,
    request: &ToolInvocationRequest,
) -> Result<String, AgentError> {
    let start = Instant::now();
    tracing::info!(tool = %request.name, args = %request.arguments, "dispatching tool call");

    match mcp_client
        .call_tool(&request.name, request.arguments.clone())
        .await
    {
        Ok(result) => {
            tracing::info!(
                tool = %request.name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                result_preview = %preview(&result),
                "tool call succeeded"
            );
            Ok(result)
        }
        Err(e) => {
            tracing::warn!(
                tool = %request.name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "tool call failed"
            );
            Err(AgentError::from_mcp(&request.name, e))
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
