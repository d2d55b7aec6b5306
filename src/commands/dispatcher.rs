//! Command dispatcher: classifies each input line and routes it.
//!
//! Grammar:
//! - `quit` (any case) ends the session
//! - `@folders` / `@<topic>` reads a resource directly, without the model
//! - `/prompts`, `/prompt <name> [key=value ...]`, `/tools`, `/resources`, `/help`
//! - anything else is a free-form query for the conversation engine

use std::collections::HashMap;

use crate::agent_core::{AgentError, ConversationEngine, TurnOutcome};
use crate::mcp_client::McpClient;

/// Default scheme for `@` resource shortcuts.
pub const DEFAULT_RESOURCE_SCHEME: &str = "papers";

pub const HELP_TEXT: &str = "\
Commands:
  @folders                 List available topic folders
  @<topic>                 Show papers saved under a topic
  /prompts                 List available prompts
  /prompt <name> [k=v ...] Run a prompt with arguments
  /tools                   List available tools
  /resources               List available resources
  /help                    Show this help
  quit                     Exit
Anything else is sent to the model.";

// ─── Parsing ────────────────────────────────────────────────────────────────

/// One classified line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    /// Read the resource at this address.
    ReadResource(String),
    ListPrompts,
    RunPrompt {
        name: String,
        args: HashMap<String, String>,
    },
    ListTools,
    ListResources,
    Help,
    /// Malformed command; the message explains the expected form.
    Invalid(String),
    Query(String),
}

/// Classify a raw input line.
pub fn parse_command(input: &str, resource_scheme: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Empty;
    }
    if input.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }

    // Only the prefix is stripped; `@ folders` names the topic " folders".
    if let Some(rest) = input.strip_prefix('@') {
        if rest.is_empty() {
            return Command::Invalid("usage: @folders or @<topic>".into());
        }
        return Command::ReadResource(resource_address(resource_scheme, rest));
    }

    if input.starts_with('/') {
        let mut tokens = input.split_whitespace();
        let command = tokens.next().unwrap_or_default();
        return match command {
            "/prompts" => Command::ListPrompts,
            "/tools" => Command::ListTools,
            "/resources" => Command::ListResources,
            "/help" => Command::Help,
            "/prompt" => match tokens.next() {
                Some(name) => Command::RunPrompt {
                    name: name.to_string(),
                    args: parse_prompt_args(tokens),
                },
                None => Command::Invalid("usage: /prompt <name> [key=value ...]".into()),
            },
            other => Command::Invalid(format!("unknown command: {other} (try /help)")),
        };
    }

    Command::Query(input.to_string())
}

/// Map an `@` suffix to a resource address.
///
/// `folders` is the folder index; anything else is a topic under the scheme.
pub fn resource_address(scheme: &str, rest: &str) -> String {
    if rest == "folders" {
        format!("{scheme}://folders")
    } else {
        format!("{scheme}://{rest}")
    }
}

/// Collect `key=value` tokens; tokens without `=` are dropped.
///
/// Only the first `=` splits, so values may themselves contain `=`.
pub fn parse_prompt_args<'a>(tokens: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    tokens
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

// ─── Dispatch ───────────────────────────────────────────────────────────────

/// What the surface should do with a handled line.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Quit,
    Nothing,
    /// Print verbatim.
    Text(String),
    /// Print the turn's tool-call lines and its answer.
    Turn(TurnOutcome),
    /// Print as an error; nothing changed.
    Invalid(String),
}

/// Routes classified input to the registry or the conversation engine.
pub struct Dispatcher {
    mcp_client: McpClient,
    engine: ConversationEngine,
    resource_scheme: String,
}

impl Dispatcher {
    pub fn new(mcp_client: McpClient, engine: ConversationEngine, resource_scheme: &str) -> Self {
        Self {
            mcp_client,
            engine,
            resource_scheme: resource_scheme.to_string(),
        }
    }

    pub fn mcp_client(&self) -> &McpClient {
        &self.mcp_client
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    /// Handle one line of input.
    ///
    /// Errors are per-line: the caller reports them and keeps going.
    pub async fn handle(&mut self, input: &str) -> Result<Reply, AgentError> {
        match parse_command(input, &self.resource_scheme) {
            Command::Empty => Ok(Reply::Nothing),
            Command::Quit => Ok(Reply::Quit),
            Command::Help => Ok(Reply::Text(HELP_TEXT.to_string())),
            Command::Invalid(message) => Ok(Reply::Invalid(message)),
            Command::ListPrompts => Ok(Reply::Text(self.format_prompts())),
            Command::ListTools => Ok(Reply::Text(self.format_tools())),
            Command::ListResources => Ok(Reply::Text(self.format_resources())),
            Command::ReadResource(address) => {
                tracing::debug!(%address, "reading resource");
                let content = self
                    .mcp_client
                    .read_resource(&address)
                    .await
                    .map_err(|e| AgentError::from_mcp(&address, e))?;
                Ok(Reply::Text(content))
            }
            Command::RunPrompt { name, args } => {
                tracing::debug!(prompt = %name, ?args, "running prompt");
                let text = self
                    .mcp_client
                    .get_prompt(&name, &args)
                    .await
                    .map_err(|e| AgentError::from_mcp(&name, e))?;
                let outcome = self.engine.run_turn(&self.mcp_client, &text).await?;
                Ok(Reply::Turn(outcome))
            }
            Command::Query(query) => {
                let outcome = self.engine.run_turn(&self.mcp_client, &query).await?;
                Ok(Reply::Turn(outcome))
            }
        }
    }

    /// Release every MCP session.
    pub async fn shutdown(&mut self) {
        self.mcp_client.shutdown_all().await;
    }

    // ─── Listings ───────────────────────────────────────────────────────

    fn format_prompts(&self) -> String {
        let prompts = self.mcp_client.registry.prompts();
        if prompts.is_empty() {
            return "No prompts available.".to_string();
        }
        let mut out = String::from("Available prompts:");
        for prompt in prompts {
            out.push_str(&format!("\n- {}: {}", prompt.name, prompt.description));
            if !prompt.arguments.is_empty() {
                out.push_str("\n  Arguments:");
                for arg in &prompt.arguments {
                    out.push_str(&format!("\n    - {}", arg.name));
                    if arg.required {
                        out.push_str(" (required)");
                    }
                }
            }
        }
        out
    }

    fn format_tools(&self) -> String {
        let tools = self.mcp_client.registry.tool_catalog();
        if tools.is_empty() {
            return "No tools available.".to_string();
        }
        let mut out = String::from("Available tools:");
        for tool in tools {
            out.push_str(&format!("\n- {}: {}", tool.name, tool.description));
        }
        out
    }

    fn format_resources(&self) -> String {
        let mut out = String::new();
        for resource in self.mcp_client.registry.resources() {
            out.push_str(&format!("\n- {}", resource.uri));
            if let Some(name) = &resource.name {
                out.push_str(&format!(" ({name})"));
            }
        }
        if out.is_empty() {
            "No resources available.".to_string()
        } else {
            format!("Available resources:{out}")
        }
    }
}

/// Render a turn the way the REPL prints it: one line per tool call, then
/// the answer.
pub fn format_turn(outcome: &TurnOutcome) -> String {
    let mut lines: Vec<String> = outcome
        .tool_calls
        .iter()
        .map(|call| format!("[Calling tool {} with args {}]", call.name, call.arguments))
        .collect();
    lines.push(outcome.text.clone());
    lines.join("\n")
}

// ─── Tests ──────────────────────────────────────────────────────────────────
