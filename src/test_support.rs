//! In-process doubles for MCP sessions and the chat model.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::inference::types::{ChatMessage, ModelReply, ToolDefinition};
use crate::inference::{ChatModel, InferenceError};
use crate::mcp_client::errors::{CapabilityKind, McpError};
use crate::mcp_client::registry::uri_scheme;
use crate::mcp_client::session::ProviderSession;
use crate::mcp_client::types::{
    error_codes, CallToolResult, GetPromptResult, PromptArgument, PromptDescriptor,
    ReadResourceResult, ResourceDescriptor, ToolDescriptor,
};

pub type CallLog = Arc<Mutex<Vec<(String, serde_json::Value)>>>;
pub type RequestLog = Arc<Mutex<Vec<(Vec<ChatMessage>, Vec<ToolDefinition>)>>>;

// ─── FakeSession ────────────────────────────────────────────────────────────

/// A provider session backed by in-memory tables.
///
/// Tool calls echo the tool name and arguments. Prompts render as
/// `name: k=v ...` with keys sorted. Resources return their registered
/// content; unlisted addresses with a known scheme render as templated.
pub struct FakeSession {
    name: String,
    tools: Vec<ToolDescriptor>,
    failing_tools: HashSet<String>,
    prompts: Vec<PromptDescriptor>,
    resources: Vec<(ResourceDescriptor, String)>,
    prompts_supported: bool,
    resources_supported: bool,
    discovery_fails: bool,
    calls: CallLog,
    shutdown_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl FakeSession {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tools: Vec::new(),
            failing_tools: HashSet::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            prompts_supported: true,
            resources_supported: true,
            discovery_fails: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            shutdown_log: None,
        }
    }

    pub fn with_tool(mut self, name: &str) -> Self {
        self.tools.push(ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} tool"),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        });
        self
    }

    /// A tool whose invocation reports `isError`.
    pub fn with_failing_tool(mut self, name: &str) -> Self {
        self.failing_tools.insert(name.to_string());
        self.with_tool(name)
    }

    pub fn with_prompt(mut self, name: &str, args: &[&str]) -> Self {
        self.prompts.push(PromptDescriptor {
            name: name.to_string(),
            description: format!("{name} prompt"),
            arguments: args
                .iter()
                .map(|a| PromptArgument {
                    name: a.to_string(),
                    description: None,
                    required: true,
                })
                .collect(),
        });
        self
    }

    pub fn with_resource(mut self, uri: &str, content: &str) -> Self {
        self.resources.push((
            ResourceDescriptor {
                uri: uri.to_string(),
                name: None,
                description: None,
                mime_type: Some("text/plain".to_string()),
            },
            content.to_string(),
        ));
        self
    }

    /// `prompts/list` answers "method not found".
    pub fn without_prompts(mut self) -> Self {
        self.prompts_supported = false;
        self
    }

    /// `resources/list` answers "method not found".
    pub fn without_resources(mut self) -> Self {
        self.resources_supported = false;
        self
    }

    /// `tools/list` fails with a transport error.
    pub fn failing_discovery(mut self) -> Self {
        self.discovery_fails = true;
        self
    }

    pub fn with_shutdown_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.shutdown_log = Some(log);
        self
    }

    /// Handle to the recorded `tools/call` invocations.
    pub fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn method_not_found(method: &str) -> McpError {
        McpError::ServerError {
            code: error_codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }
}

#[async_trait]
impl ProviderSession for FakeSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        if self.discovery_fails {
            return Err(McpError::TransportError {
                server: self.name.clone(),
                reason: "server closed stdout".into(),
            });
        }
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, McpError> {
        if !self.prompts_supported {
            return Err(Self::method_not_found("prompts/list"));
        }
        Ok(self.prompts.clone())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        if !self.resources_supported {
            return Err(Self::method_not_found("resources/list"));
        }
        Ok(self.resources.iter().map(|(r, _)| r.clone()).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), arguments.clone()));
        }
        if self.failing_tools.contains(name) {
            return Err(McpError::InvocationFailed {
                kind: CapabilityKind::Tool,
                name: name.to_string(),
                reason: "tool raised an exception".into(),
            });
        }
        Ok(CallToolResult::text(format!("{name} result for {arguments}")))
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<GetPromptResult, McpError> {
        let sorted: BTreeMap<_, _> = arguments.iter().collect();
        let rendered: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Ok(GetPromptResult::text(format!("{name}: {}", rendered.join(" "))))
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if let Some((_, content)) = self.resources.iter().find(|(r, _)| r.uri == uri) {
            return Ok(ReadResourceResult::text(uri, content.clone()));
        }
        let scheme = uri_scheme(uri);
        if scheme.is_some() && self.resources.iter().any(|(r, _)| uri_scheme(&r.uri) == scheme) {
            return Ok(ReadResourceResult::text(uri, format!("templated {uri} from {}", self.name)));
        }
        Err(McpError::ServerError {
            code: error_codes::INVALID_PARAMS,
            message: format!("unknown resource {uri}"),
            data: None,
        })
    }

    async fn shutdown(&mut self) -> Result<(), McpError> {
        if let Some(log) = &self.shutdown_log {
            if let Ok(mut log) = log.lock() {
                log.push(self.name.clone());
            }
        }
        Ok(())
    }
}

// ─── ScriptedModel ──────────────────────────────────────────────────────────

/// A chat model that plays back canned replies and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    repeat: Option<ModelReply>,
    requests: RequestLog,
}

impl ScriptedModel {
    /// Replies in order; once exhausted every call fails.
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The same reply on every call.
    pub fn repeating(reply: ModelReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((messages.to_vec(), tools.to_vec()));
        }
        if let Some(reply) = &self.repeat {
            return Ok(reply.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .ok_or(InferenceError::ResponseParse {
                reason: "script exhausted".into(),
            })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
