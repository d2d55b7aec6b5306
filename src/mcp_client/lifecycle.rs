//! Server process lifecycle management.
//!
//! Handles spawning and shutting down MCP server child processes. Each
//! server runs as a separate OS process communicating via JSON-RPC over
//! stdio. A server that fails to come up is reported and skipped; there is
//! no restart.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};

use super::errors::{CapabilityKind, McpError};
use super::session::ProviderSession;
use super::transport::{extract_result, StdioTransport};
use super::types::{
    CallToolResult, GetPromptResult, InitializeResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, PromptDescriptor, ReadResourceResult, ResourceDescriptor, ServerConfig,
    ToolDescriptor, PROTOCOL_VERSION,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Timeout for the initialize handshake.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for graceful shutdown before force-killing.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on `nextCursor` pages followed by a single list call.
const MAX_LIST_PAGES: usize = 64;

/// Stderr captured on failure is cut to this many bytes.
const MAX_STDERR_CHARS: usize = 2000;

// ─── StdioSession ────────────────────────────────────────────────────────────

/// A running MCP server process with its transport.
pub struct StdioSession {
    /// Human-readable server name (e.g., "research").
    name: String,
    /// The child process handle.
    process: Child,
    /// JSON-RPC transport (stdin/stdout).
    transport: StdioTransport,
    /// Server info reported during initialization.
    pub server_info: InitializeResult,
}

impl StdioSession {
    /// Issue a request and decode its result payload.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<T, McpError> {
        let response = self.transport.request(method, params).await?;
        let result = extract_result(response)?;
        serde_json::from_value(result).map_err(|e| McpError::InvalidResponse {
            server: self.name.clone(),
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    /// Follow `nextCursor` pagination for a list method.
    async fn list_all<P, T>(
        &self,
        method: &str,
        split: impl Fn(P) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>, McpError>
    where
        P: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let page: P = self.call(method, params).await?;
            let (mut batch, next) = split(page);
            items.append(&mut batch);
            match next {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(items),
            }
        }

        tracing::warn!(server = %self.name, method, "pagination limit reached, list truncated");
        Ok(items)
    }
}

#[async_trait]
impl ProviderSession for StdioSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        self.list_all("tools/list", |p: ListToolsResult| (p.tools, p.next_cursor))
            .await
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, McpError> {
        self.list_all("prompts/list", |p: ListPromptsResult| (p.prompts, p.next_cursor))
            .await
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        self.list_all("resources/list", |p: ListResourcesResult| {
            (p.resources, p.next_cursor)
        })
        .await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        let result: CallToolResult = self.call("tools/call", Some(params)).await?;
        if result.is_error {
            return Err(McpError::InvocationFailed {
                kind: CapabilityKind::Tool,
                name: name.to_string(),
                reason: result.render(),
            });
        }
        Ok(result)
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<GetPromptResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.call("prompts/get", Some(params)).await
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        self.call("resources/read", Some(serde_json::json!({ "uri": uri })))
            .await
    }

    /// Close stdin, wait briefly for a clean exit, then force kill.
    async fn shutdown(&mut self) -> Result<(), McpError> {
        self.transport.close().await;

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.process.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(server = %self.name, %status, "server exited");
            }
            _ => {
                tracing::warn!(server = %self.name, "server did not exit in time, killing");
                let _ = self.process.kill().await;
            }
        }
        Ok(())
    }
}

// ─── Spawning ────────────────────────────────────────────────────────────────

/// Spawn a single MCP server process and perform the initialization handshake.
pub async fn spawn_server(name: &str, config: &ServerConfig) -> Result<StdioSession, McpError> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args);

    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    if let Some(dir) = config.cwd.as_deref() {
        cmd.current_dir(dir);
    }

    cmd.stdin(std::process::Stdio::piped());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
        name: name.to_string(),
        reason: format!("{e}"),
    })?;

    let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
        name: name.to_string(),
        reason: "failed to capture stdin".into(),
    })?;

    let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
        name: name.to_string(),
        reason: "failed to capture stdout".into(),
    })?;

    let stderr_handle = child.stderr.take();

    let transport = StdioTransport::new(name, stdin, stdout);

    let server_info = match tokio::time::timeout(INIT_TIMEOUT, initialize(&transport, name)).await
    {
        Ok(Ok(info)) => info,
        Ok(Err(e)) => {
            let _ = child.kill().await;
            let stderr_ctx = read_stderr_on_failure(stderr_handle).await;
            return Err(McpError::InitFailed {
                name: name.to_string(),
                reason: format!("{e}{}", format_stderr_suffix(&stderr_ctx)),
            });
        }
        Err(_) => {
            let _ = child.kill().await;
            let stderr_ctx = read_stderr_on_failure(stderr_handle).await;
            return Err(McpError::InitFailed {
                name: name.to_string(),
                reason: format!(
                    "initialization timed out after {}s{}",
                    INIT_TIMEOUT.as_secs(),
                    format_stderr_suffix(&stderr_ctx)
                ),
            });
        }
    };

    if let Some(stderr) = stderr_handle {
        tokio::spawn(forward_stderr(name.to_string(), stderr));
    }

    tracing::info!(
        server = name,
        server_name = ?server_info.server_info.as_ref().and_then(|i| i.name.as_deref()),
        protocol = ?server_info.protocol_version,
        "server initialized"
    );

    Ok(StdioSession {
        name: name.to_string(),
        process: child,
        transport,
        server_info,
    })
}

/// Perform the MCP initialization handshake.
async fn initialize(
    transport: &StdioTransport,
    server_name: &str,
) -> Result<InitializeResult, McpError> {
    let params = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    let response = transport.request("initialize", Some(params)).await?;
    let result = extract_result(response)?;

    let init_result: InitializeResult =
        serde_json::from_value(result).map_err(|e| McpError::InitFailed {
            name: server_name.to_string(),
            reason: format!("failed to parse initialize response: {e}"),
        })?;

    transport.notify("notifications/initialized", None).await?;

    Ok(init_result)
}

/// Read whatever a failed server wrote to stderr.
///
/// Bounded by a short timeout; output is truncated to keep log lines readable.
async fn read_stderr_on_failure(stderr_handle: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr_handle else {
        return String::new();
    };

    let mut buf = String::new();
    match tokio::time::timeout(Duration::from_millis(500), stderr.read_to_string(&mut buf)).await
    {
        Ok(Ok(_)) => truncate_stderr(buf),
        _ => String::new(),
    }
}

fn truncate_stderr(mut buf: String) -> String {
    if buf.len() > MAX_STDERR_CHARS {
        let mut cut = MAX_STDERR_CHARS;
        while !buf.is_char_boundary(cut) {
            cut -= 1;
        }
        buf.truncate(cut);
        buf.push_str("...(truncated)");
    }
    buf
}

/// Format a stderr suffix for error messages (empty string if no stderr).
fn format_stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(" | stderr: {}", stderr.trim())
    }
}

/// Drain a running server's stderr into the log so the pipe never fills up.
async fn forward_stderr(server: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(server = %server, "stderr: {line}");
    }
}

// ─── Batch Operations ────────────────────────────────────────────────────────

/// Spawn all configured servers one after another, in configuration order.
///
/// Servers that fail to start are returned alongside their error; partial
/// startup is acceptable.
pub async fn spawn_all_servers(
    configs: &BTreeMap<String, ServerConfig>,
) -> (Vec<StdioSession>, Vec<(String, McpError)>) {
    let mut sessions = Vec::new();
    let mut errors = Vec::new();

    for (name, config) in configs {
        match spawn_server(name, config).await {
            Ok(session) => sessions.push(session),
            Err(e) => errors.push((name.clone(), e)),
        }
    }

    (sessions, errors)
}

/// Shut down every session, most recently acquired first.
pub async fn shutdown_all_sessions(sessions: &mut Vec<Box<dyn ProviderSession>>) {
    while let Some(mut session) = sessions.pop() {
        if let Err(e) = session.shutdown().await {
            tracing::warn!(server = %session.name(), error = %e, "shutdown failed");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stderr_suffix() {
        assert_eq!(format_stderr_suffix(""), "");
        assert_eq!(format_stderr_suffix("  \n"), "");
        assert_eq!(
            format_stderr_suffix("ModuleNotFoundError: mcp\n"),
            " | stderr: ModuleNotFoundError: mcp"
        );
    }

    #[test]
    fn test_truncate_stderr_respects_char_boundaries() {
        let long = "é".repeat(MAX_STDERR_CHARS);
        let truncated = truncate_stderr(long);
        assert!(truncated.ends_with("...(truncated)"));
        assert!(truncated.len() <= MAX_STDERR_CHARS + "...(truncated)".len());
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let config = ServerConfig {
            command: "definitely-not-a-real-mcp-server-binary".into(),
            args: vec![],
            env: HashMap::new(),
            cwd: None,
        };
        let err = spawn_server("ghost", &config).await.err().unwrap();
        assert!(matches!(err, McpError::SpawnFailed { .. }));
        assert!(err.is_connection_failure());
    }

    #[tokio::test]
    async fn test_spawn_all_collects_failures() {
        let mut configs = BTreeMap::new();
        configs.insert(
            "ghost".to_string(),
            ServerConfig {
                command: "definitely-not-a-real-mcp-server-binary".into(),
                args: vec![],
                env: HashMap::new(),
                cwd: None,
            },
        );
        let (sessions, errors) = spawn_all_servers(&configs).await;
        assert!(sessions.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "ghost");
    }
}
