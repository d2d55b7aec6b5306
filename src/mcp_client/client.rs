//! MCP Client: high-level interface over every connected server.
//!
//! Owns the live sessions and the capability registry built from them, and
//! routes tool calls, prompt requests and resource reads to the session that
//! owns each capability. This is the only API the conversation engine and
//! the command dispatcher use.

use std::collections::HashMap;
use std::time::Instant;

use super::discovery;
use super::errors::McpError;
use super::lifecycle;
use super::registry::{CapabilityRegistry, NamespaceMode, SessionId};
use super::session::ProviderSession;
use super::types::McpServersConfig;

// ─── McpClient ───────────────────────────────────────────────────────────────

/// Connected sessions plus the registry of what they offer.
pub struct McpClient {
    /// Live sessions in acquisition order; index is the [`SessionId`].
    sessions: Vec<Box<dyn ProviderSession>>,
    /// Aggregated capabilities from all sessions.
    pub registry: CapabilityRegistry,
}

impl McpClient {
    /// Create a client with no sessions.
    pub fn new(mode: NamespaceMode) -> Self {
        Self {
            sessions: Vec::new(),
            registry: CapabilityRegistry::new(mode),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Connect to every configured server and build the registry.
    ///
    /// Servers are started one at a time in configuration order. A server
    /// that fails to start or to answer discovery is excluded and returned
    /// with its error; startup continues with the rest.
    pub async fn start_all(&mut self, config: &McpServersConfig) -> Vec<(String, McpError)> {
        let (sessions, mut errors) = lifecycle::spawn_all_servers(&config.servers).await;

        for session in sessions {
            let session: Box<dyn ProviderSession> = Box::new(session);
            if let Err((name, e)) = self.attach(session).await {
                errors.push((name, e));
            }
        }

        for (name, e) in &errors {
            tracing::warn!(server = %name, error = %e, "server excluded");
        }

        errors
    }

    /// Build a client from already-connected sessions.
    ///
    /// Sessions whose discovery fails are shut down and dropped.
    pub async fn from_sessions(
        sessions: Vec<Box<dyn ProviderSession>>,
        mode: NamespaceMode,
    ) -> (Self, Vec<(String, McpError)>) {
        let mut client = Self::new(mode);
        let mut errors = Vec::new();
        for session in sessions {
            if let Err(failure) = client.attach(session).await {
                errors.push(failure);
            }
        }
        (client, errors)
    }

    /// Discover a session's capabilities and, on success, register it.
    async fn attach(&mut self, mut session: Box<dyn ProviderSession>) -> Result<(), (String, McpError)> {
        let name = session.name().to_string();
        match discovery::discover(session.as_ref()).await {
            Ok(found) => {
                let id: SessionId = self.sessions.len();
                tracing::info!(
                    server = %name,
                    session = id,
                    tools = found.tools.len(),
                    prompts = found.prompts.len(),
                    resources = found.resources.len(),
                    "server connected"
                );
                self.registry.register(id, found);
                self.sessions.push(session);
                Ok(())
            }
            Err(e) => {
                if let Err(shutdown_err) = session.shutdown().await {
                    tracing::debug!(server = %name, error = %shutdown_err, "shutdown after failed discovery");
                }
                Err((name, e))
            }
        }
    }

    /// Shut down every session, most recently connected first.
    pub async fn shutdown_all(&mut self) {
        lifecycle::shutdown_all_sessions(&mut self.sessions).await;
        self.registry = CapabilityRegistry::new(self.registry.mode());
    }

    // ─── Invocation ──────────────────────────────────────────────────────

    /// Invoke a tool on its owning session and return the rendered result.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, McpError> {
        let id = self.registry.resolve_tool(tool_name)?;
        let session = self.session(id);
        let start = Instant::now();

        let result = session.call_tool(tool_name, arguments).await?;

        tracing::debug!(
            tool = tool_name,
            server = session.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tool call completed"
        );
        Ok(result.render())
    }

    /// Render a prompt template on its owning session.
    pub async fn get_prompt(
        &self,
        prompt_name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, McpError> {
        let id = self.registry.resolve_prompt(prompt_name)?;
        let result = self.session(id).get_prompt(prompt_name, arguments).await?;
        Ok(result.render())
    }

    /// Read a resource from the session that serves its address.
    pub async fn read_resource(&self, address: &str) -> Result<String, McpError> {
        let id = self.registry.resolve_resource(address)?;
        let result = self.session(id).read_resource(address).await?;
        Ok(result.render())
    }

    fn session(&self, id: SessionId) -> &dyn ProviderSession {
        self.sessions[id].as_ref()
    }

    // ─── Status ──────────────────────────────────────────────────────────

    /// Number of connected sessions.
    pub fn running_server_count(&self) -> usize {
        self.sessions.len()
    }

    /// Names of connected sessions, in connection order.
    pub fn running_servers(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.name().to_string()).collect()
    }

    /// Check if a server with this name is connected.
    pub fn is_server_running(&self, name: &str) -> bool {
        self.sessions.iter().any(|s| s.name() == name)
    }

    pub fn tool_count(&self) -> usize {
        self.registry.tool_count()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp_client::errors::CapabilityKind;
    use crate::test_support::FakeSession;

    async fn client_with(sessions: Vec<FakeSession>) -> (McpClient, Vec<(String, McpError)>) {
        let boxed = sessions
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn ProviderSession>)
            .collect();
        McpClient::from_sessions(boxed, NamespaceMode::Partitioned).await
    }

    #[test]
    fn test_new_client_empty() {
        let client = McpClient::new(NamespaceMode::default());
        assert_eq!(client.running_server_count(), 0);
        assert_eq!(client.tool_count(), 0);
        assert!(client.registry.is_empty());
        assert!(!client.is_server_running("research"));
    }

    #[tokio::test]
    async fn test_failed_discovery_excludes_server() {
        let (client, errors) = client_with(vec![
            FakeSession::new("research").with_tool("search_papers"),
            FakeSession::new("broken").with_tool("lost").failing_discovery(),
        ])
        .await;

        assert_eq!(client.running_servers(), vec!["research"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "broken");
        assert!(client.registry.resolve_tool("lost").is_err());
    }

    #[tokio::test]
    async fn test_call_tool_routes_to_owner() {
        let research = FakeSession::new("research").with_tool("search_papers");
        let fetch = FakeSession::new("fetch").with_tool("fetch");
        let fetch_calls = fetch.calls();
        let research_calls = research.calls();
        let (client, _) = client_with(vec![research, fetch]).await;

        let out = client
            .call_tool("fetch", serde_json::json!({"url": "https://example.com"}))
            .await
            .unwrap();
        assert!(out.contains("fetch"));
        assert_eq!(fetch_calls.lock().unwrap().len(), 1);
        assert!(research_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let (client, _) = client_with(vec![FakeSession::new("research")]).await;
        let err = client
            .call_tool("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            McpError::CapabilityNotFound {
                kind: CapabilityKind::Tool,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_read_resource_and_prompt() {
        let (client, _) = client_with(vec![FakeSession::new("research")
            .with_resource("papers://folders", "- physics\n- biology")
            .with_prompt("generate_search_prompt", &["topic"])])
        .await;

        let folders = client.read_resource("papers://folders").await.unwrap();
        assert_eq!(folders, "- physics\n- biology");

        let mut args = HashMap::new();
        args.insert("topic".to_string(), "math".to_string());
        let prompt = client
            .get_prompt("generate_search_prompt", &args)
            .await
            .unwrap();
        assert!(prompt.contains("generate_search_prompt"));
        assert!(prompt.contains("topic=math"));
    }

    #[tokio::test]
    async fn test_shutdown_all_runs_in_reverse_order() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let (mut client, _) = client_with(vec![
            FakeSession::new("a").with_shutdown_log(log.clone()),
            FakeSession::new("b").with_shutdown_log(log.clone()),
            FakeSession::new("c").with_shutdown_log(log.clone()),
        ])
        .await;

        client.shutdown_all().await;
        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
        assert_eq!(client.running_server_count(), 0);
        assert!(client.registry.is_empty());
    }
}
