//! Capability discovery: enumerate what a connected session offers.
//!
//! Servers are not required to implement every list method. A server that
//! answers `prompts/list` or `resources/list` with "method not found" simply
//! contributes no prompts or resources. Any other failure aborts discovery
//! for that session.

use std::future::Future;

use super::errors::McpError;
use super::session::ProviderSession;
use super::types::DiscoveryResult;

/// Gather tools, prompts and resources from one session.
///
/// Performs all I/O up front; the returned value is committed to the
/// registry in a single step by the caller.
pub async fn discover(session: &dyn ProviderSession) -> Result<DiscoveryResult, McpError> {
    let name = session.name();

    let tools = optional_list(name, "tools/list", session.list_tools()).await?;
    let prompts = optional_list(name, "prompts/list", session.list_prompts()).await?;
    let resources = optional_list(name, "resources/list", session.list_resources()).await?;

    tracing::debug!(
        server = name,
        tools = tools.len(),
        prompts = prompts.len(),
        resources = resources.len(),
        "discovered capabilities"
    );

    Ok(DiscoveryResult {
        tools,
        prompts,
        resources,
    })
}

/// Await a list call, mapping "method not found" to an empty list.
async fn optional_list<T>(
    server: &str,
    method: &str,
    call: impl Future<Output = Result<Vec<T>, McpError>>,
) -> Result<Vec<T>, McpError> {
    match call.await {
        Ok(items) => Ok(items),
        Err(e) if e.is_method_not_found() => {
            tracing::debug!(server, method, "method not supported, treating as empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSession;

    #[tokio::test]
    async fn test_discover_collects_everything() {
        let session = FakeSession::new("research")
            .with_tool("search_papers")
            .with_tool("extract_info")
            .with_prompt("generate_search_prompt", &["topic", "num_papers"])
            .with_resource("papers://folders", "- physics");

        let result = discover(&session).await.unwrap();
        assert_eq!(result.tools.len(), 2);
        assert_eq!(result.tools[0].name, "search_papers");
        assert_eq!(result.prompts[0].arguments.len(), 2);
        assert_eq!(result.resources[0].uri, "papers://folders");
        assert_eq!(result.len(), 4);
    }

    #[tokio::test]
    async fn test_discover_tolerates_missing_prompt_support() {
        let session = FakeSession::new("tools-only")
            .with_tool("search")
            .without_prompts()
            .without_resources();

        let result = discover(&session).await.unwrap();
        assert_eq!(result.tools.len(), 1);
        assert!(result.prompts.is_empty());
        assert!(result.resources.is_empty());
    }

    #[tokio::test]
    async fn test_discover_propagates_transport_errors() {
        let session = FakeSession::new("broken").failing_discovery();
        let err = discover(&session).await.unwrap_err();
        assert!(matches!(err, McpError::TransportError { .. }));
    }
}
