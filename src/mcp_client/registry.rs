//! Capability registry: aggregates discovery results across all MCP servers.
//!
//! Provides:
//! - Tool and prompt lookup by name, returning the owning session
//! - Resource lookup by address, with a scheme-level fallback
//! - The ordered tool catalog handed to the model
//!
//! Names are unique per registry, not per server. When two servers expose the
//! same name, the one registered later owns it (last write wins).

use std::collections::HashMap;

use super::errors::{CapabilityKind, McpError};
use super::types::{DiscoveryResult, PromptDescriptor, ResourceDescriptor, ToolDescriptor};

/// Index of a session in the client's session list.
pub type SessionId = usize;

/// Whether tools and prompts share one name space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespaceMode {
    /// Tools and prompts are looked up independently.
    #[default]
    Partitioned,
    /// A tool and a prompt with the same name collide; the later one wins.
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Namespace {
    Tools,
    Prompts,
    Shared,
}

// ─── CapabilityRegistry ─────────────────────────────────────────────────────

/// Aggregated registry across all connected servers.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    mode: NamespaceMode,
    /// `(namespace, name) → owning session`.
    owners: HashMap<(Namespace, String), SessionId>,
    /// Tool descriptors in discovery order.
    tools: Vec<ToolDescriptor>,
    tool_index: HashMap<String, usize>,
    /// Prompt descriptors in discovery order.
    prompts: Vec<PromptDescriptor>,
    prompt_index: HashMap<String, usize>,
    /// Resources in discovery order, with their owner.
    resources: Vec<(ResourceDescriptor, SessionId)>,
    resource_index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new(mode: NamespaceMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> NamespaceMode {
        self.mode
    }

    /// Commit everything one session reported during discovery.
    ///
    /// The discovery result is complete before this is called, so a session's
    /// capabilities appear in the registry all at once.
    pub fn register(&mut self, session: SessionId, discovery: DiscoveryResult) {
        for tool in discovery.tools {
            let key = (self.namespace(CapabilityKind::Tool), tool.name.clone());
            self.claim(key, session);
            upsert(&mut self.tools, &mut self.tool_index, tool.name.clone(), tool);
        }

        for prompt in discovery.prompts {
            let key = (self.namespace(CapabilityKind::Prompt), prompt.name.clone());
            self.claim(key, session);
            upsert(
                &mut self.prompts,
                &mut self.prompt_index,
                prompt.name.clone(),
                prompt,
            );
        }

        for resource in discovery.resources {
            match self.resource_index.get(&resource.uri) {
                Some(&idx) => {
                    tracing::debug!(
                        uri = %resource.uri,
                        previous = self.resources[idx].1,
                        session,
                        "resource owner replaced"
                    );
                    self.resources[idx] = (resource, session);
                }
                None => {
                    self.resource_index
                        .insert(resource.uri.clone(), self.resources.len());
                    self.resources.push((resource, session));
                }
            }
        }
    }

    fn namespace(&self, kind: CapabilityKind) -> Namespace {
        match (self.mode, kind) {
            (NamespaceMode::Shared, _) => Namespace::Shared,
            (NamespaceMode::Partitioned, CapabilityKind::Prompt) => Namespace::Prompts,
            (NamespaceMode::Partitioned, _) => Namespace::Tools,
        }
    }

    fn claim(&mut self, key: (Namespace, String), session: SessionId) {
        if let Some(previous) = self.owners.insert(key.clone(), session) {
            if previous != session {
                tracing::debug!(
                    name = %key.1,
                    previous,
                    session,
                    "capability owner replaced"
                );
            }
        }
    }

    // ─── Resolution ─────────────────────────────────────────────────────

    /// The session that owns a tool.
    pub fn resolve_tool(&self, name: &str) -> Result<SessionId, McpError> {
        self.resolve_named(CapabilityKind::Tool, name)
    }

    /// The session that owns a prompt.
    pub fn resolve_prompt(&self, name: &str) -> Result<SessionId, McpError> {
        self.resolve_named(CapabilityKind::Prompt, name)
    }

    fn resolve_named(&self, kind: CapabilityKind, name: &str) -> Result<SessionId, McpError> {
        self.owners
            .get(&(self.namespace(kind), name.to_string()))
            .copied()
            .ok_or_else(|| McpError::CapabilityNotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// The session that can serve a resource address.
    ///
    /// Exact address match first. Otherwise, if the address has a
    /// `scheme://` prefix, the first session (in registration order) owning
    /// any resource with that scheme. The fallback is a convenience for
    /// servers that serve templated addresses they do not list.
    pub fn resolve_resource(&self, address: &str) -> Result<SessionId, McpError> {
        if let Some(&idx) = self.resource_index.get(address) {
            return Ok(self.resources[idx].1);
        }

        if let Some(scheme) = uri_scheme(address) {
            let fallback = self
                .resources
                .iter()
                .find(|(res, _)| uri_scheme(&res.uri) == Some(scheme));
            if let Some((res, session)) = fallback {
                tracing::debug!(
                    address,
                    via = %res.uri,
                    session,
                    "resolved resource by scheme fallback"
                );
                return Ok(*session);
            }
        }

        Err(McpError::CapabilityNotFound {
            kind: CapabilityKind::Resource,
            name: address.to_string(),
        })
    }

    // ─── Catalogs ───────────────────────────────────────────────────────

    /// Tool descriptors in discovery order, as handed to the model.
    pub fn tool_catalog(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Prompt descriptors in discovery order.
    pub fn prompts(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    /// Resource descriptors in discovery order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter().map(|(res, _)| res)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Whether no capability of any kind is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.prompts.is_empty() && self.resources.is_empty()
    }

    /// Count the tools currently owned by a session.
    pub fn tools_for_session(&self, session: SessionId) -> usize {
        self.tools
            .iter()
            .filter(|t| self.resolve_tool(&t.name).ok() == Some(session))
            .count()
    }

    /// One-line summary of the registry for logs and the startup banner.
    pub fn capability_summary(&self) -> String {
        if self.is_empty() {
            return "No MCP capabilities available.".to_string();
        }
        format!(
            "Available capabilities: {} tools, {} prompts, {} resources.",
            self.tool_count(),
            self.prompt_count(),
            self.resource_count(),
        )
    }
}

/// Insert or replace a descriptor, keeping the original position on replace.
fn upsert<T>(items: &mut Vec<T>, index: &mut HashMap<String, usize>, name: String, item: T) {
    match index.get(&name) {
        Some(&idx) => items[idx] = item,
        None => {
            index.insert(name, items.len());
            items.push(item);
        }
    }
}

/// Extract the scheme of a `scheme://rest` address.
pub fn uri_scheme(address: &str) -> Option<&str> {
    address
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
