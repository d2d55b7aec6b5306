//! Agent Core: the conversation layer of papers-chat.
//!
//! Submodules:
//! - `agent_loop`: Bounded tool-calling turns against the chat model
//! - `conversation`: In-memory conversation history
//! - `tool_router`: Decodes model tool calls and dispatches them to MCP servers
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod agent_loop;
pub mod conversation;
pub mod errors;
pub mod tool_router;
pub mod types;

// Re-exports for convenience
pub use agent_loop::{ConversationEngine, MAX_MODEL_CALLS, TOOL_LIMIT_SENTINEL};
pub use conversation::ConversationState;
pub use errors::AgentError;
pub use types::{ConversationMessage, ToolInvocationRequest, TurnOutcome};
