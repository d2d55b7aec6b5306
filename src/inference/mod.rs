//! Inference Client: OpenAI-compatible chat completions.
//!
//! This module handles all communication with the model endpoint:
//! - Non-streaming chat completions with a tool catalog
//! - Decoding replies into text or tool-call directives
//! - Model configuration loading from an optional YAML file
//!
//! The client speaks the OpenAI Chat Completions API, so switching from
//! DeepSeek to any compatible server is a config change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{ChatModel, InferenceClient};
pub use config::{load_model_config, ModelConfig};
pub use errors::InferenceError;
pub use types::{ChatMessage, ModelReply, Role, ToolCallDirective, ToolDefinition};
