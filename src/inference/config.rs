//! Model configuration loading and validation.
//!
//! Reads an optional YAML file and resolves environment variables. Every
//! field has a default so the client runs against DeepSeek with nothing
//! but `DEEPSEEK_API_KEY` set.

use std::path::Path;

use serde::Deserialize;

use super::errors::InferenceError;

// ─── Defaults ────────────────────────────────────────────────────────────────

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL_NAME: &str = "deepseek-chat";
const DEFAULT_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// ─── Public Types ────────────────────────────────────────────────────────────

/// Runtime configuration of the chat model endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible API root, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model_name: String,
    /// Bearer token. Empty means no `Authorization` header is sent.
    pub api_key: String,
    /// Omitted from requests when unset, leaving the server default.
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Placed first in the conversation when set.
    pub system_prompt: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            api_key: std::env::var(DEFAULT_API_KEY_VAR).unwrap_or_default(),
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    /// The full completions endpoint URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn validate(&self) -> Result<(), InferenceError> {
        if self.base_url.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "base_url must not be empty".into(),
            });
        }
        if self.model_name.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "model_name must not be empty".into(),
            });
        }
        if self.max_tokens == 0 {
            return Err(InferenceError::ConfigError {
                reason: "max_tokens must be positive".into(),
            });
        }
        Ok(())
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load the model configuration.
///
/// With no path, defaults are used. With a path, the file must exist and
/// parse; `${VAR_NAME}` and `${VAR_NAME:-default}` are interpolated first.
pub fn load_model_config(path: Option<&Path>) -> Result<ModelConfig, InferenceError> {
    let config = match path {
        None => ModelConfig::default(),
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
                reason: format!("failed to read {}: {e}", path.display()),
            })?;
            parse_model_config(&raw)?
        }
    };

    config.validate()?;
    Ok(config)
}

fn parse_model_config(raw: &str) -> Result<ModelConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(ModelConfig::default());
    }
    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse model config: {e}"),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
pub(crate) fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
