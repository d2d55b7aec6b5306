//! OpenAI-compatible inference client.
//!
//! Sends non-streaming chat completion requests to the configured endpoint
//! and decodes each reply once, at this boundary, into a [`ModelReply`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use uuid::Uuid;

use super::config::ModelConfig;
use super::errors::InferenceError;
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelReply, ToolCallDirective,
    ToolDefinition,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ─── ChatModel ───────────────────────────────────────────────────────────────

/// A stateless chat-completion oracle.
///
/// The conversation engine depends on this trait only, so tests can drive
/// it with a scripted model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the full message history plus the tool catalog; return one reply.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError>;

    /// Human-readable model name for logs and the startup banner.
    fn model_name(&self) -> &str;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Does NOT check connectivity on construction; that happens on the first
/// request.
pub struct InferenceClient {
    http: HttpClient,
    config: ModelConfig,
}

impl InferenceClient {
    pub fn from_config(config: ModelConfig) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        if config.api_key.is_empty() {
            tracing::warn!(base_url = %config.base_url, "no API key configured");
        }

        Ok(Self { http, config })
    }

    /// The base URL of the model endpoint.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> ChatCompletionRequest {
        let tools = (!tools.is_empty()).then(|| tools.to_vec());
        ChatCompletionRequest {
            model: self.config.model_name.clone(),
            messages: messages.to_vec(),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl ChatModel for InferenceClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        let url = self.config.completions_url();
        let body = self.build_request(messages, tools);

        // Request metadata only; the body can be large.
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            max_tokens = body.max_tokens,
            "=== LLM REQUEST ==="
        );

        let mut request = self.http.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: self.config.request_timeout_secs,
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| InferenceError::ResponseParse {
            reason: format!("failed to read response body: {e}"),
        })?;

        let reply = parse_completion_response(&body_text)?;
        match &reply {
            ModelReply::Text(text) => {
                tracing::info!(chars = text.len(), "=== LLM RESPONSE: text ===");
            }
            ModelReply::ToolCalls(calls) => {
                tracing::info!(
                    tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "=== LLM RESPONSE: tool calls ==="
                );
            }
        }
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

// ─── Response Parsing ────────────────────────────────────────────────────────

/// Decode a non-streaming completion body into a [`ModelReply`].
///
/// Any tool call in the first choice makes the reply a `ToolCalls`; missing
/// tool-call ids are synthesized. Absent content is an empty text reply.
pub fn parse_completion_response(body: &str) -> Result<ModelReply, InferenceError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::ResponseParse {
            reason: "empty choices array".into(),
        })?;

    let calls: Vec<ToolCallDirective> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallDirective {
            id: tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
            raw_arguments: tc.function.raw_arguments(),
            name: tc.function.name,
        })
        .collect();

    if calls.is_empty() {
        Ok(ModelReply::Text(choice.message.content.unwrap_or_default()))
    } else {
        Ok(ModelReply::ToolCalls(calls))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::Role;

    fn test_config() -> ModelConfig {
        ModelConfig {
            base_url: "http://localhost:11434/v1".into(),
            model_name: "test-model".into(),
            api_key: String::new(),
            temperature: Some(0.3),
            max_tokens: 512,
            request_timeout_secs: 5,
            system_prompt: None,
        }
    }

    #[test]
    fn test_parse_text_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_completion_response(body).unwrap(),
            ModelReply::Text("Hello!".into())
        );
    }

    #[test]
    fn test_parse_null_content_is_empty_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(
            parse_completion_response(body).unwrap(),
            ModelReply::Text(String::new())
        );
    }

    #[test]
    fn test_parse_tool_calls_in_order() {
        let body = r#"{"choices":[{"message":{"content":"","tool_calls":[
            {"id":"call_a","type":"function","function":{"name":"search_papers","arguments":"{\"topic\":\"physics\"}"}},
            {"id":"call_b","type":"function","function":{"name":"extract_info","arguments":"{}"}}
        ]},"finish_reason":"tool_calls"}]}"#;
        match parse_completion_response(body).unwrap() {
            ModelReply::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id, "call_a");
                assert_eq!(calls[0].name, "search_papers");
                assert_eq!(calls[0].raw_arguments, r#"{"topic":"physics"}"#);
                assert_eq!(calls[1].name, "extract_info");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_synthesizes_missing_ids() {
        let body = r#"{"choices":[{"message":{"tool_calls":[
            {"function":{"name":"fetch","arguments":"{}"}}
        ]}}]}"#;
        match parse_completion_response(body).unwrap() {
            ModelReply::ToolCalls(calls) => assert!(calls[0].id.starts_with("call_")),
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_completion_response("not json"),
            Err(InferenceError::ResponseParse { .. })
        ));
        assert!(matches!(
            parse_completion_response(r#"{"choices":[]}"#),
            Err(InferenceError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_build_request_omits_empty_tools() {
        let client = InferenceClient::from_config(test_config()).unwrap();
        let req = client.build_request(&[ChatMessage::user("hi")], &[]);
        assert!(req.tools.is_none());
        assert!(req.tool_choice.is_none());
        assert_eq!(req.model, "test-model");
        assert_eq!(req.messages[0].role, Role::User);
        assert!(!req.stream);
    }

    #[test]
    fn test_build_request_with_tools() {
        let client = InferenceClient::from_config(test_config()).unwrap();
        let tools = vec![ToolDefinition::function(
            "search_papers",
            "Search arXiv",
            serde_json::json!({"type": "object"}),
        )];
        let req = client.build_request(&[ChatMessage::user("hi")], &tools);
        assert_eq!(req.tools.as_ref().map(Vec::len), Some(1));
        assert_eq!(req.tool_choice.as_deref(), Some("auto"));
        assert_eq!(req.temperature, Some(0.3));
        assert_eq!(client.model_name(), "test-model");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let mut config = test_config();
        config.base_url = "http://127.0.0.1:9".into();
        let client = InferenceClient::from_config(config).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ConnectionFailed { .. } | InferenceError::Timeout { .. }
        ));
    }
}
