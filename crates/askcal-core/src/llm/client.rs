//! Chat-completion HTTP client
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (including
//! local proxies).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::tool::FunctionSpec;

use super::ChatBackend;
use super::types::*;

/// Model backend client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl LlmClient {
    /// Create a new client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: completions_endpoint(&config.base_url),
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the resolved chat-completion URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Resolve the chat-completion URL from a base URL
///
/// A URL already pointing at `/chat/completions` is used as-is.
fn completions_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, messages: &[Message], tools: &[FunctionSpec]) -> Result<Message> {
        let request = ChatCompletionRequest::new(&self.model, messages, tools);

        debug!(
            "Sending request to model backend: {} ({} messages)",
            self.endpoint,
            messages.len()
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Model backend error: {} - {}", status, body);
            return Err(Error::Backend(format!("{}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Backend(format!("Failed to parse response: {} - {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Backend("Response contained no choices".to_string()))?;

        info!(
            "Model backend response: finish_reason={:?}, tool_calls={}, tokens={}",
            choice.finish_reason,
            choice.message.tool_calls.len(),
            parsed.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0)
        );

        let mut message = choice.message;
        message.role = Role::Assistant;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            base_url: format!("{}/v1", server.uri()),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_completions_endpoint() {
        assert_eq!(
            completions_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://proxy/v1/"),
            "http://proxy/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://proxy/v1/chat/completions"),
            "http://proxy/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_complete_returns_tool_calls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "test-model", "tool_choice": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "listEvents", "arguments": "{}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, Some("sk-test"))).unwrap();
        let tools = vec![FunctionSpec::new("listEvents", "List", json!({"type": "object"}))];
        let message = client
            .complete(&[Message::user("What do I have today?")], &tools)
            .await
            .unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].name, "listEvents");
    }

    #[tokio::test]
    async fn test_complete_non_success_is_backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, None)).unwrap();
        let result = client.complete(&[Message::user("hi")], &[]).await;

        match result {
            Err(Error::Backend(msg)) => assert!(msg.contains("bad gateway")),
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, None)).unwrap();
        let result = client.complete(&[Message::user("hi")], &[]).await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
