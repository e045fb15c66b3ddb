//! Ollama chat client
//!
//! Talks to the `/api/chat` endpoint of a local or remote Ollama server with
//! streaming disabled, so one request yields one complete response body.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ChatError;
use crate::{ChatClient, ChatRequest, Result};

/// Local Ollama server address
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default upper bound for one chat call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Server base URL, without the `/api/chat` suffix
    pub base_url: String,
    /// Upper bound for a single chat call
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Create config for a specific server
    pub fn new(base_url: &str) -> Self {
        OllamaConfig {
            base_url: base_url.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

/// Ollama client for chat completions
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("repograde/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OllamaClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.config.timeout_secs)
        } else {
            ChatError::from(err)
        }
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = self.config.chat_url();
        info!(model = %request.model, url = %url, "Sending chat request");

        let response = self
            .http_client
            .post(&url)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let content = extract_content(&data)?;
        debug!(chars = content.chars().count(), "Received chat response");
        Ok(content)
    }
}

/// Build the `/api/chat` payload for a request
pub fn request_body(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request.messages,
        "stream": false,
        "options": {
            "num_ctx": request.options.num_ctx,
            "temperature": request.options.temperature,
        }
    })
}

/// Pull the assistant text out of an `/api/chat` response body.
///
/// Ollama versions differ: the text sits under `message.content`, under the
/// last entry of `messages`, or at the top level as `content`.
pub fn extract_content(data: &Value) -> Result<String> {
    if let Some(message) = data.get("message").and_then(Value::as_object) {
        return Ok(message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string());
    }

    if let Some(last) = data
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.last())
    {
        return Ok(last
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string());
    }

    match data.get("content") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ChatError::MalformedResponse(
            "top-level content is not a string".to_string(),
        )),
        None if data.is_object() => Ok(String::new()),
        None => Err(ChatError::MalformedResponse(
            "response body is not a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, ChatOptions};

    #[test]
    fn test_ollama_config_new() {
        let config = OllamaConfig::new("http://gpu-box:11434/");
        assert_eq!(config.chat_url(), "http://gpu-box:11434/api/chat");
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_ollama_config_with_timeout() {
        let config = OllamaConfig::new("http://localhost:11434").with_timeout_secs(5);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn request_body_disables_streaming() {
        let req = ChatRequest {
            model: "deepseek-r1:8b".to_string(),
            messages: vec![ChatMessage::user("hi")],
            options: ChatOptions::default(),
        };
        let body = request_body(&req);
        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], "deepseek-r1:8b");
        assert_eq!(body["options"]["num_ctx"], 9000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn extract_content_prefers_message_field() {
        let data = json!({"message": {"role": "assistant", "content": "{\"a\":1}"}, "content": "x"});
        assert_eq!(extract_content(&data).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn extract_content_falls_back_to_last_message() {
        let data = json!({"messages": [{"content": "first"}, {"content": "last"}]});
        assert_eq!(extract_content(&data).unwrap(), "last");
    }

    #[test]
    fn extract_content_falls_back_to_top_level() {
        let data = json!({"content": "bare"});
        assert_eq!(extract_content(&data).unwrap(), "bare");
        assert_eq!(extract_content(&json!({})).unwrap(), "");
    }

    #[test]
    fn extract_content_rejects_non_object_body() {
        let err = extract_content(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_gracefully() {
        // Port 9 (discard) is closed on loopback in test environments.
        let client =
            OllamaClient::new(OllamaConfig::new("http://127.0.0.1:9").with_timeout_secs(5))
                .unwrap();
        let req = ChatRequest::single_prompt("m", "p".to_string(), ChatOptions::default());

        let result = client.chat(&req).await;
        assert!(matches!(
            result,
            Err(ChatError::Http(_)) | Err(ChatError::Timeout(_))
        ));
    }
}
