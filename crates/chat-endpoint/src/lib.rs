//! Chat-Endpoint: LLM chat completion client for repograde
//!
//! This crate is the only place that talks to a language model. It exposes a
//! small [`ChatClient`] trait so the grading pipeline can be driven by the real
//! Ollama endpoint in production and by [`fakes::ScriptedChatClient`] in tests.
//!
//! The endpoint is treated as opaque: a request goes in, raw response text
//! comes out, and every failure is surfaced as a [`ChatError`] value.

pub mod error;
pub mod fakes;
pub mod ollama;

pub use error::ChatError;
pub use ollama::{OllamaClient, OllamaConfig, DEFAULT_OLLAMA_HOST, DEFAULT_TIMEOUT_SECS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for chat-endpoint operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Role attached to a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Sampling options sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Context window size hint, in tokens
    pub num_ctx: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            num_ctx: 9000,
            temperature: 0.01,
        }
    }
}

/// A fully-formed chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier, e.g. `deepseek-r1:8b`
    pub model: String,
    /// Ordered conversation
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
}

impl ChatRequest {
    /// Single-turn request carrying one user prompt
    pub fn single_prompt(model: &str, prompt: String, options: ChatOptions) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            options,
        }
    }
}

/// A chat completion endpoint.
///
/// Implementations return the assistant's raw text exactly as produced; no
/// cleanup or parsing happens at this layer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}
