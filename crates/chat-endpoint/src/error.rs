//! Error types for chat-endpoint

use thiserror::Error;

/// Errors that can occur while talking to a chat completion endpoint
#[derive(Error, Debug)]
pub enum ChatError {
    /// Transport failure (connection refused, DNS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Endpoint timed out before producing a response
    #[error("chat request timed out after {0}s")]
    Timeout(u64),

    /// Endpoint answered with a non-success status
    #[error("chat endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the JSON shape we expect
    #[error("malformed chat response: {0}")]
    MalformedResponse(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Http(err.to_string())
    }
}
