//! In-memory chat client (testing only)
//!
//! [`ScriptedChatClient`] replays a fixed queue of replies and records every
//! request it receives, so callers can assert on the rendered prompt.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::{ChatClient, ChatRequest, Result};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this raw text
    Text(String),
    /// Fail with a transport error carrying this message
    TransportFailure(String),
    /// Fail with a non-success HTTP status
    Status(u16),
}

/// Chat client that replays scripted replies in order.
///
/// Once the script is exhausted every further call fails with a transport
/// error, which keeps runaway callers visible in tests.
#[derive(Debug, Default)]
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that answers every call in `texts` order with plain text
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::TransportFailure(msg)) => Err(ChatError::Http(msg)),
            Some(ScriptedReply::Status(status)) => Err(ChatError::Status {
                status,
                body: String::new(),
            }),
            None => Err(ChatError::Http("script exhausted".to_string())),
        }
    }
}
