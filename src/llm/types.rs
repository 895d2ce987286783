//! Wire types for chat completions.

use serde::{Deserialize, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A streaming chat completion request (OpenAI-compatible format).
#[derive(Debug, Serialize)]
pub(crate) struct StreamRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// An event produced by the SSE response parser.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamEvent {
    /// An incremental fragment of assistant text.
    Token(String),
    /// The transport signalled end-of-stream.
    Done,
}

/// One `data:` payload of the response stream. Only the first choice's
/// delta content is consumed; every other field is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    pub delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    pub content: Option<String>,
}
