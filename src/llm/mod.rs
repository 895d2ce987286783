//! Streaming chat-completion client for OpenAI-compatible APIs.

mod client;
mod error;
mod sse;
mod types;

pub use client::{
    ChatSettings, DEFAULT_SYSTEM_PROMPT, StreamingChatClient, default_base_url, known_base_url,
};
pub use error::LlmError;
pub use types::{Message, Role};
