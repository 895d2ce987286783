//! Streaming chat client with in-memory conversation history.

use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use super::error::{LlmError, classify_status, classify_transport};
use super::sse::SseParser;
use super::types::{Message, Role, StreamEvent, StreamRequest};

/// Fixed sampling parameters, matching the demo frontend.
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

/// Known provider endpoints, matched by model-name prefix.
const PROVIDER_ENDPOINTS: &[(&str, &str)] = &[
    ("doubao", "https://ark.cn-beijing.volces.com/api/v3"),
    ("deepseek", "https://api.deepseek.com"),
    ("qwen", "https://dashscope.aliyuncs.com/compatible-mode/v1"),
    ("gpt", "https://api.openai.com/v1"),
];

/// Persona and output constraints for the digital-human presenter.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a digital human presenter and professional data analyst.

Rules:
1. Reply with exactly one short paragraph, never several.
2. Keep every reply under 200 characters.
3. End every reply with a period.
4. Never use emoji or decorative symbols.
5. No line breaks, lists, or headings.
6. If there is too much to say, give only the single most important sentence.
7. Keep the tone concise, professional, and friendly.";

/// Endpoint for a model name, if its provider is recognized. Prefix match
/// against the known providers plus one exact-name special case.
pub fn known_base_url(model: &str) -> Option<&'static str> {
    if model == "lanyun-model" {
        return Some("https://maas-api.lanyun.net/v1");
    }
    PROVIDER_ENDPOINTS
        .iter()
        .find(|(prefix, _)| model.starts_with(*prefix))
        .map(|(_, url)| *url)
}

/// Resolve the default endpoint for a model name, falling back to the
/// doubao endpoint for unrecognized models.
pub fn default_base_url(model: &str) -> &'static str {
    known_base_url(model).unwrap_or(PROVIDER_ENDPOINTS[0].1)
}

/// Construction input for [`StreamingChatClient`].
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ChatSettings {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Endpoint root. Derived from the model name when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Overrides the built-in presenter prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Sends chat turns to an OpenAI-compatible endpoint with `stream: true`,
/// forwards content deltas to a caller-supplied callback as they arrive,
/// and keeps the conversation history across turns.
///
/// `send_stream` takes `&mut self`, so calls against one client are
/// serialized by the borrow checker; there is no internal locking.
pub struct StreamingChatClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    system_prompt: String,
    history: Vec<Message>,
}

impl StreamingChatClient {
    pub fn new(settings: ChatSettings) -> Self {
        let base_url = settings
            .base_url
            .unwrap_or_else(|| default_base_url(&settings.model).to_string());
        let system_prompt = settings
            .system_prompt
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let history = vec![Message::new(Role::System, system_prompt.clone())];

        Self {
            client: Client::new(),
            model: settings.model,
            api_key: settings.api_key,
            base_url,
            system_prompt,
            history,
        }
    }

    /// Send one user turn and stream the assistant's reply.
    ///
    /// `on_chunk(text, is_final)` is invoked once per content delta in
    /// arrival order with `is_final = false`, then exactly once with
    /// `("", true)` after the stream ends. On any error no terminal chunk
    /// fires and no assistant turn is committed; the user turn is recorded
    /// either way. Returns the accumulated assistant text.
    pub async fn send_stream<F>(
        &mut self,
        user_message: &str,
        on_chunk: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str, bool),
    {
        // Record the user turn before the network call so a failed call
        // still leaves it in history.
        self.history.push(Message::new(Role::User, user_message));

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, url = %url, "starting chat completion request");

        let request = StreamRequest {
            model: &self.model,
            messages: &self.history,
            stream: true,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "chat completion request rejected");
            return Err(LlmError::Api {
                status,
                reason: classify_status(status),
                body,
            });
        }

        self.consume_response(response.bytes_stream(), on_chunk)
            .await
    }

    /// Drain the SSE byte stream, forwarding deltas as they arrive and
    /// committing the assistant turn once the transport closes. On error
    /// nothing is committed and no terminal chunk fires.
    async fn consume_response<S, F>(
        &mut self,
        bytes: S,
        mut on_chunk: F,
    ) -> Result<String, LlmError>
    where
        S: futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin,
        F: FnMut(&str, bool),
    {
        let mut events = SseParser::new(bytes);
        let mut assistant_message = String::new();

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Token(content) => {
                    assistant_message.push_str(&content);
                    on_chunk(&content, false);
                }
                StreamEvent::Done => break,
            }
        }

        debug!(
            chars = assistant_message.len(),
            "chat completion stream finished"
        );
        self.history
            .push(Message::new(Role::Assistant, assistant_message.clone()));
        on_chunk("", true);

        Ok(assistant_message)
    }

    /// Reset history to the single original system turn.
    pub fn clear_history(&mut self) {
        self.history = vec![Message::new(Role::System, self.system_prompt.clone())];
    }

    /// Snapshot of the conversation so far.
    pub fn history(&self) -> Vec<Message> {
        self.history.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
