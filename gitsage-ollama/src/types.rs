//! Ollama `/api/chat` request and streamed response types.
//!
//! The request always sets `stream: true`; the response is one
//! [`ResponseUnit`] per NDJSON line.

use serde::{Deserialize, Serialize};

/// Role of a chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The prompt text.
    User,
    /// Text produced by the model. Only ever seen in responses.
    Assistant,
}

/// A message in the Ollama `/api/chat` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// Message text.
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation options.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
}

/// Ollama `/api/chat` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "llama3:8b").
    pub model: String,
    /// Conversation messages, in order.
    pub messages: Vec<ChatMessage>,
    /// Streaming flag. The client forces this to `true` before sending.
    pub stream: bool,
    /// Generation options.
    pub options: ChatOptions,
}

impl ChatRequest {
    /// Build a streaming request. The temperature is clamped into `[0, 1]`.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, temperature: f32) -> Self {
        let temperature = if temperature.is_nan() {
            0.0
        } else {
            temperature.clamp(0.0, 1.0)
        };
        Self {
            model: model.into(),
            messages,
            stream: true,
            options: ChatOptions { temperature },
        }
    }
}

/// One decoded line of the NDJSON response stream.
///
/// The timing and count fields are not used by the client, but they are kept
/// so a unit serializes back to what the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseUnit {
    /// Model that produced the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Server timestamp, kept as the raw RFC 3339 string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Incremental message fragment.
    pub message: ChatMessage,
    /// Set on the final unit of the stream.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (`"stop"`, `"length"`), final unit only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Total wall time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// Model load time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    /// Prompt tokens evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Prompt evaluation time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    /// Tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    /// Generation time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

impl ResponseUnit {
    /// The text fragment carried by this unit.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}
