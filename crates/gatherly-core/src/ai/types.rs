//! Provider communication types
//!
//! These are NOT domain types - they're specific to the model provider API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A single chat message sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Tool definition advertised to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool call returned by the provider (or parsed out of raw text)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiToolCall {
    pub name: String,
    pub arguments: Value,
}

/// Generation options forwarded to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    /// Maximum tokens to generate (Ollama calls this num_predict)
    pub max_tokens: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: crate::constants::ai::DEFAULT_TEMPERATURE,
            max_tokens: crate::constants::ai::MAX_OUTPUT_TOKENS,
        }
    }
}

/// A chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<AiTool>>,
    pub options: GenerationOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<AiTool>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Outcome of a chat completion.
///
/// The adapter never raises for ordinary model failures: errors are carried
/// in `error` alongside a user-safe `content` string, so the orchestrator
/// always has something to show.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub content: String,
    pub tool_calls: Vec<AiToolCall>,
    /// Underlying error detail (for logging, never shown to end users)
    pub error: Option<String>,
}

impl ChatOutcome {
    /// Successful text-only outcome
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            error: None,
        }
    }

    /// Failure outcome: user-safe content plus the real error for logging
    pub fn failure(content: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Errors surfaced by the provider stack before they are flattened into a
/// content-bearing [`ChatOutcome`] at the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend returned HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("model '{0}' is not available on the backend")]
    ModelUnavailable(String),

    #[error("inference queue is full")]
    QueueFull,

    #[error("inference queue worker is gone")]
    QueueClosed,

    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),
}
