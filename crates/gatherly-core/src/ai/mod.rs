//! Model provider layer
//!
//! Wraps the local inference backend (Ollama) behind a uniform chat
//! completion contract, with a process-wide FIFO request queue and a
//! circuit breaker in front of it.

pub mod breaker;
pub mod config;
pub mod ollama;
pub mod provider;
pub mod queue;
pub mod types;

pub use breaker::{BreakerError, CircuitBreaker, CircuitState};
pub use config::ModelConfig;
pub use ollama::OllamaClient;
pub use provider::{ChatBackend, ModelProvider};
pub use queue::InferenceQueue;
pub use types::{
    AiTool, AiToolCall, ChatMessage, ChatOutcome, ChatRequest, GenerationOptions, ProviderError,
    Role,
};
