//! Model provider adapter
//!
//! `ChatBackend` is the raw seam: implementations may fail with typed
//! `ProviderError`s. `ModelProvider` is what orchestrators consume - it
//! routes every request through the process-wide inference queue and the
//! circuit breaker, then flattens all failures into content-bearing
//! [`ChatOutcome`]s so nothing above ever has to handle a provider
//! exception. Queue-full and circuit-open produce a distinct "system busy"
//! message so the caller can tell resource exhaustion from model failure.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::breaker::CircuitBreaker;
use super::queue::InferenceQueue;
use super::types::{ChatOutcome, ChatRequest, ProviderError};

/// User-safe message for resource exhaustion (queue full / circuit open)
pub const BUSY_MESSAGE: &str =
    "The assistant is handling a lot of requests right now. Please try again in a moment.";

/// User-safe message for ordinary backend failures
pub const UNAVAILABLE_MESSAGE: &str =
    "I couldn't reach the language model just now. Please try again shortly.";

/// Raw chat seam over an inference backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError>;
}

/// The adapter orchestrators talk to: queued, circuit-broken, infallible.
pub struct ModelProvider {
    queue: InferenceQueue,
    breaker: CircuitBreaker,
}

impl ModelProvider {
    /// Wrap `backend` with a queue of the given capacity and a breaker.
    pub fn new(backend: Arc<dyn ChatBackend>, capacity: usize, breaker: CircuitBreaker) -> Self {
        Self {
            queue: InferenceQueue::new(backend, capacity),
            breaker,
        }
    }

    /// Wrap `backend` with crate defaults.
    pub fn with_defaults(backend: Arc<dyn ChatBackend>) -> Self {
        Self::new(
            backend,
            crate::constants::ai::QUEUE_CAPACITY,
            CircuitBreaker::default(),
        )
    }

    /// Run a chat completion. Never fails: errors become outcomes.
    ///
    /// Queue-full rejections bypass the breaker's failure accounting - a
    /// saturated queue means load, not a wedged backend.
    pub async fn chat_completion(&self, request: ChatRequest) -> ChatOutcome {
        if !self.breaker.allow() {
            warn!("model provider: circuit open, fast-failing");
            return ChatOutcome::failure(BUSY_MESSAGE, "circuit_open");
        }

        match self.queue.submit(request).await {
            Ok(outcome) => {
                self.breaker.record_success();
                outcome
            }
            Err(ProviderError::QueueFull) => {
                ChatOutcome::failure(BUSY_MESSAGE, "queue_full")
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!("model provider: backend error: {}", e);
                ChatOutcome::failure(UNAVAILABLE_MESSAGE, e.to_string())
            }
        }
    }
}
