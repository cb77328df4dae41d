//! Inference request queue
//!
//! The backing inference engine holds one model in memory at a time, so all
//! completion requests process-wide are serialized through a bounded FIFO
//! queue with a single consumer task. Ordering is strict FIFO regardless of
//! session - one session's slow request delays everyone behind it, by
//! design. A full queue fast-fails with `ProviderError::QueueFull` so the
//! caller can show "system busy" instead of hanging.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use super::provider::ChatBackend;
use super::types::{ChatOutcome, ChatRequest, ProviderError};

struct Job {
    request: ChatRequest,
    reply: oneshot::Sender<Result<ChatOutcome, ProviderError>>,
}

/// Bounded FIFO queue in front of a [`ChatBackend`]
pub struct InferenceQueue {
    sender: mpsc::Sender<Job>,
}

impl InferenceQueue {
    /// Spawn the consumer task over `backend` with the given capacity.
    pub fn new(backend: Arc<dyn ChatBackend>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity);

        // Single consumer; the lock documents the one-model-resident
        // constraint even if the consumer is ever parallelized.
        let inference_lock = Mutex::new(());

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let _guard = inference_lock.lock().await;
                debug!("inference queue: dispatching request for '{}'", job.request.model);
                let result = backend.chat(job.request).await;
                // Receiver may have given up; that's their problem
                let _ = job.reply.send(result);
            }
        });

        Self { sender }
    }

    /// Enqueue a request and wait for its completion.
    ///
    /// Returns `QueueFull` immediately when the queue is at capacity.
    pub async fn submit(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            request,
            reply: reply_tx,
        };

        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("inference queue: at capacity, rejecting request");
                ProviderError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => ProviderError::QueueClosed,
        })?;

        reply_rx.await.map_err(|_| ProviderError::QueueClosed)?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::ai::types::{ChatMessage, ChatOutcome, ChatRequest, ProviderError};

    use super::super::provider::ChatBackend;
    use super::InferenceQueue;

    /// Backend that records completion order and sleeps longer for earlier
    /// requests, so out-of-order execution would be caught.
    struct OrderRecordingBackend {
        completed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChatBackend for OrderRecordingBackend {
        async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
            let tag = request.messages[0].content.clone();
            let delay = match tag.as_str() {
                "seq-0" => 30,
                "seq-1" => 20,
                _ => 5,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completed.lock().push(tag.clone());
            Ok(ChatOutcome::text(tag))
        }
    }

    #[tokio::test]
    async fn completes_in_fifo_order() {
        let completed = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(OrderRecordingBackend {
            completed: Arc::clone(&completed),
        });
        let queue = Arc::new(InferenceQueue::new(backend, 10));

        let mut handles = Vec::new();
        for i in 0..4 {
            let queue = Arc::clone(&queue);
            let request =
                ChatRequest::new("test-model", vec![ChatMessage::user(format!("seq-{}", i))]);
            handles.push(tokio::spawn(async move { queue.submit(request).await }));
            // Stagger submissions so enqueue order is deterministic
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        for result in futures::future::join_all(handles).await {
            result.expect("join").expect("outcome");
        }

        let order = completed.lock().clone();
        assert_eq!(order, vec!["seq-0", "seq-1", "seq-2", "seq-3"]);
    }

    struct SlowBackend;

    #[async_trait]
    impl ChatBackend for SlowBackend {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ChatOutcome::text("too late"))
        }
    }

    #[tokio::test]
    async fn full_queue_fast_fails() {
        let queue = Arc::new(InferenceQueue::new(Arc::new(SlowBackend), 1));

        // First request occupies the consumer, second fills the buffer.
        for _ in 0..2 {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                let request = ChatRequest::new("m", vec![ChatMessage::user("x")]);
                let _ = queue.submit(request).await;
            });
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let request = ChatRequest::new("m", vec![ChatMessage::user("overflow")]);
        let result = queue.submit(request).await;
        assert!(matches!(result, Err(ProviderError::QueueFull)));
    }
}
