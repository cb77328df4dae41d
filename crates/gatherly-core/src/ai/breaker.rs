//! Circuit breaker for the inference backend
//!
//! Pure wrapper with no knowledge of the wrapped call's semantics. Opens
//! after `failure_threshold` consecutive failures; while open, calls fail
//! fast without touching the backend. After `recovery_timeout` the next call
//! is let through as a trial (half-open): success closes the circuit,
//! failure re-opens it and resets the timer.

use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::constants;

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Fast-failing; backend is presumed wedged
    Open,
    /// One trial call in flight
    HalfOpen,
}

/// Error from a breaker-wrapped call
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker is open")]
    Open,
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: usize,
    opened_at: Option<Instant>,
}

/// Three-state circuit breaker
pub struct CircuitBreaker {
    failure_threshold: usize,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(
            constants::breaker::FAILURE_THRESHOLD,
            Duration::from_secs(constants::breaker::RECOVERY_TIMEOUT_SECS),
        )
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Current state (open flips to half-open when the timeout has elapsed).
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        inner.state
    }

    /// Run `f` through the breaker, counting every error as a failure.
    pub async fn call<T, E, F, Fut>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.allow() {
            return Err(BreakerError::Open);
        }

        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Ask permission for a call; flips open to half-open once the recovery
    /// timeout has elapsed. Callers bypassing [`CircuitBreaker::call`] must
    /// pair this with `record_success`/`record_failure` for outcomes that
    /// should count.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.recovery_timeout {
                    info!("circuit breaker: half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!("circuit breaker: recovered, closing");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                warn!("circuit breaker: trial call failed, re-opening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    warn!(
                        "circuit breaker: {} consecutive failures, opening",
                        inner.consecutive_failures
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    async fn failing_call(counter: &AtomicUsize) -> Result<(), &'static str> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("boom")
    }

    #[tokio::test]
    async fn opens_at_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = breaker.call(|| failing_call(&calls)).await;
            assert!(matches!(result, Err(BreakerError::Inner("boom"))));
        }

        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn open_circuit_fails_fast_without_invoking() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _ = breaker.call(|| failing_call(&calls)).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = breaker.call(|| failing_call(&calls)).await;
        assert!(matches!(result, Err(BreakerError::Open)));
        // Wrapped function was not invoked
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn trial_after_timeout_invokes_exactly_once() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        let calls = Arc::new(AtomicUsize::new(0));

        let _ = breaker.call(|| failing_call(&calls)).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Trial call goes through and succeeds
        let trial_calls = Arc::clone(&calls);
        let result = breaker
            .call(move || async move {
                trial_calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>("recovered")
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn failed_trial_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let calls = AtomicUsize::new(0);

        let _ = breaker.call(|| failing_call(&calls)).await;
        tokio::time::sleep(Duration::from_millis(15)).await;

        let _ = breaker.call(|| failing_call(&calls)).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // Timer was reset: immediate follow-up still fails fast
        let result = breaker.call(|| failing_call(&calls)).await;
        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
