//! Crate-wide constants and defaults

/// AI model defaults
pub mod ai {
    /// Default local model (Ollama tag)
    pub const DEFAULT_MODEL: &str = "qwen2.5:7b";

    /// Default Ollama endpoint
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

    /// Maximum output tokens per completion
    pub const MAX_OUTPUT_TOKENS: usize = 2048;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;

    /// Inference queue capacity. The backend holds one model in memory, so
    /// requests are serialized; anything past this bound fast-fails.
    pub const QUEUE_CAPACITY: usize = 10;
}

/// Agent loop defaults
pub mod agent {
    /// Maximum reasoning iterations for the bounded ReAct loop
    pub const MAX_ITERATIONS: usize = 3;
}

/// Circuit breaker defaults
pub mod breaker {
    /// Consecutive failures before the circuit opens
    pub const FAILURE_THRESHOLD: usize = 5;

    /// Seconds the circuit stays open before a trial call is allowed
    pub const RECOVERY_TIMEOUT_SECS: u64 = 60;
}
