//! Model configuration
//!
//! Provider-agnostic configuration for the inference backend. The "current"
//! selection is process-wide mutable state with no lifecycle beyond process
//! restart; it is selected, not created, per request.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Environment variable overriding the backend endpoint
pub const ENDPOINT_ENV: &str = "GATHERLY_OLLAMA_URL";

/// Configuration for a model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier (currently always "ollama")
    pub provider: String,
    /// Model tag to send in API requests
    pub model: String,
    /// Backend base URL (without trailing slash)
    pub endpoint: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: usize,
    /// Whether this configuration is usable
    pub enabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let endpoint = std::env::var(ENDPOINT_ENV)
            .unwrap_or_else(|_| constants::ai::DEFAULT_ENDPOINT.to_string());
        Self {
            provider: "ollama".to_string(),
            model: constants::ai::DEFAULT_MODEL.to_string(),
            endpoint,
            temperature: constants::ai::DEFAULT_TEMPERATURE,
            max_tokens: constants::ai::MAX_OUTPUT_TOKENS,
            enabled: true,
        }
    }
}

impl ModelConfig {
    /// Parse a configuration from TOML
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: ModelConfig = toml::from_str(text)?;
        Ok(config)
    }
}

static CURRENT: Lazy<RwLock<ModelConfig>> = Lazy::new(|| RwLock::new(ModelConfig::default()));

/// Get a copy of the current process-wide model selection
pub fn current() -> ModelConfig {
    CURRENT.read().clone()
}

/// Replace the current process-wide model selection
pub fn set_current(config: ModelConfig) {
    *CURRENT.write() = config;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_config() {
        let config = ModelConfig::from_toml(
            r#"
            provider = "ollama"
            model = "llama3.2:3b"
            endpoint = "http://inference:11434"
            temperature = 0.1
            max_tokens = 1024
            enabled = true
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.model, "llama3.2:3b");
        assert_eq!(config.endpoint, "http://inference:11434");
        assert!(config.enabled);
    }

    #[test]
    fn default_points_at_local_ollama() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, "ollama");
        assert!(config.endpoint.starts_with("http"));
    }
}
