//! Ollama backend client
//!
//! Talks to the two endpoint shapes the backend offers: `/api/chat` (accepts
//! a tools schema, may return structured tool calls) and `/api/generate`
//! (single-prompt completion). When the chat endpoint is unavailable or
//! returns empty content while tools were supplied, we fall back to the
//! generate endpoint with tools described in-prompt via the `TOOL_CALL:`
//! text convention, and parse the response ourselves.
//!
//! No artificial timeout is imposed on inference calls - large local models
//! can take long. Network errors become typed `ProviderError`s and are
//! flattened into content-bearing outcomes further up the stack.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::extract::text_protocol;

use super::provider::ChatBackend;
use super::types::{AiToolCall, ChatOutcome, ChatRequest, ProviderError, Role};

/// HTTP client for a single Ollama endpoint
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    /// Last model verified present on the backend. The backend can only hold
    /// one model resident, so we re-check whenever the requested tag changes.
    verified_model: Mutex<Option<String>>,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            verified_model: Mutex::new(None),
        }
    }

    /// Build a client pointed at a model configuration's endpoint.
    pub fn from_config(config: &super::config::ModelConfig) -> Self {
        Self::new(config.endpoint.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// List model tags available on the backend (`/api/tags`).
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .http
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(model_names(&json))
    }

    /// List models currently loaded in memory (`/api/ps`). Diagnostics only.
    pub async fn loaded_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .http
            .get(self.url("/api/ps"))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(model_names(&json))
    }

    /// Verify the requested model exists on the backend before dispatching.
    async fn ensure_model(&self, model: &str) -> Result<(), ProviderError> {
        {
            let verified = self.verified_model.lock();
            if verified.as_deref() == Some(model) {
                return Ok(());
            }
        }

        let models = self.list_models().await?;
        if !models.iter().any(|m| m == model || m.starts_with(model)) {
            return Err(ProviderError::ModelUnavailable(model.to_string()));
        }

        info!("ollama: model '{}' verified on backend", model);
        *self.verified_model.lock() = Some(model.to_string());
        Ok(())
    }

    /// Structured chat call against `/api/chat`.
    async fn chat_structured(&self, request: &ChatRequest) -> Result<ChatOutcome, ProviderError> {
        let mut body = json!({
            "model": request.model,
            "messages": request
                .messages
                .iter()
                .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
                .collect::<Vec<_>>(),
            "stream": false,
            "options": {
                "temperature": request.options.temperature,
                "num_predict": request.options.max_tokens,
            },
        });

        if let Some(tools) = &request.tools {
            body["tools"] = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
        }

        let json = self.post_json("/api/chat", &body).await?;

        let message = json.get("message").cloned().unwrap_or(Value::Null);
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        let tool_calls = message
            .get("tool_calls")
            .and_then(|c| c.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let function = call.get("function")?;
                        let name = function.get("name")?.as_str()?.to_string();
                        let arguments = function.get("arguments").cloned().unwrap_or(json!({}));
                        Some(AiToolCall { name, arguments })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChatOutcome {
            content,
            tool_calls,
            error: None,
        })
    }

    /// Prompt-only completion against `/api/generate`, with tools described
    /// in-prompt via the `TOOL_CALL:` convention.
    async fn generate_fallback(&self, request: &ChatRequest) -> Result<ChatOutcome, ProviderError> {
        let prompt = build_fallback_prompt(request);

        let body = json!({
            "model": request.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": request.options.temperature,
                "num_predict": request.options.max_tokens,
            },
        });

        let json = self.post_json("/api/generate", &body).await?;
        let content = json
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();

        let tool_names: Vec<String> = request
            .tools
            .iter()
            .flatten()
            .map(|t| t.name.clone())
            .collect();
        let tool_calls = text_protocol::parse_tool_calls(&content, &tool_names);

        Ok(ChatOutcome {
            content,
            tool_calls,
            error: None,
        })
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
        self.ensure_model(&request.model).await?;

        match self.chat_structured(&request).await {
            Ok(outcome) => {
                let needs_fallback = request.tools.is_some()
                    && outcome.content.trim().is_empty()
                    && outcome.tool_calls.is_empty();
                if !needs_fallback {
                    return Ok(outcome);
                }
                // fallback_available: tools were supplied but the chat
                // endpoint produced nothing usable
                debug!("ollama: empty chat response with tools, trying generate fallback");
                self.generate_fallback(&request).await
            }
            Err(ProviderError::Http { status: 404, .. }) => {
                // Older backends without /api/chat
                warn!("ollama: chat endpoint unavailable, using generate fallback");
                self.generate_fallback(&request).await
            }
            Err(e) => Err(e),
        }
    }
}

fn model_names(json: &Value) -> Vec<String> {
    json.get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a chat request into a single prompt describing the available
/// tools and the `TOOL_CALL:` convention.
fn build_fallback_prompt(request: &ChatRequest) -> String {
    let mut prompt = String::new();

    if let Some(tools) = &request.tools {
        prompt.push_str("You can use these tools:\n");
        for tool in tools {
            prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        }
        prompt.push_str(
            "\nTo use a tool, reply with a line of the form:\n\
             TOOL_CALL: tool_name {\"arg\": \"value\"}\n\n",
        );
    }

    for message in &request.messages {
        match message.role {
            Role::System => {
                prompt.push_str(&message.content);
                prompt.push_str("\n\n");
            }
            Role::User => {
                prompt.push_str("User: ");
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
            Role::Assistant => {
                prompt.push_str("Assistant: ");
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
        }
    }

    prompt.push_str("Assistant:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{AiTool, ChatMessage};

    #[test]
    fn fallback_prompt_describes_tools() {
        let request = ChatRequest::new(
            "qwen2.5:7b",
            vec![
                ChatMessage::system("You help plan events."),
                ChatMessage::user("plan a picnic"),
            ],
        )
        .with_tools(vec![AiTool {
            name: "create_event_draft".to_string(),
            description: "Create a new event draft".to_string(),
            parameters: json!({"type": "object"}),
        }]);

        let prompt = build_fallback_prompt(&request);
        assert!(prompt.contains("create_event_draft"));
        assert!(prompt.contains("TOOL_CALL:"));
        assert!(prompt.contains("User: plan a picnic"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn from_config_uses_configured_endpoint() {
        let config = crate::ai::config::ModelConfig {
            provider: "ollama".to_string(),
            model: "llama3.2:3b".to_string(),
            endpoint: "http://inference:11434/".to_string(),
            temperature: 0.2,
            max_tokens: 256,
            enabled: true,
        };

        let client = OllamaClient::from_config(&config);
        assert_eq!(client.base_url, "http://inference:11434");
    }

    #[test]
    fn model_names_reads_tags_shape() {
        let json = json!({"models": [{"name": "qwen2.5:7b"}, {"name": "llama3.2:3b"}]});
        assert_eq!(model_names(&json), vec!["qwen2.5:7b", "llama3.2:3b"]);
        assert!(model_names(&json!({})).is_empty());
    }
}
