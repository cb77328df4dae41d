//! Tool registry
//!
//! Tools are named, schema-described, side-effecting functions the model
//! may request. Execution never raises past the registry boundary: every
//! outcome is a `ToolResult` envelope with at least `success: bool`.
//! Unknown tool names are a reported error, not a crash.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::ai::types::AiTool;
use crate::storage::DraftStore;

/// Tool execution result envelope
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// JSON envelope: `{"success": true, ...}` or
    /// `{"success": false, "error": {"code", "message"}}`
    pub output: Value,
    pub is_error: bool,
}

impl ToolResult {
    /// Success envelope with extra data fields merged in.
    pub fn success(data: Value) -> Self {
        let mut envelope = serde_json::Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                envelope.insert(key, value);
            }
        }
        Self {
            output: Value::Object(envelope),
            is_error: false,
        }
    }

    /// Error envelope with an explicit code.
    pub fn error_with_code(code: &str, message: impl std::fmt::Display) -> Self {
        Self {
            output: serde_json::json!({
                "success": false,
                "error": { "code": code, "message": message.to_string() }
            }),
            is_error: true,
        }
    }

    pub fn invalid_parameters(message: impl std::fmt::Display) -> Self {
        Self::error_with_code("invalid_parameters", message)
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::error_with_code("tool_error", message)
    }

    /// The error message, if this is an error envelope.
    pub fn error_message(&self) -> Option<&str> {
        self.output
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
    }
}

/// Parse typed tool parameters, returning an error envelope on failure.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, ToolResult> {
    serde_json::from_value(params)
        .map_err(|e| ToolResult::invalid_parameters(format!("Invalid parameters: {}", e)))
}

/// Context for tool execution: everything is scoped to one agent session.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: String,
    pub drafts: DraftStore,
}

/// Trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (id)
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool
    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult;
}

/// Registry for managing tools
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a tool
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let mut tools = self.tools.write().await;
        tools.insert(name, tool);
    }

    /// All registered tool names
    pub async fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool schemas for prompt construction / provider advertisement
    pub async fn schemas(&self) -> Vec<AiTool> {
        let tools = self.tools.read().await;
        let mut schemas: Vec<AiTool> = tools
            .values()
            .map(|t| AiTool {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Dispatch a tool by name with a kwargs dict.
    pub async fn execute(&self, name: &str, params: Value, ctx: &ToolContext) -> ToolResult {
        let tool = {
            let tools = self.tools.read().await;
            tools.get(name).cloned()
        };

        let Some(tool) = tool else {
            return ToolResult::error_with_code("unknown_tool", format!("Unknown tool: {}", name));
        };

        debug!("tool registry: executing '{}'", name);
        tool.execute(params, ctx).await
    }
}
