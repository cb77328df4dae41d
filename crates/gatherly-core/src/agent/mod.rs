//! Agent orchestrators
//!
//! Two state-machine shapes behind one contract:
//! - [`react_loop`]: a bounded reasoning loop - cheaper and more natural,
//!   but can fail to act if the model rambles
//! - [`workflow`]: an explicit fixed-step graph - guarantees a draft write
//!   every turn at the cost of rigidity
//!
//! Both return a structured [`AgentResponse`] on every path; exceptions
//! never reach the caller.

pub mod prompt;
pub mod react_loop;
pub mod workflow;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolResult;

/// Which orchestrator shape a deployment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorKind {
    #[default]
    ReactLoop,
    Workflow,
}

/// Audit record of one tool call within a turn. Ephemeral - persisted only
/// as part of the response metadata, and used to build the observation fed
/// back into the next reasoning iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl StepRecord {
    pub fn from_result(name: &str, arguments: Value, result: &ToolResult) -> Self {
        Self {
            name: name.to_string(),
            arguments,
            result: (!result.is_error).then(|| result.output.clone()),
            error: result
                .error_message()
                .map(|m| m.to_string())
                .filter(|_| result.is_error),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// What an orchestrator hands back for one processed message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub output: String,
    pub intermediate_steps: Vec<StepRecord>,
    pub success: bool,
}

impl AgentResponse {
    pub fn text(output: impl Into<String>, success: bool) -> Self {
        Self {
            output: output.into(),
            intermediate_steps: Vec::new(),
            success,
        }
    }
}
