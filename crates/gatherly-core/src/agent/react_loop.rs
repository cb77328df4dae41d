//! Bounded reasoning loop (ReAct-style)
//!
//! States are implicit in the iteration count (max 3 by default). Each
//! iteration asks the model, runs the ReAct extraction strategy, and either
//! terminates on a final answer, executes the extracted tools and splices
//! their results back as observations, or gives up with a clarifying
//! response. A successful creation tool short-circuits to an immediate
//! success response - once the primary action is done, further iterations
//! are wasted.
//!
//! Failure policy: a failed model call or tool execution ends the loop
//! early; the caller always receives a structured response.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::types::{ChatMessage, ChatRequest};
use crate::ai::ModelProvider;
use crate::constants;
use crate::extract::{react, Strategy};
use crate::tools::{ToolContext, ToolRegistry};

use super::prompt;
use super::{AgentResponse, StepRecord};

/// The bounded reasoning loop orchestrator
pub struct ReactLoop {
    provider: Arc<ModelProvider>,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
    strategy: Strategy,
}

impl ReactLoop {
    pub fn new(provider: Arc<ModelProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            max_iterations: constants::agent::MAX_ITERATIONS,
            strategy: Strategy::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Select the tool-call extraction strategy. Native advertises tools on
    /// the request itself; the text strategies describe them in the prompt.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Process one user message against the session in `ctx`.
    pub async fn process(
        &self,
        model: &str,
        history: &[ChatMessage],
        user_text: &str,
        ctx: &ToolContext,
    ) -> AgentResponse {
        let tools = self.registry.schemas().await;
        let tool_names = self.registry.tool_names().await;
        let system = match self.strategy {
            Strategy::React => prompt::react_system_prompt(&tools),
            Strategy::TextProtocol => prompt::tool_call_system_prompt(&tools),
            Strategy::Native => prompt::native_system_prompt(),
        };

        let mut steps: Vec<StepRecord> = Vec::new();
        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let mut messages = vec![ChatMessage::system(system.clone())];
            messages.extend_from_slice(history);
            messages.push(ChatMessage::user(user_text));
            if !scratchpad.is_empty() {
                messages.push(ChatMessage::assistant(scratchpad.clone()));
                messages.push(ChatMessage::user(
                    "Continue from the observations above. Remember the format.",
                ));
            }

            let mut request = ChatRequest::new(model, messages);
            if self.strategy == Strategy::Native {
                request = request.with_tools(tools.clone());
            }
            let outcome = self.provider.chat_completion(request).await;

            if outcome.is_error() {
                warn!(
                    "react loop: model call failed on iteration {}: {:?}",
                    iteration, outcome.error
                );
                return AgentResponse {
                    output: outcome.content,
                    intermediate_steps: steps,
                    success: false,
                };
            }

            let extraction = self.strategy.extract(&outcome, &tool_names);

            if let Some(answer) = extraction.final_answer {
                debug!("react loop: final answer on iteration {}", iteration);
                return AgentResponse {
                    output: answer,
                    intermediate_steps: steps,
                    success: true,
                };
            }

            for call in extraction.calls {
                let result = self
                    .registry
                    .execute(&call.name, call.arguments.clone(), ctx)
                    .await;

                scratchpad.push_str(&format!(
                    "Action: {}\nAction Input: {}\nObservation: {}\n",
                    call.name, call.arguments, result.output
                ));
                steps.push(StepRecord::from_result(&call.name, call.arguments, &result));

                // Primary action done: no point burning more iterations
                if call.name == react::DEFAULT_CREATION_TOOL && !result.is_error {
                    let title = result
                        .output
                        .get("event_data")
                        .and_then(|d| d.get("title"))
                        .and_then(|t| t.as_str())
                        .unwrap_or("your event");
                    return AgentResponse {
                        output: format!(
                            "I've started a draft for {}. You can add tickets, a venue, \
                             or more details whenever you're ready.",
                            title
                        ),
                        intermediate_steps: steps,
                        success: true,
                    };
                }
            }
        }

        // Nothing usable across all iterations
        let success = !steps.is_empty() && steps.iter().any(|s| s.error.is_none());
        AgentResponse {
            output: react::CLARIFY_ANSWER.to_string(),
            intermediate_steps: steps,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::ai::provider::ChatBackend;
    use crate::ai::types::{AiToolCall, ChatOutcome, ChatRequest, ProviderError};
    use crate::ai::ModelProvider;
    use crate::extract::Strategy;
    use crate::storage::{ConversationStore, Database, DraftStore, SessionStore};
    use crate::tools::{event_tool_registry, ToolContext};

    use super::ReactLoop;

    fn context() -> ToolContext {
        let db = Database::in_memory().expect("db");
        let conversation = ConversationStore::new(db.clone())
            .create("user-1")
            .expect("conversation");
        let session_id = SessionStore::new(db.clone())
            .create(&conversation)
            .expect("session");
        ToolContext {
            session_id,
            drafts: DraftStore::new(db),
        }
    }

    /// Backend that answers with structured tool_calls and records whether
    /// tools were advertised on the request.
    struct StructuredBackend {
        saw_tools: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ChatBackend for StructuredBackend {
        async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
            self.saw_tools
                .store(request.tools.is_some(), Ordering::SeqCst);
            Ok(ChatOutcome {
                content: String::new(),
                tool_calls: vec![AiToolCall {
                    name: "create_event_draft".to_string(),
                    arguments: json!({"title": "Science Fair"}),
                }],
                error: None,
            })
        }
    }

    #[tokio::test]
    async fn native_strategy_advertises_tools_and_executes_structured_calls() {
        let saw_tools = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(ModelProvider::with_defaults(Arc::new(StructuredBackend {
            saw_tools: Arc::clone(&saw_tools),
        })));
        let registry = Arc::new(event_tool_registry().await);
        let ctx = context();

        let response = ReactLoop::new(provider, registry)
            .with_strategy(Strategy::Native)
            .process("test-model", &[], "set up a science fair", &ctx)
            .await;

        assert!(response.success);
        assert!(saw_tools.load(Ordering::SeqCst));
        assert_eq!(response.intermediate_steps.len(), 1);
        assert_eq!(response.intermediate_steps[0].name, "create_event_draft");

        let draft = ctx
            .drafts
            .get_current(&ctx.session_id)
            .expect("load")
            .expect("draft exists");
        assert_eq!(draft.event_data["title"], "Science Fair");
    }

    struct TextProtocolBackend;

    #[async_trait]
    impl ChatBackend for TextProtocolBackend {
        async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
            assert!(request.tools.is_none());
            Ok(ChatOutcome::text(
                r#"TOOL_CALL: create_event_draft {"title": "Spring Fair"}"#,
            ))
        }
    }

    #[tokio::test]
    async fn text_protocol_strategy_parses_tool_call_lines() {
        let provider = Arc::new(ModelProvider::with_defaults(Arc::new(TextProtocolBackend)));
        let registry = Arc::new(event_tool_registry().await);
        let ctx = context();

        let response = ReactLoop::new(provider, registry)
            .with_strategy(Strategy::TextProtocol)
            .process("test-model", &[], "spring fair please", &ctx)
            .await;

        assert!(response.success);
        let draft = ctx
            .drafts
            .get_current(&ctx.session_id)
            .expect("load")
            .expect("draft exists");
        assert_eq!(draft.event_data["title"], "Spring Fair");
    }
}
