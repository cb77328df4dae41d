//! Explicit workflow graph
//!
//! A fixed directed graph of named steps:
//!
//! ```text
//! extract_details -> create_event_draft -> check_for_tickets
//!     -> add_ticket_type (looped while named tickets remain) -> generate_response
//! ```
//!
//! Unlike the reasoning loop, the draft-write steps are unconditional nodes:
//! the model's output is used only to extract arguments (best-effort JSON
//! parse, then keyword heuristics), so every event-creation turn results in
//! at least an attempted draft write - a low-confidence draft the user can
//! correct beats inaction.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::ai::types::{ChatMessage, ChatRequest};
use crate::ai::ModelProvider;
use crate::extract::{first_json_object, heuristics};
use crate::tools::{ToolContext, ToolRegistry, EVENT_FIELDS};

use super::prompt;
use super::{AgentResponse, StepRecord};

/// Arguments produced by the extraction node
#[derive(Debug, Clone)]
struct ExtractedDetails {
    event_args: Value,
    /// Ticket name -> price, in mention order
    tickets: Vec<(String, f64)>,
}

/// The explicit-graph orchestrator
pub struct Workflow {
    provider: Arc<ModelProvider>,
    registry: Arc<ToolRegistry>,
}

impl Workflow {
    pub fn new(provider: Arc<ModelProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Process one user message against the session in `ctx`.
    pub async fn process(
        &self,
        model: &str,
        history: &[ChatMessage],
        user_text: &str,
        ctx: &ToolContext,
    ) -> AgentResponse {
        let mut steps: Vec<StepRecord> = Vec::new();

        // Node: extract_details
        let details = self.extract_details(model, history, user_text).await;
        debug!(
            "workflow: extracted args {} with {} ticket(s)",
            details.event_args,
            details.tickets.len()
        );

        // Node: create_event_draft (unconditional)
        let create_result = self
            .registry
            .execute("create_event_draft", details.event_args.clone(), ctx)
            .await;
        let created = !create_result.is_error;
        let title = details.event_args["title"]
            .as_str()
            .unwrap_or(heuristics::DEFAULT_TITLE)
            .to_string();
        steps.push(StepRecord::from_result(
            "create_event_draft",
            details.event_args,
            &create_result,
        ));

        // Node: check_for_tickets, then add_ticket_type looped until no
        // named ticket remains. Routing is a pure function of the
        // remaining-ticket list.
        let mut added_tickets: Vec<String> = Vec::new();
        let mut remaining = details.tickets.clone();
        while let Some((name, price)) = remaining.first().cloned() {
            remaining.remove(0);
            let args = json!({"name": name, "price": price});
            let result = self.registry.execute("add_ticket_type", args.clone(), ctx).await;
            if !result.is_error {
                added_tickets.push(name);
            } else {
                warn!(
                    "workflow: add_ticket_type failed: {:?}",
                    result.error_message()
                );
            }
            steps.push(StepRecord::from_result("add_ticket_type", args, &result));
        }

        // Node: generate_response - summarize what was actually created
        let output = if created {
            let mut summary = format!("I've created a draft for {}.", title);
            if !added_tickets.is_empty() {
                summary.push_str(&format!(
                    " Added ticket types: {}.",
                    added_tickets.join(", ")
                ));
            }
            summary.push_str(" Let me know what to adjust, or say 'publish' when it's ready.");
            summary
        } else {
            let reason = create_result
                .error_message()
                .unwrap_or("something went wrong");
            format!(
                "I couldn't create the draft yet ({}). Could you give me a bit more detail?",
                reason
            )
        };

        AgentResponse {
            output,
            intermediate_steps: steps,
            success: created,
        }
    }

    /// Best-effort argument extraction: ask the model for JSON, fall back to
    /// keyword heuristics over the raw user text when the model fails or
    /// rambles.
    async fn extract_details(
        &self,
        model: &str,
        history: &[ChatMessage],
        user_text: &str,
    ) -> ExtractedDetails {
        let mut messages = vec![ChatMessage::system(prompt::extraction_system_prompt())];
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_text));

        let outcome = self
            .provider
            .chat_completion(ChatRequest::new(model, messages))
            .await;

        let model_json = if outcome.is_error() {
            None
        } else {
            first_json_object(&outcome.content)
        };

        let mut event_args = Map::new();
        let mut tickets: Vec<(String, f64)> = Vec::new();

        if let Some(Value::Object(extracted)) = model_json {
            for spec in EVENT_FIELDS {
                if let Some(value) = extracted.get(spec.name) {
                    if !value.is_null() {
                        event_args.insert(spec.name.to_string(), value.clone());
                    }
                }
            }
            if let Some(Value::Array(list)) = extracted.get("tickets") {
                for ticket in list {
                    let name = ticket.get("name").and_then(|n| n.as_str());
                    let price = ticket.get("price").and_then(|p| p.as_f64());
                    if let (Some(name), Some(price)) = (name, price) {
                        tickets.push((name.to_string(), price));
                    }
                }
            }
        }

        // Heuristic fallbacks fill whatever the model left out
        if !event_args.contains_key("title") {
            event_args.insert("title".to_string(), json!(heuristics::infer_title(user_text)));
        }
        if !event_args.contains_key("start_time") {
            if let Some(date) = heuristics::infer_date(user_text) {
                event_args.insert("start_time".to_string(), json!(format!("{}T10:00:00", date)));
            }
        }
        if tickets.is_empty() {
            tickets = heuristics::infer_tickets(user_text);
        }

        ExtractedDetails {
            event_args: Value::Object(event_args),
            tickets,
        }
    }
}
