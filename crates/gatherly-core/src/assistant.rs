//! Public façade for the agent core
//!
//! The excluded HTTP layer talks to [`EventAssistant`] and nothing else.
//! Every operation returns a structured result even on total failure: a
//! plain-language message for the user, with the real error attached for
//! logging. Nothing here is allowed to leak an exception to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::agent::{react_loop::ReactLoop, workflow::Workflow, OrchestratorKind, StepRecord};
use crate::ai::{config, ModelProvider, OllamaClient};
use crate::booking::BookingApi;
use crate::extract::Strategy;
use crate::storage::{
    to_booking_fields, validate_draft, ConversationStatus, ConversationStore, Database, DraftStore,
    MessageStore, SessionStatus, SessionStore,
};
use crate::tools::{event_tool_registry, ToolContext, ToolRegistry};

/// Greeting persisted as the first assistant message of a conversation
pub const GREETING: &str = "Hi! I can help you set up an event for the community - \
    just describe what you have in mind, including a date if you know it.";

const GENERIC_FAILURE: &str =
    "Sorry, something went wrong on our side. Please try again in a moment.";

/// Result of `start_conversation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStart {
    pub conversation_id: Option<String>,
    pub greeting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `process_message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReply {
    pub response_text: String,
    /// Session status label after the turn
    pub status: String,
    pub tool_results: Vec<StepRecord>,
    /// Current draft snapshot so the UI can render a live preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_preview: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessReply {
    fn failure(text: &str, error: impl std::fmt::Display) -> Self {
        Self {
            response_text: text.to_string(),
            status: SessionStatus::Error.as_str().to_string(),
            tool_results: Vec::new(),
            event_preview: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of `materialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    /// Human-readable validation issues (empty unless validation failed)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The agent core's public surface
pub struct EventAssistant {
    db: Database,
    provider: Arc<ModelProvider>,
    registry: Arc<ToolRegistry>,
    booking: Arc<dyn BookingApi>,
    orchestrator: OrchestratorKind,
    strategy: Strategy,
    model: String,
}

impl EventAssistant {
    /// Build an assistant with the full event tool set registered.
    pub async fn new(
        db: Database,
        provider: Arc<ModelProvider>,
        booking: Arc<dyn BookingApi>,
        orchestrator: OrchestratorKind,
        model: impl Into<String>,
    ) -> Self {
        Self {
            db,
            provider,
            registry: Arc::new(event_tool_registry().await),
            booking,
            orchestrator,
            strategy: Strategy::default(),
            model: model.into(),
        }
    }

    /// Build an assistant wired from the process-wide model selection:
    /// endpoint and model tag come from [`config::current`], with the
    /// default queue and breaker in front.
    pub async fn with_current_config(
        db: Database,
        booking: Arc<dyn BookingApi>,
        orchestrator: OrchestratorKind,
    ) -> Self {
        let model_config = config::current();
        let backend = Arc::new(OllamaClient::from_config(&model_config));
        let provider = Arc::new(ModelProvider::with_defaults(backend));
        Self::new(db, provider, booking, orchestrator, model_config.model).await
    }

    /// Select the extraction strategy the reasoning loop runs on model
    /// output.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn conversations(&self) -> ConversationStore {
        ConversationStore::new(self.db.clone())
    }

    fn messages(&self) -> MessageStore {
        MessageStore::new(self.db.clone())
    }

    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.db.clone())
    }

    fn drafts(&self) -> DraftStore {
        DraftStore::new(self.db.clone())
    }

    /// Start a conversation for `user_id` and persist the greeting.
    pub fn start_conversation(&self, user_id: &str) -> ConversationStart {
        let result: anyhow::Result<String> = (|| {
            let conversation_id = self.conversations().create(user_id)?;
            self.sessions().create(&conversation_id)?;
            self.messages()
                .append(&conversation_id, "assistant", GREETING, None)?;
            Ok(conversation_id)
        })();

        match result {
            Ok(conversation_id) => {
                info!("assistant: started conversation {}", conversation_id);
                ConversationStart {
                    conversation_id: Some(conversation_id),
                    greeting: GREETING.to_string(),
                    error: None,
                }
            }
            Err(e) => {
                error!("assistant: start_conversation failed: {}", e);
                ConversationStart {
                    conversation_id: None,
                    greeting: GENERIC_FAILURE.to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Process one user message. The caller must not invoke this twice
    /// concurrently for the same conversation.
    pub async fn process_message(&self, conversation_id: &str, user_text: &str) -> ProcessReply {
        match self.process_message_inner(conversation_id, user_text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("assistant: process_message failed: {}", e);
                ProcessReply::failure(GENERIC_FAILURE, e)
            }
        }
    }

    async fn process_message_inner(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> anyhow::Result<ProcessReply> {
        let Some(conversation) = self.conversations().get(conversation_id)? else {
            return Ok(ProcessReply::failure(
                "I couldn't find that conversation. Please start a new one.",
                "conversation not found",
            ));
        };

        if conversation.status == ConversationStatus::Archived {
            return Ok(ProcessReply::failure(
                "This conversation has been archived. Please start a new one.",
                "conversation archived",
            ));
        }

        let sessions = self.sessions();
        let session = match sessions.for_conversation(conversation_id)? {
            Some(session) => session,
            None => {
                let id = sessions.create(conversation_id)?;
                sessions
                    .get(&id)?
                    .ok_or_else(|| anyhow::anyhow!("session {} vanished after create", id))?
            }
        };

        // History comes from the persisted log, before this turn's message
        let history = self.messages().chat_history(conversation_id)?;
        self.messages()
            .append(conversation_id, "user", user_text, None)?;
        sessions.set_status(&session.id, SessionStatus::Thinking, None)?;

        let ctx = ToolContext {
            session_id: session.id.clone(),
            drafts: self.drafts(),
        };

        let response = match self.orchestrator {
            OrchestratorKind::ReactLoop => {
                ReactLoop::new(Arc::clone(&self.provider), Arc::clone(&self.registry))
                    .with_strategy(self.strategy)
                    .process(&self.model, &history, user_text, &ctx)
                    .await
            }
            OrchestratorKind::Workflow => {
                Workflow::new(Arc::clone(&self.provider), Arc::clone(&self.registry))
                    .process(&self.model, &history, user_text, &ctx)
                    .await
            }
        };

        for step in &response.intermediate_steps {
            sessions.record_tool_use(&session.id, &step.name)?;
        }

        let status = if response.success {
            SessionStatus::Idle
        } else {
            SessionStatus::Waiting
        };
        sessions.set_status(&session.id, status, None)?;

        let metadata = json!({
            "tool_results": response.intermediate_steps,
            "status": status.as_str(),
        });
        self.messages().append(
            conversation_id,
            "assistant",
            &response.output,
            Some(&metadata),
        )?;

        let event_preview = self
            .drafts()
            .get_current(&session.id)?
            .map(|entry| json!({"event_data": entry.event_data, "tickets": entry.tickets}));

        Ok(ProcessReply {
            response_text: response.output,
            status: status.as_str().to_string(),
            tool_results: response.intermediate_steps,
            event_preview,
            error: None,
        })
    }

    /// Current draft for a session, or None (including on storage errors,
    /// which are logged - "no draft" is a normal state either way).
    pub fn get_current_draft(&self, session_id: &str) -> Option<Value> {
        match self.drafts().get_current(session_id) {
            Ok(entry) => entry.map(|e| {
                json!({
                    "event_data": e.event_data,
                    "tickets": e.tickets,
                    "version": e.version,
                    "used_to_create_event": e.used_to_create_event,
                })
            }),
            Err(e) => {
                error!("assistant: get_current_draft failed: {}", e);
                None
            }
        }
    }

    /// Turn the current draft into a permanent booking record.
    ///
    /// Validation failures come back as human-readable issues; booking-API
    /// failures come back as a generic error. Either way the draft is left
    /// untouched so the user can fix and retry.
    pub async fn materialize(&self, session_id: &str, user_id: &str) -> MaterializeResult {
        let current = match self.drafts().get_current(session_id) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return MaterializeResult {
                    success: false,
                    event_id: None,
                    issues: vec!["There is no draft to publish yet.".to_string()],
                    error: None,
                }
            }
            Err(e) => {
                error!("assistant: materialize load failed: {}", e);
                return MaterializeResult {
                    success: false,
                    event_id: None,
                    issues: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let issues = validate_draft(&current.event_data);
        if !issues.is_empty() {
            return MaterializeResult {
                success: false,
                event_id: None,
                issues,
                error: None,
            };
        }

        let fields = to_booking_fields(&current, user_id);
        match self.booking.create(fields).await {
            Ok(event_id) => {
                if let Err(e) = self.drafts().mark_used(session_id, event_id) {
                    // The event exists; losing the stamp is log-worthy only
                    error!("assistant: mark_used failed after create: {}", e);
                }
                info!(
                    "assistant: materialized session {} into event {}",
                    session_id, event_id
                );
                MaterializeResult {
                    success: true,
                    event_id: Some(event_id),
                    issues: Vec::new(),
                    error: None,
                }
            }
            Err(e) => {
                error!("assistant: booking create failed: {}", e);
                MaterializeResult {
                    success: false,
                    event_id: None,
                    issues: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Archive, pause, or resume a conversation.
    pub fn set_conversation_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> anyhow::Result<()> {
        self.conversations().set_status(conversation_id, status)
    }

    /// The agent session backing a conversation, if one exists.
    pub fn session_for_conversation(&self, conversation_id: &str) -> Option<String> {
        self.sessions()
            .for_conversation(conversation_id)
            .ok()
            .flatten()
            .map(|s| s.id)
    }
}
