//! End-to-end flows through the assistant façade with a scripted backend.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use gatherly_core::agent::OrchestratorKind;
use gatherly_core::ai::{config, ChatBackend, ChatOutcome, ChatRequest, ModelProvider, ProviderError};
use gatherly_core::booking::testing::RecordingBookingApi;
use gatherly_core::extract::Strategy;
use gatherly_core::storage::{Database, DraftStore};
use gatherly_core::EventAssistant;

/// Backend that replays a fixed sequence of model replies.
struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatOutcome, ProviderError> {
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| "Final Answer: All done.".to_string());
        Ok(ChatOutcome::text(reply))
    }
}

async fn assistant_with(
    replies: &[&str],
    orchestrator: OrchestratorKind,
) -> (EventAssistant, Database, Arc<RecordingBookingApi>) {
    let db = Database::in_memory().expect("db");
    let provider = Arc::new(ModelProvider::with_defaults(ScriptedBackend::new(replies)));
    let booking = Arc::new(RecordingBookingApi::default());
    let assistant = EventAssistant::new(
        db.clone(),
        provider,
        booking.clone(),
        orchestrator,
        "test-model",
    )
    .await;
    (assistant, db, booking)
}

#[tokio::test]
async fn react_loop_creates_draft_from_event_request() {
    let (assistant, db, _) = assistant_with(
        &["Thought: the user wants a science fair event\n\
           Action: create_event_draft\n\
           Action Input: {\"title\": \"Science Fair\", \"start_time\": \"2026-03-14T10:00:00\"}"],
        OrchestratorKind::ReactLoop,
    )
    .await;

    let start = assistant.start_conversation("parent-1");
    let conversation_id = start.conversation_id.expect("conversation");
    assert!(!start.greeting.is_empty());

    let reply = assistant
        .process_message(&conversation_id, "Set up a science fair on March 14 2026")
        .await;

    assert_eq!(reply.status, "idle");
    assert!(reply.error.is_none());
    assert_eq!(reply.tool_results.len(), 1);
    assert_eq!(reply.tool_results[0].name, "create_event_draft");
    assert!(reply.tool_results[0].error.is_none());

    let preview = reply.event_preview.expect("preview");
    assert_eq!(preview["event_data"]["title"], "Science Fair");

    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");
    let draft = DraftStore::new(db)
        .get_current(&session_id)
        .expect("load")
        .expect("draft exists");
    assert_eq!(draft.version, 1);
    assert_eq!(draft.event_data["title"], "Science Fair");
    assert!(draft.event_data["start_time"].as_str().is_some());
}

#[tokio::test]
async fn ticket_before_draft_reports_no_draft_and_stores_nothing() {
    let (assistant, db, _) = assistant_with(
        &[
            "Thought: add the ticket\n\
             Action: add_ticket_type\n\
             Action Input: {\"name\": \"Child\", \"price\": 15}",
            "Final Answer: I couldn't add the ticket because there is no draft yet.",
        ],
        OrchestratorKind::ReactLoop,
    )
    .await;

    let conversation_id = assistant
        .start_conversation("parent-1")
        .conversation_id
        .expect("conversation");

    let reply = assistant
        .process_message(&conversation_id, "Add a child ticket for $15")
        .await;

    let step = reply
        .tool_results
        .iter()
        .find(|s| s.name == "add_ticket_type")
        .expect("ticket step recorded");
    assert!(step.error.as_deref().unwrap().contains("No draft found"));

    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");
    let draft = DraftStore::new(db).get_current(&session_id).expect("load");
    assert!(draft.is_none());
}

#[tokio::test]
async fn workflow_creates_draft_and_tickets_every_turn() {
    let (assistant, db, _) = assistant_with(
        &[r#"{"title": "Bake Sale", "start_time": "2026-05-01T10:00:00",
              "tickets": [{"name": "Adult", "price": 5.0}]}"#],
        OrchestratorKind::Workflow,
    )
    .await;

    let conversation_id = assistant
        .start_conversation("parent-2")
        .conversation_id
        .expect("conversation");

    let reply = assistant
        .process_message(&conversation_id, "A bake sale on May 1st, adult tickets $5")
        .await;

    assert_eq!(reply.status, "idle");
    let names: Vec<&str> = reply.tool_results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["create_event_draft", "add_ticket_type"]);

    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");
    let draft = DraftStore::new(db)
        .get_current(&session_id)
        .expect("load")
        .expect("draft exists");
    assert_eq!(draft.event_data["title"], "Bake Sale");
    assert_eq!(draft.tickets.len(), 1);
    assert_eq!(draft.tickets[0]["name"], "Adult");
}

#[tokio::test]
async fn materialize_rejects_invalid_ages_without_calling_booking() {
    let (assistant, db, booking) = assistant_with(&[], OrchestratorKind::ReactLoop).await;

    let conversation_id = assistant
        .start_conversation("parent-3")
        .conversation_id
        .expect("conversation");
    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");

    DraftStore::new(db)
        .save(
            &session_id,
            json!({
                "title": "Chess Club",
                "start_time": "2026-09-01T15:00:00",
                "min_age": 10,
                "max_age": 5,
            }),
            vec![],
            "test",
        )
        .expect("save");

    let result = assistant.materialize(&session_id, "parent-3").await;

    assert!(!result.success);
    assert!(result.event_id.is_none());
    assert!(result.issues.iter().any(|i| i.contains("age")));
    assert!(booking.created.lock().is_empty());
}

#[tokio::test]
async fn materialize_creates_event_and_stamps_draft() {
    let (assistant, db, booking) = assistant_with(&[], OrchestratorKind::ReactLoop).await;

    let conversation_id = assistant
        .start_conversation("parent-4")
        .conversation_id
        .expect("conversation");
    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");

    let drafts = DraftStore::new(db);
    drafts
        .save(
            &session_id,
            json!({"title": "Science Fair", "start_time": "2026-03-14T10:00:00"}),
            vec![json!({"name": "Child", "price": 15.0})],
            "test",
        )
        .expect("save");

    let result = assistant.materialize(&session_id, "parent-4").await;

    assert!(result.success);
    assert_eq!(result.event_id, Some(1));
    assert!(result.issues.is_empty());

    let created = booking.created.lock();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["title"], "Science Fair");
    assert_eq!(created[0]["created_by"], "parent-4");
    assert_eq!(created[0]["draft_version"], 1);
    drop(created);

    let draft = drafts
        .get_current(&session_id)
        .expect("load")
        .expect("draft exists");
    assert_eq!(draft.used_to_create_event, Some(1));
}

#[tokio::test]
async fn text_protocol_strategy_flows_through_the_assistant() {
    let (assistant, db, _) = assistant_with(
        &[r#"TOOL_CALL: create_event_draft {"title": "Craft Day"}"#],
        OrchestratorKind::ReactLoop,
    )
    .await;
    let assistant = assistant.with_strategy(Strategy::TextProtocol);

    let conversation_id = assistant
        .start_conversation("parent-7")
        .conversation_id
        .expect("conversation");

    let reply = assistant
        .process_message(&conversation_id, "set up a craft day")
        .await;

    assert_eq!(reply.status, "idle");
    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");
    let draft = DraftStore::new(db)
        .get_current(&session_id)
        .expect("load")
        .expect("draft exists");
    assert_eq!(draft.event_data["title"], "Craft Day");
}

#[tokio::test]
async fn assistant_builds_from_current_model_config() {
    config::set_current(config::ModelConfig {
        model: "llama3.2:3b".to_string(),
        ..config::ModelConfig::default()
    });

    let db = Database::in_memory().expect("db");
    let booking = Arc::new(RecordingBookingApi::default());
    let assistant =
        EventAssistant::with_current_config(db, booking, OrchestratorKind::ReactLoop).await;

    // No model call happens until a message is processed
    let start = assistant.start_conversation("parent-8");
    assert!(start.conversation_id.is_some());
    assert!(start.error.is_none());
}

#[tokio::test]
async fn booking_failure_leaves_draft_untouched() {
    let (assistant, db, booking) = assistant_with(&[], OrchestratorKind::ReactLoop).await;
    booking
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let conversation_id = assistant
        .start_conversation("parent-5")
        .conversation_id
        .expect("conversation");
    let session_id = assistant
        .session_for_conversation(&conversation_id)
        .expect("session");

    let drafts = DraftStore::new(db);
    drafts
        .save(
            &session_id,
            json!({"title": "Art Workshop", "start_time": "2026-06-10T13:00:00"}),
            vec![],
            "test",
        )
        .expect("save");

    let result = assistant.materialize(&session_id, "parent-5").await;

    assert!(!result.success);
    assert!(result.error.is_some());

    let draft = drafts
        .get_current(&session_id)
        .expect("load")
        .expect("draft exists");
    assert_eq!(draft.version, 1);
    assert!(draft.used_to_create_event.is_none());
}
