//! Agent session persistence
//!
//! An AgentSession is the sole owner of the draft data for a conversation:
//! `memory` is an arbitrary JSON blob (the draft store container),
//! `status` a simple non-branching label, `tools_used` an append-only audit
//! list of every tool the agent executed.

use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database::Database;

/// Non-branching status label for an agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Thinking,
    UsingTool,
    Planning,
    Waiting,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Thinking => "thinking",
            SessionStatus::UsingTool => "using_tool",
            SessionStatus::Planning => "planning",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Error => "error",
        }
    }
}

/// A loaded agent session row
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub id: String,
    pub conversation_id: String,
    pub memory: Value,
    pub current_step: Option<String>,
    pub status: String,
    pub tools_used: Vec<String>,
}

/// Agent session store
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a session owned by `conversation_id`.
    pub fn create(&self, conversation_id: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.db.conn().execute(
            "INSERT INTO agent_sessions (id, conversation_id, memory, status, tools_used, created_at, updated_at)
             VALUES (?1, ?2, '{}', 'idle', '[]', ?3, ?4)",
            params![id, conversation_id, now, now],
        )?;

        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<AgentSession>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, memory, current_step, status, tools_used
             FROM agent_sessions WHERE id = ?1",
        )?;

        let mut rows = stmt.query_map([id], |row| {
            let memory: String = row.get(2)?;
            let tools_used: String = row.get(5)?;
            Ok(AgentSession {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                memory: serde_json::from_str(&memory).unwrap_or(Value::Object(Default::default())),
                current_step: row.get(3)?,
                status: row.get(4)?,
                tools_used: serde_json::from_str(&tools_used).unwrap_or_default(),
            })
        })?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// The most recent session for a conversation, if any.
    pub fn for_conversation(&self, conversation_id: &str) -> Result<Option<AgentSession>> {
        let id: Option<String> = {
            let conn = self.db.conn();
            let mut stmt = conn.prepare(
                "SELECT id FROM agent_sessions WHERE conversation_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
            )?;
            let mut rows = stmt.query_map([conversation_id], |row| row.get(0))?;
            match rows.next() {
                Some(row) => Some(row?),
                None => None,
            }
        };

        match id {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Overwrite the session memory blob.
    pub fn put_memory(&self, id: &str, memory: &Value) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let affected = self.db.conn().execute(
            "UPDATE agent_sessions SET memory = ?1, updated_at = ?2 WHERE id = ?3",
            params![memory.to_string(), now, id],
        )?;
        if affected == 0 {
            anyhow::bail!("agent session {} not found", id);
        }
        Ok(())
    }

    /// Set the status label and optional current step.
    pub fn set_status(&self, id: &str, status: SessionStatus, step: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "UPDATE agent_sessions SET status = ?1, current_step = ?2, updated_at = ?3
             WHERE id = ?4",
            params![status.as_str(), step, now, id],
        )?;
        Ok(())
    }

    /// Append a tool name to the audit list.
    pub fn record_tool_use(&self, id: &str, tool_name: &str) -> Result<()> {
        let Some(session) = self.get(id)? else {
            anyhow::bail!("agent session {} not found", id);
        };

        let mut tools = session.tools_used;
        tools.push(tool_name.to_string());
        let now = Utc::now().to_rfc3339();

        self.db.conn().execute(
            "UPDATE agent_sessions SET tools_used = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(&tools)?, now, id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::storage::{ConversationStore, Database};

    use super::{SessionStatus, SessionStore};

    fn setup() -> (SessionStore, String) {
        let db = Database::in_memory().expect("db");
        let conversations = ConversationStore::new(db.clone());
        let conversation_id = conversations.create("user-1").expect("conversation");
        let store = SessionStore::new(db);
        let session_id = store.create(&conversation_id).expect("session");
        (store, session_id)
    }

    #[test]
    fn fresh_session_is_idle_with_empty_memory() {
        let (store, id) = setup();
        let session = store.get(&id).expect("get").expect("exists");
        assert_eq!(session.status, "idle");
        assert_eq!(session.memory, json!({}));
        assert!(session.tools_used.is_empty());
    }

    #[test]
    fn memory_roundtrip() {
        let (store, id) = setup();
        let memory = json!({"event_drafts": [{"version": 1}]});
        store.put_memory(&id, &memory).expect("put");

        let session = store.get(&id).expect("get").expect("exists");
        assert_eq!(session.memory, memory);
    }

    #[test]
    fn status_and_audit_trail() {
        let (store, id) = setup();
        store
            .set_status(&id, SessionStatus::UsingTool, Some("create_event_draft"))
            .expect("status");
        store
            .record_tool_use(&id, "create_event_draft")
            .expect("record");
        store
            .record_tool_use(&id, "add_ticket_type")
            .expect("record");

        let session = store.get(&id).expect("get").expect("exists");
        assert_eq!(session.status, "using_tool");
        assert_eq!(session.current_step.as_deref(), Some("create_event_draft"));
        assert_eq!(
            session.tools_used,
            vec!["create_event_draft", "add_ticket_type"]
        );
    }
}
