//! Message persistence
//!
//! Messages are append-only; ordering by insertion is the conversation
//! transcript and the only source of history fed back into the model.
//! History is always reconstructed from this log - never cached in process
//! memory keyed by session id.

use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use serde_json::Value;

use crate::ai::types::{ChatMessage, Role};

use super::database::Database;

/// A stored message row
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    /// Tool results, status, and other structured extras
    pub metadata: Option<Value>,
}

/// Message store
pub struct MessageStore {
    db: Database,
}

impl MessageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a message to a conversation.
    pub fn append(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let metadata_json = metadata.map(|m| m.to_string());

        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![conversation_id, role, content, metadata_json, now],
        )?;
        conn.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![now, conversation_id],
        )?;

        Ok(())
    }

    /// Load the full transcript for a conversation, in insertion order.
    pub fn transcript(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT role, content, metadata FROM messages
             WHERE conversation_id = ?1 ORDER BY id",
        )?;

        let messages = stmt.query_map([conversation_id], |row| {
            let metadata: Option<String> = row.get(2)?;
            Ok(StoredMessage {
                role: row.get(0)?,
                content: row.get(1)?,
                metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            })
        })?;

        messages.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Transcript converted to provider chat messages, skipping rows whose
    /// role doesn't map (defensive against hand-edited data).
    pub fn chat_history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let history = self
            .transcript(conversation_id)?
            .into_iter()
            .filter_map(|m| {
                let role: Role = m.role.parse().ok()?;
                Some(ChatMessage {
                    role,
                    content: m.content,
                })
            })
            .collect();
        Ok(history)
    }

    pub fn count(&self, conversation_id: &str) -> Result<usize> {
        let count: i64 = self.db.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            [conversation_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
