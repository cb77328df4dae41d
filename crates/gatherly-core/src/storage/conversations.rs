//! Conversation CRUD
//!
//! Conversations are archived or paused explicitly, never hard-deleted
//! while drafts reference them.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::Database;

/// Conversation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
    Paused,
    Error,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
            ConversationStatus::Paused => "paused",
            ConversationStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ConversationStatus::Active),
            "archived" => Ok(ConversationStatus::Archived),
            "paused" => Ok(ConversationStatus::Paused),
            "error" => Ok(ConversationStatus::Error),
            other => Err(format!("unknown conversation status: {}", other)),
        }
    }
}

/// Conversation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub status: ConversationStatus,
    /// Free-form context blob
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation store
pub struct ConversationStore {
    db: Database,
}

impl ConversationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new active conversation for `user_id`.
    pub fn create(&self, user_id: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.db.conn().execute(
            "INSERT INTO conversations (id, user_id, status, created_at, updated_at)
             VALUES (?1, ?2, 'active', ?3, ?4)",
            params![id, user_id, now, now],
        )?;

        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, status, context, created_at, updated_at
             FROM conversations WHERE id = ?1",
        )?;

        let mut rows = stmt.query_map([id], Self::map_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Update the lifecycle status (archive/pause/resume/error).
    pub fn set_status(&self, id: &str, status: ConversationStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let affected = self.db.conn().execute(
            "UPDATE conversations SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )?;
        if affected == 0 {
            anyhow::bail!("conversation {} not found", id);
        }
        Ok(())
    }

    /// Replace the free-form context blob.
    pub fn set_context(&self, id: &str, context: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.db.conn().execute(
            "UPDATE conversations SET context = ?1, updated_at = ?2 WHERE id = ?3",
            params![context, now, id],
        )?;
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
        let status: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;

        Ok(Conversation {
            id: row.get(0)?,
            user_id: row.get(1)?,
            status: status.parse().unwrap_or(ConversationStatus::Error),
            context: row.get(3)?,
            created_at: parse_rfc3339(&created_at),
            updated_at: parse_rfc3339(&updated_at),
        })
    }
}

pub(crate) fn parse_rfc3339(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
