//! Persistence layer
//!
//! SQLite-based storage for:
//! - Conversations and their append-only message transcripts
//! - Agent sessions (memory blob, status label, tools-used audit list)
//! - Versioned event drafts living inside session memory

mod conversations;
mod database;
mod drafts;
mod messages;
mod sessions;

pub use conversations::{Conversation, ConversationStatus, ConversationStore};
pub use database::Database;
pub use drafts::{to_booking_fields, validate_draft, DraftEntry, DraftStore};
pub use messages::{MessageStore, StoredMessage};
pub use sessions::{AgentSession, SessionStatus, SessionStore};
