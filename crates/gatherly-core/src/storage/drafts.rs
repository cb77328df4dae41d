//! Versioned event draft store
//!
//! Drafts live inside the owning agent session's `memory` blob as an
//! append-only history list. `version` is monotonically increasing per
//! session; the current draft is always the highest version. Materialization
//! reads the current draft and only ever stamps `used_to_create_event` - it
//! never mutates draft fields.
//!
//! Callers must treat "no draft yet" as a normal, not exceptional, state.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::database::Database;
use super::sessions::SessionStore;

const MEMORY_KEY: &str = "event_drafts";

/// One versioned draft entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftEntry {
    pub event_data: Value,
    #[serde(default)]
    pub tickets: Vec<Value>,
    /// Which tool or step produced this version
    pub source: String,
    pub timestamp: String,
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_to_create_event: Option<i64>,
}

/// Draft store over session memory
#[derive(Clone)]
pub struct DraftStore {
    db: Database,
}

impl DraftStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn sessions(&self) -> SessionStore {
        SessionStore::new(self.db.clone())
    }

    fn load_history(&self, session_id: &str) -> Result<(Value, Vec<DraftEntry>)> {
        let sessions = self.sessions();
        let Some(session) = sessions.get(session_id)? else {
            anyhow::bail!("agent session {} not found", session_id);
        };

        let history = session
            .memory
            .get(MEMORY_KEY)
            .and_then(|v| serde_json::from_value::<Vec<DraftEntry>>(v.clone()).ok())
            .unwrap_or_default();

        Ok((session.memory, history))
    }

    fn store_history(
        &self,
        session_id: &str,
        mut memory: Value,
        history: &[DraftEntry],
    ) -> Result<()> {
        memory[MEMORY_KEY] = serde_json::to_value(history)?;
        self.sessions().put_memory(session_id, &memory)
    }

    /// Append a new draft version. Returns the version number assigned.
    pub fn save(
        &self,
        session_id: &str,
        event_data: Value,
        tickets: Vec<Value>,
        source: &str,
    ) -> Result<i64> {
        let (memory, mut history) = self.load_history(session_id)?;

        let next_version = history.iter().map(|e| e.version).max().unwrap_or(0) + 1;
        let entry = DraftEntry {
            event_data: normalize_datetimes(event_data),
            tickets,
            source: source.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: next_version,
            used_to_create_event: None,
        };

        debug!(
            "draft store: session {} saving version {} from {}",
            session_id, next_version, source
        );
        history.push(entry);
        self.store_history(session_id, memory, &history)?;
        Ok(next_version)
    }

    /// The highest-version draft, or None when no draft exists yet.
    pub fn get_current(&self, session_id: &str) -> Result<Option<DraftEntry>> {
        let (_, history) = self.load_history(session_id)?;
        Ok(history.into_iter().max_by_key(|e| e.version))
    }

    /// Full version history, oldest first. Audit/debugging surface.
    pub fn history(&self, session_id: &str) -> Result<Vec<DraftEntry>> {
        let (_, mut history) = self.load_history(session_id)?;
        history.sort_by_key(|e| e.version);
        Ok(history)
    }

    /// Shallow-merge partial fields into the current draft and save a new
    /// version. Merge is last-write-wins per field; tickets are appended and
    /// deduplicated by case-insensitive name instead.
    pub fn update(&self, session_id: &str, partial: Value, source: &str) -> Result<i64> {
        let current = self.get_current(session_id)?;
        let (mut event_data, mut tickets) = match current {
            Some(entry) => (entry.event_data, entry.tickets),
            None => (json!({}), Vec::new()),
        };

        if let Value::Object(fields) = partial {
            for (key, value) in fields {
                if key == "tickets" {
                    if let Value::Array(new_tickets) = value {
                        merge_tickets(&mut tickets, new_tickets);
                    }
                } else if let Value::Object(ref mut data) = event_data {
                    data.insert(key, value);
                }
            }
        }

        self.save(session_id, event_data, tickets, source)
    }

    /// Stamp the current draft with the booking record it produced.
    pub fn mark_used(&self, session_id: &str, event_id: i64) -> Result<()> {
        let (memory, mut history) = self.load_history(session_id)?;
        let Some(entry) = history.iter_mut().max_by_key(|e| e.version) else {
            anyhow::bail!("no draft to mark in session {}", session_id);
        };
        entry.used_to_create_event = Some(event_id);
        self.store_history(session_id, memory, &history)
    }
}

/// Append tickets, skipping names already present (case-insensitive).
fn merge_tickets(existing: &mut Vec<Value>, incoming: Vec<Value>) {
    for ticket in incoming {
        let name = ticket
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| n.to_lowercase());
        let duplicate = name.as_deref().is_some_and(|name| {
            existing.iter().any(|t| {
                t.get("name")
                    .and_then(|n| n.as_str())
                    .is_some_and(|n| n.to_lowercase() == name)
            })
        });
        if !duplicate {
            existing.push(ticket);
        }
    }
}

/// Normalize any datetime-looking string fields to ISO-8601 so draft
/// payloads stay serialization-safe regardless of what the extraction
/// heuristics produced.
fn normalize_datetimes(mut event_data: Value) -> Value {
    let Value::Object(ref mut fields) = event_data else {
        return event_data;
    };

    let keys: Vec<String> = fields
        .keys()
        .filter(|k| k.ends_with("_time") || k.ends_with("_date") || *k == "date")
        .cloned()
        .collect();

    for key in keys {
        if let Some(Value::String(raw)) = fields.get(&key) {
            if let Some(normalized) = normalize_datetime(raw) {
                fields.insert(key, Value::String(normalized));
            }
        }
    }

    event_data
}

/// Try common human/date formats, producing `YYYY-MM-DDTHH:MM:SS`.
fn normalize_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    for format in ["%Y-%m-%d", "%B %d, %Y", "%B %d %Y", "%d %B %Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, format) {
            return Some(format!("{}T00:00:00", date.format("%Y-%m-%d")));
        }
    }
    None
}

/// Validate a draft ahead of materialization. Returns human-readable issues;
/// empty means the draft is ready.
pub fn validate_draft(event_data: &Value) -> Vec<String> {
    let mut issues = Vec::new();

    let title = event_data.get("title").and_then(|t| t.as_str());
    if title.map(|t| t.trim().is_empty()).unwrap_or(true) {
        issues.push("The event needs a title.".to_string());
    }

    let start = event_data.get("start_time").and_then(|t| t.as_str());
    if start.map(|s| s.trim().is_empty()).unwrap_or(true) {
        issues.push("The event needs a start time.".to_string());
    }

    let min_age = event_data.get("min_age").and_then(|v| v.as_i64());
    let max_age = event_data.get("max_age").and_then(|v| v.as_i64());
    if let (Some(min), Some(max)) = (min_age, max_age) {
        if min > max {
            issues.push(format!(
                "Minimum age ({}) cannot be greater than maximum age ({}).",
                min, max
            ));
        }
    }

    if let Some(capacity) = event_data.get("capacity").and_then(|v| v.as_i64()) {
        if capacity < 1 {
            issues.push("Capacity must be at least 1.".to_string());
        }
    }

    if let Some(cost) = event_data.get("cost").and_then(|v| v.as_f64()) {
        if cost < 0.0 {
            issues.push("Cost cannot be negative.".to_string());
        }
    }

    issues
}

/// Transform a validated draft into the booking record field shape.
pub fn to_booking_fields(entry: &DraftEntry, user_id: &str) -> Value {
    let mut fields = Map::new();
    if let Value::Object(data) = &entry.event_data {
        for (key, value) in data {
            fields.insert(key.clone(), value.clone());
        }
    }
    fields.insert("tickets".to_string(), Value::Array(entry.tickets.clone()));
    fields.insert("created_by".to_string(), json!(user_id));
    fields.insert("draft_version".to_string(), json!(entry.version));
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::storage::{ConversationStore, Database, SessionStore};

    use super::{normalize_datetime, validate_draft, DraftStore};

    fn setup() -> (DraftStore, String) {
        let db = Database::in_memory().expect("db");
        let conversation_id = ConversationStore::new(db.clone())
            .create("user-1")
            .expect("conversation");
        let session_id = SessionStore::new(db.clone())
            .create(&conversation_id)
            .expect("session");
        (DraftStore::new(db), session_id)
    }

    #[test]
    fn versions_are_sequential_and_current_is_highest() {
        let (store, session) = setup();

        for i in 1..=4 {
            let version = store
                .save(&session, json!({"title": format!("v{}", i)}), vec![], "test")
                .expect("save");
            assert_eq!(version, i);
        }

        let current = store.get_current(&session).expect("get").expect("exists");
        assert_eq!(current.version, 4);
        assert_eq!(current.event_data["title"], "v4");

        let history = store.history(&session).expect("history");
        assert_eq!(
            history.iter().map(|e| e.version).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn get_current_is_idempotent() {
        let (store, session) = setup();
        store
            .save(&session, json!({"title": "Picnic"}), vec![], "test")
            .expect("save");

        let first = store.get_current(&session).expect("get").expect("exists");
        let second = store.get_current(&session).expect("get").expect("exists");
        assert_eq!(first.event_data, second.event_data);
        assert_eq!(first.version, second.version);
    }

    #[test]
    fn no_draft_is_a_normal_state() {
        let (store, session) = setup();
        assert!(store.get_current(&session).expect("get").is_none());
    }

    #[test]
    fn update_merges_shallow_and_dedupes_tickets() {
        let (store, session) = setup();
        store
            .save(&session, json!({"title": "Fair", "capacity": 50}), vec![], "test")
            .expect("save");

        store
            .update(
                &session,
                json!({
                    "capacity": 80,
                    "tickets": [{"name": "Child", "price": 15.0}]
                }),
                "add_ticket_type",
            )
            .expect("update");

        store
            .update(
                &session,
                json!({"tickets": [
                    {"name": "child", "price": 99.0},
                    {"name": "Adult", "price": 25.0}
                ]}),
                "add_ticket_type",
            )
            .expect("update");

        let current = store.get_current(&session).expect("get").expect("exists");
        assert_eq!(current.version, 3);
        assert_eq!(current.event_data["title"], "Fair");
        assert_eq!(current.event_data["capacity"], 80);
        assert_eq!(current.tickets.len(), 2);
        // First mention wins on duplicate names
        assert_eq!(current.tickets[0]["price"], 15.0);
    }

    #[test]
    fn mark_used_stamps_without_touching_fields() {
        let (store, session) = setup();
        store
            .save(&session, json!({"title": "Fair"}), vec![], "test")
            .expect("save");

        store.mark_used(&session, 42).expect("mark");

        let current = store.get_current(&session).expect("get").expect("exists");
        assert_eq!(current.used_to_create_event, Some(42));
        assert_eq!(current.event_data["title"], "Fair");
    }

    #[test]
    fn datetimes_normalized_on_save() {
        let (store, session) = setup();
        store
            .save(
                &session,
                json!({"title": "Fair", "start_time": "August 15, 2025"}),
                vec![],
                "test",
            )
            .expect("save");

        let current = store.get_current(&session).expect("get").expect("exists");
        assert_eq!(current.event_data["start_time"], "2025-08-15T00:00:00");
    }

    #[test]
    fn normalize_handles_common_formats() {
        assert_eq!(
            normalize_datetime("2025-08-15").as_deref(),
            Some("2025-08-15T00:00:00")
        );
        assert_eq!(
            normalize_datetime("2025-08-15T10:30:00").as_deref(),
            Some("2025-08-15T10:30:00")
        );
        assert!(normalize_datetime("whenever").is_none());
    }

    #[test]
    fn validation_catches_age_ordering() {
        let issues = validate_draft(&json!({
            "title": "Fair",
            "start_time": "2025-08-15T10:00:00",
            "min_age": 10,
            "max_age": 5
        }));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_lowercase().contains("age"));
    }

    #[test]
    fn validation_requires_title_and_start() {
        let issues = validate_draft(&json!({}));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn validation_passes_complete_draft() {
        let issues = validate_draft(&json!({
            "title": "Fair",
            "start_time": "2025-08-15T10:00:00",
            "capacity": 100,
            "cost": 5.0,
            "min_age": 5,
            "max_age": 12
        }));
        assert!(issues.is_empty());
    }
}
