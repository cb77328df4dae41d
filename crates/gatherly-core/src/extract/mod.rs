//! Tool-call extraction strategies
//!
//! Three interchangeable strategies turn raw model output into zero-or-more
//! tool calls: the provider's own structured tool_calls (`native`), a
//! `TOOL_CALL: name {json}` text convention (`text_protocol`), and a
//! Thought/Action/Action Input/Final Answer parser with aggressive fallbacks
//! for models that ignore the format (`react`).
//!
//! A single malformed tool call must never abort the whole turn: parse
//! failures are logged and skipped.

pub mod heuristics;
pub mod native;
pub mod react;
pub mod text_protocol;

use serde_json::Value;

use crate::ai::types::{AiToolCall, ChatOutcome};

/// Which strategy an orchestrator should run on model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Trust the provider's structured tool_calls field
    Native,
    /// Scan for `TOOL_CALL: name {json}` occurrences
    TextProtocol,
    /// Parse Thought/Action/Action Input/Final Answer sections
    #[default]
    React,
}

impl Strategy {
    /// Run this strategy's extractor over one model turn.
    pub fn extract(&self, outcome: &ChatOutcome, tool_names: &[String]) -> Extraction {
        match self {
            Strategy::Native => native::extract(outcome, tool_names),
            Strategy::TextProtocol => text_protocol::extract(outcome, tool_names),
            Strategy::React => react::extract(outcome, tool_names),
        }
    }
}

/// Result of running an extraction strategy over one model turn
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Tool calls to execute, in the order they appeared
    pub calls: Vec<AiToolCall>,
    /// Terminal answer, if the model produced one
    pub final_answer: Option<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.final_answer.is_none()
    }
}

/// Scan `text` starting at `start` for a balanced JSON object.
///
/// Returns the slice spanning the object (brace-balanced, string-aware) or
/// None if no object opens at/after `start`.
pub(crate) fn scan_json_object(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let open = text[start..].find('{')? + start;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Best-effort parse of the first JSON object found in free text.
pub(crate) fn first_json_object(text: &str) -> Option<Value> {
    let mut from = 0;
    while let Some(candidate) = scan_json_object(text, from) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Some(value);
        }
        // Skip past this opening brace and keep scanning
        let offset = text[from..].find('{').unwrap_or(0);
        from = from + offset + 1;
        if from >= text.len() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_nested_object() {
        let text = r#"prefix {"a": {"b": 1}, "c": "}"} suffix"#;
        let object = scan_json_object(text, 0).expect("object");
        assert_eq!(object, r#"{"a": {"b": 1}, "c": "}"}"#);
    }

    #[test]
    fn scan_returns_none_without_close() {
        assert!(scan_json_object("{\"a\": 1", 0).is_none());
    }

    #[test]
    fn first_json_object_skips_malformed() {
        let text = r#"{not json} then {"title": "ok"}"#;
        let value = first_json_object(text).expect("second object parses");
        assert_eq!(value["title"], "ok");
    }
}
