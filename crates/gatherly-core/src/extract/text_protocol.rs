//! `TOOL_CALL:` text-convention parser
//!
//! For backends without structured tool calling, tools are described
//! in-prompt and the model is asked to emit lines of the form:
//!
//! ```text
//! TOOL_CALL: create_event_draft {"title": "Science Fair"}
//! ```
//!
//! A single malformed call must not abort the whole turn: bad JSON and
//! unknown tool names are logged and skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::ai::types::{AiToolCall, ChatOutcome};

use super::{scan_json_object, Extraction};

static TOOL_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TOOL_CALL:\s*([A-Za-z0-9_]+)").expect("valid regex"));

/// Parse every `TOOL_CALL: name {json}` occurrence out of raw text.
pub fn parse_tool_calls(text: &str, tool_names: &[String]) -> Vec<AiToolCall> {
    let mut calls = Vec::new();

    for capture in TOOL_CALL_RE.captures_iter(text) {
        let name = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
        let args_from = capture.get(0).map(|m| m.end()).unwrap_or(0);

        if !tool_names.iter().any(|n| n == name) {
            warn!("text protocol: skipping unknown tool '{}'", name);
            continue;
        }

        let Some(blob) = scan_json_object(text, args_from) else {
            warn!("text protocol: no JSON arguments after '{}'", name);
            continue;
        };

        match serde_json::from_str(blob) {
            Ok(arguments) => {
                debug!("text protocol: parsed call to '{}'", name);
                calls.push(AiToolCall {
                    name: name.to_string(),
                    arguments,
                });
            }
            Err(e) => {
                warn!("text protocol: malformed JSON for '{}': {}", name, e);
            }
        }
    }

    calls
}

/// Run the text-convention strategy over a model outcome.
pub fn extract(outcome: &ChatOutcome, tool_names: &[String]) -> Extraction {
    let calls = parse_tool_calls(&outcome.content, tool_names);
    let final_answer = if calls.is_empty() && !outcome.content.trim().is_empty() {
        Some(outcome.content.trim().to_string())
    } else {
        None
    };
    Extraction {
        calls,
        final_answer,
    }
}
