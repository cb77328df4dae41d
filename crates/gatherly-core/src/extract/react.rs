//! ReAct-style extraction with fallback cascade
//!
//! Parses `Thought:` / `Action:` / `Action Input:` / `Final Answer:` sections
//! out of free text. The target local models frequently ignore the format,
//! so a cascade of fallbacks applies, in order:
//!
//! 1. Action found with no Action Input - synthesize arguments from
//!    title/date heuristics over the raw text
//! 2. Only a Thought mentioning creation/event words - force the default
//!    creation action
//! 3. No structured tokens at all but event-domain keywords present - force
//!    the default creation action
//! 4. Nothing matched - emit a clarifying final answer
//!
//! The cascade is intentional: a concrete (possibly imperfect) tool call the
//! user can correct beats a user-facing non-answer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ai::types::{AiToolCall, ChatOutcome};

use super::{first_json_object, heuristics, Extraction};

/// Tool forced by the fallback cascade when the model fails to pick one
pub const DEFAULT_CREATION_TOOL: &str = "create_event_draft";

/// Clarifying reply used when no fallback applies
pub const CLARIFY_ANSWER: &str =
    "I'd love to help set up your event! Could you tell me a bit more - what kind of event, and when?";

static THOUGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*thought:\s*(.+)$").expect("valid regex"));

static ACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*action:\s*([A-Za-z0-9_]+)").expect("valid regex"));

static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)action\s*input:\s*(.*?)(?:\n\s*(?:thought|action|final\s*answer)\s*:|\z)")
        .expect("valid regex")
});

static FINAL_ANSWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)final\s*answer:\s*(.+)\z").expect("valid regex"));

const CREATION_WORDS: &[&str] = &["create", "set up", "organize", "plan", "schedule", "event"];

/// Run the ReAct strategy over a model outcome.
///
/// Given text containing domain keywords, this never returns an empty
/// extraction - at worst it forces the default creation tool with
/// synthesized arguments.
pub fn extract(outcome: &ChatOutcome, tool_names: &[String]) -> Extraction {
    let text = outcome.content.as_str();

    if let Some(capture) = FINAL_ANSWER_RE.captures(text) {
        let answer = capture[1].trim().to_string();
        debug!("react: final answer ({} chars)", answer.len());
        return Extraction {
            calls: Vec::new(),
            final_answer: Some(answer),
        };
    }

    if let Some(action) = ACTION_RE.captures(text) {
        let name = action[1].to_string();
        if !tool_names.iter().any(|n| n == &name) {
            warn!("react: model chose unknown tool '{}'", name);
            return fallback(text, tool_names);
        }

        let arguments = ACTION_INPUT_RE
            .captures(text)
            .and_then(|c| first_json_object(&c[1]))
            // Fallback 1: action without usable input - synthesize one
            .unwrap_or_else(|| synthesize_arguments(text));

        return Extraction {
            calls: vec![AiToolCall { name, arguments }],
            final_answer: None,
        };
    }

    // Fallback 2: a thought about creating something, but no action
    if let Some(thought) = THOUGHT_RE.captures(text) {
        let lower = thought[1].to_lowercase();
        if CREATION_WORDS.iter().any(|w| lower.contains(w)) {
            debug!("react: forcing creation action from thought");
            return forced_creation(text, tool_names);
        }
    }

    fallback(text, tool_names)
}

/// Fallbacks 3 and 4: domain keywords force a creation action, otherwise
/// ask the user for more detail.
fn fallback(text: &str, tool_names: &[String]) -> Extraction {
    if heuristics::mentions_event_domain(text) {
        debug!("react: forcing creation action from domain keywords");
        return forced_creation(text, tool_names);
    }

    Extraction {
        calls: Vec::new(),
        final_answer: Some(CLARIFY_ANSWER.to_string()),
    }
}

fn forced_creation(text: &str, tool_names: &[String]) -> Extraction {
    if !tool_names.iter().any(|n| n == DEFAULT_CREATION_TOOL) {
        return Extraction {
            calls: Vec::new(),
            final_answer: Some(CLARIFY_ANSWER.to_string()),
        };
    }
    Extraction {
        calls: vec![AiToolCall {
            name: DEFAULT_CREATION_TOOL.to_string(),
            arguments: synthesize_arguments(text),
        }],
        final_answer: None,
    }
}

/// Build best-guess creation arguments from raw text.
fn synthesize_arguments(text: &str) -> Value {
    let mut arguments = json!({ "title": heuristics::infer_title(text) });
    if let Some(date) = heuristics::infer_date(text) {
        arguments["start_time"] = Value::String(format!("{}T10:00:00", date));
    }
    arguments
}
