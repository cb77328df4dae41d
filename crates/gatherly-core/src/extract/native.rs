//! Native extraction strategy
//!
//! Trusts the provider's structured tool_calls verbatim; arguments are
//! already parsed. Unknown tool names are dropped with a warning so a
//! hallucinated name cannot reach the registry.

use tracing::warn;

use crate::ai::types::ChatOutcome;

use super::Extraction;

/// Extract tool calls from the provider's structured field.
pub fn extract(outcome: &ChatOutcome, tool_names: &[String]) -> Extraction {
    let mut calls = Vec::new();
    for call in &outcome.tool_calls {
        if tool_names.iter().any(|n| n == &call.name) {
            calls.push(call.clone());
        } else {
            warn!("native extraction: dropping unknown tool '{}'", call.name);
        }
    }

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
