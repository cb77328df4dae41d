//! Prompt construction
//!
//! System prompts are built fresh each turn from the registry's schemas and
//! the persisted transcript - conversation history is never cached in
//! process memory.

use crate::ai::types::AiTool;

/// Describe tools for in-prompt advertisement.
pub fn describe_tools(tools: &[AiTool]) -> String {
    let mut text = String::new();
    for tool in tools {
        text.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        if let Some(properties) = tool.parameters.get("properties") {
            if let Some(object) = properties.as_object() {
                let names: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
                text.push_str(&format!("  parameters: {}\n", names.join(", ")));
            }
        }
    }
    text
}

/// System prompt for the ReAct reasoning loop.
pub fn react_system_prompt(tools: &[AiTool]) -> String {
    format!(
        "You are an event planning assistant for a homeschool community. \
         You help parents set up events, tickets, venues, and discounts.\n\n\
         You have access to these tools:\n{}\n\
         Use this exact format:\n\
         Thought: what you are thinking about the request\n\
         Action: the tool to use, one of the names above\n\
         Action Input: JSON arguments for the tool\n\n\
         After a tool runs you will see its result as:\n\
         Observation: the tool result\n\n\
         When you have finished, reply with:\n\
         Final Answer: a friendly summary for the user\n",
        describe_tools(tools)
    )
}

/// System prompt when tools are advertised to the provider natively.
pub fn native_system_prompt() -> String {
    "You are an event planning assistant for a homeschool community. \
     You help parents set up events, tickets, venues, and discounts. \
     Use the provided tools to make changes; reply in plain text when \
     no tool applies."
        .to_string()
}

/// System prompt for the `TOOL_CALL:` text convention.
pub fn tool_call_system_prompt(tools: &[AiTool]) -> String {
    format!(
        "You are an event planning assistant for a homeschool community. \
         You help parents set up events, tickets, venues, and discounts.\n\n\
         You have access to these tools:\n{}\n\
         To use a tool, reply with a line of the form:\n\
         TOOL_CALL: tool_name {{\"arg\": \"value\"}}\n\n\
         Reply in plain text when no tool applies.\n",
        describe_tools(tools)
    )
}

/// System prompt for the workflow graph's detail-extraction node.
pub fn extraction_system_prompt() -> String {
    "You extract structured event details from a user's message. \
     Reply with a single JSON object and nothing else, using these keys \
     when present in the message: title, start_time, end_time, location, \
     capacity, cost, min_age, max_age, and tickets (an array of \
     {\"name\", \"price\"} objects). Omit keys you cannot infer."
        .to_string()
}
