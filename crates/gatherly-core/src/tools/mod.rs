//! Tool layer
//!
//! The registry of schema-described, side-effecting functions the model may
//! request, plus the event-draft tool set and the static field registry the
//! schemas are generated from.

pub mod events;
pub mod registry;
pub mod schema;

pub use events::{event_tool_registry, NO_DRAFT_MESSAGE};
pub use registry::{parse_params, Tool, ToolContext, ToolRegistry, ToolResult};
pub use schema::{FieldSpec, FieldType, EVENT_FIELDS, TICKET_FIELDS};
