//! Gatherly agent core
//!
//! The AI assistant subsystem behind Gatherly's event booking platform:
//! a user describes an event in natural language and the agent populates a
//! structured draft via LLM tool-calling, eventually materialized into a
//! permanent booking record.
//!
//! The web layer (HTTP routes, templates, OAuth, payments) and the booking
//! store itself are external collaborators. This crate owns:
//! - the model provider adapter (Ollama, queued, circuit-broken)
//! - the tool registry and event-draft tools
//! - tool-call extraction strategies for models that ignore formats
//! - the two orchestrator shapes (bounded ReAct loop, explicit workflow)
//! - conversation/session/draft persistence

pub mod agent;
pub mod ai;
pub mod assistant;
pub mod booking;
pub mod constants;
pub mod extract;
pub mod storage;
pub mod tools;

pub use assistant::{ConversationStart, EventAssistant, MaterializeResult, ProcessReply};
