//! Conversation orchestration
//!
//! Drives bounded rounds of model queries and tool executions.

mod orchestrator;
mod prompt;
mod state;

pub use orchestrator::{ConversationOutcome, Orchestrator};
pub use prompt::{SYSTEM_POLICY, system_prompt};
pub use state::ConversationState;
