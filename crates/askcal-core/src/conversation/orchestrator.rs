//! Conversation orchestrator
//!
//! Each round sends the whole history plus the tool catalog to the model,
//! appends the assistant reply, and executes any requested tool calls in the
//! order the model returned them. The loop ends on a reply without tool calls
//! or when the round budget runs out.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::ConversationConfig;
use crate::llm::{ChatBackend, Message};
use crate::tool::{ToolBridge, ToolDefinition, adapt};

use super::prompt::system_prompt;
use super::state::ConversationState;

/// Result of one orchestrated conversation
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    /// Final assistant text (may be empty when the round budget ran out)
    pub answer: String,
    /// Tool calls executed across all rounds
    pub tool_call_count: usize,
    /// Completed tool-execution rounds
    pub rounds: usize,
    /// Full message history
    pub history: Vec<Message>,
}

/// Drives conversations between the model backend and the tools
///
/// Holds no per-conversation state; independent runs may proceed concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    bridge: ToolBridge,
    max_rounds: usize,
    timezone: Tz,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        bridge: ToolBridge,
        config: &ConversationConfig,
    ) -> Self {
        Self {
            backend,
            bridge,
            max_rounds: config.max_rounds,
            timezone: config.default_timezone,
        }
    }

    /// Override the round budget
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Run a conversation offering every tool the bridge knows
    pub async fn ask(&self, prompt: &str) -> Result<ConversationOutcome> {
        let tools = self.bridge.definitions();
        self.run(prompt, &tools).await
    }

    /// Run a conversation for `prompt` offering `tools` to the model
    ///
    /// # Errors
    /// A model backend failure or a tool host transport failure aborts the
    /// run. Tool-level failures are handed back to the model as text.
    pub async fn run(&self, prompt: &str, tools: &[ToolDefinition]) -> Result<ConversationOutcome> {
        let specs = adapt(tools);
        let now = Utc::now().with_timezone(&self.timezone);
        let mut state = ConversationState::new(system_prompt(now), prompt, self.max_rounds);
        let mut tool_call_count = 0;

        info!(
            tool_count = specs.len(),
            max_rounds = self.max_rounds,
            "Starting conversation"
        );

        let answer = loop {
            if state.budget_exhausted() {
                warn!(
                    rounds = state.round,
                    "Round budget exhausted, returning last assistant message"
                );
                break state.last_assistant_content();
            }

            let reply = self.backend.complete(&state.messages, &specs).await?;
            let calls = reply.tool_calls.clone();
            state.push(reply);

            if calls.is_empty() {
                break state.last_assistant_content();
            }

            debug!(round = state.round, calls = calls.len(), "Executing tool calls");

            // Sequential: later calls may depend on earlier side effects.
            for call in &calls {
                let text = self.bridge.execute(call).await?;
                state.push(Message::tool(call.id.clone(), text));
                tool_call_count += 1;
            }

            state.complete_round();
        };

        info!(
            rounds = state.round,
            tool_call_count, "Conversation finished"
        );

        Ok(ConversationOutcome {
            answer,
            tool_call_count,
            rounds: state.round,
            history: state.messages,
        })
    }
}
