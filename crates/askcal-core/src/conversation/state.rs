//! Conversation history and round accounting

use crate::llm::{Message, Role};

/// Append-only history of one conversation plus its round budget
///
/// `round` advances only after a complete tool-execution pass.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub round: usize,
    pub max_rounds: usize,
}

impl ConversationState {
    /// Seed a conversation with the system policy and the user's prompt
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_rounds: usize) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(prompt)],
            round: 0,
            max_rounds,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Mark the current tool-execution pass as finished
    pub fn complete_round(&mut self) {
        self.round += 1;
    }

    pub fn budget_exhausted(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Content of the most recent assistant message, empty if there is none
    pub fn last_assistant_content(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}
