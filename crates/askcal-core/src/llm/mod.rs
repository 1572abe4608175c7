//! Model backend client and chat-completion types

mod client;
mod types;

use async_trait::async_trait;

use crate::Result;
use crate::tool::FunctionSpec;

pub use client::LlmClient;
pub use types::*;

/// A chat-completion capable model backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the full history plus tool catalog and return the assistant message
    async fn complete(&self, messages: &[Message], tools: &[FunctionSpec]) -> Result<Message>;
}
