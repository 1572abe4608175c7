//! askcal-core: conversation core for askcal
//!
//! Provides the model backend client, the tool system, and the
//! conversation orchestrator that turns a natural-language request into
//! calendar tool calls.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod tool;

pub use config::{CalDavConfig, Config, ConversationConfig, LlmConfig, McpConfig};
pub use conversation::{ConversationOutcome, ConversationState, Orchestrator};
pub use error::{Error, Result};
pub use llm::{ChatBackend, LlmClient, Message, Role, ToolCall};
pub use tool::{FunctionSpec, Tool, ToolBridge, ToolDefinition, ToolManager, ToolResult};
